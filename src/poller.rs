//! Job polling: drives a submitted job to a terminal state.
//!
//! The loop is written once against [`Sleeper`]. The async client suspends the
//! task between polls; the blocking client parks the calling thread.

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};

use crate::api::QueryApi;
use crate::config::{PollConfig, MIN_POLL_INTERVAL};
use crate::error::{QueryError, Result};
use crate::models::{JobState, JobStatus};

/// The inter-poll wait.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Suspends only the current task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

#[async_trait]
impl Sleeper for ThreadSleeper {
    async fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Multiplicative backoff with a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        let next = config.initial_interval.max(MIN_POLL_INTERVAL);
        Self {
            next,
            max: config.max_interval.max(next),
            multiplier: config.multiplier.max(1.0),
        }
    }

    /// Returns the delay to use now and grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next.min(self.max);
        self.next = current.mul_f64(self.multiplier).min(self.max);
        current
    }
}

/// Polls until the job is terminal or `timeout` elapses.
///
/// Returns the final status when the job completed. A failed job becomes
/// [`QueryError::Job`] listing its failed statements; a canceled job becomes
/// [`QueryError::Job`] with `canceled` set. The deadline is checked only
/// between polls, so an in-flight request always finishes first.
pub(crate) async fn wait_for_job(
    api: &QueryApi,
    sleeper: &dyn Sleeper,
    job_id: &str,
    config: &PollConfig,
    timeout: Duration,
) -> Result<JobStatus> {
    let started = Instant::now();
    // A timeout too large to represent means no deadline.
    let deadline = started.checked_add(timeout);
    let mut backoff = Backoff::new(config);
    let mut furthest: Option<JobState> = None;
    let mut polls = 0u32;

    loop {
        let status = api.job_status(job_id).await?;
        polls += 1;

        if let Some(prev) = furthest {
            if status.status.progress() < prev.progress() {
                tracing::warn!(
                    job_id,
                    previous = %prev,
                    reported = %status.status,
                    "Job state moved backwards; keeping the furthest observed state"
                );
            }
        }
        if furthest.map_or(true, |prev| status.status.progress() >= prev.progress()) {
            furthest = Some(status.status);
        }

        if let Some(outcome) = terminal_outcome(&status) {
            tracing::info!(
                job_id,
                state = %status.status,
                polls,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job reached terminal state"
            );
            return outcome.map(|()| status);
        }

        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            let last = furthest.unwrap_or(status.status);
            tracing::warn!(job_id, last_status = %last, polls, "Gave up waiting for job");
            return Err(QueryError::job_timeout(
                job_id,
                last,
                started.elapsed().as_secs_f64(),
            ));
        }

        let mut delay = backoff.next_delay();
        if let Some(deadline) = deadline {
            delay = delay.min(deadline - now);
        }
        tracing::debug!(
            job_id,
            state = %status.status,
            delay_ms = delay.as_millis() as u64,
            "Job still running"
        );
        sleeper.sleep(delay).await;
    }
}

/// Maps a terminal status to the caller-facing outcome; `None` while running.
fn terminal_outcome(status: &JobStatus) -> Option<Result<()>> {
    match status.status {
        JobState::Created | JobState::Processing => None,
        JobState::Completed => Some(Ok(())),
        JobState::Failed => Some(Err(QueryError::job_failed(
            status.query_job_id.clone(),
            status.failed_statements(),
        ))),
        JobState::Canceled => Some(Err(QueryError::job_canceled(
            status.query_job_id.clone(),
        ))),
    }
}
