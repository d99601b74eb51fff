//! Job and statement status types.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::datetime;

/// Who initiated a query job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    System,
    Scheduled,
}

impl ActorType {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a query job.
///
/// Transitions only move forward: created, then processing, then exactly one
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Processing,
    Completed,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl JobState {
    /// Returns true if no further transition is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Position in the lifecycle; all terminal states share the last rank.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed | Self::Canceled => 2,
        }
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a single statement within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatementState {
    Waiting,
    Processing,
    Completed,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,
    #[serde(alias = "not_executed", alias = "notexecuted")]
    NotExecuted,
}

impl StatementState {
    /// Returns true if the statement will not change state again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Waiting | Self::Processing)
    }

    /// Returns true if the statement completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the statement reported an execution error.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::NotExecuted => "notExecuted",
        }
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statement of a job as reported by the status endpoint.
///
/// The status is only final once the parent job is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub id: String,
    pub query: String,
    pub status: StatementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

/// A statement that failed, as carried by [`crate::QueryError::Job`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStatement {
    pub id: String,
    pub error: String,
}

/// Snapshot of a query job returned by `GET /queries/{job_id}`.
///
/// Never modified locally; a newer view is obtained by fetching again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub query_job_id: String,
    pub status: JobState,
    pub actor_type: ActorType,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub changed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl JobStatus {
    /// Returns true if the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Collects statements that reported a failure, in statement order.
    pub fn failed_statements(&self) -> Vec<FailedStatement> {
        self.statements
            .iter()
            .filter(|s| s.status.is_failure())
            .map(|s| FailedStatement {
                id: s.id.clone(),
                error: s
                    .error
                    .clone()
                    .unwrap_or_else(|| "statement failed without an error message".to_string()),
            })
            .collect()
    }
}

/// A previously executed job as listed by the history endpoint.
pub type QueryHistory = JobStatus;
