//! Client facade for the query service.
//!
//! [`Client`] is the non-blocking form: waits between polls suspend only the
//! task, so many `execute_query` calls can run concurrently on one client.
//! [`BlockingClient`] runs the same code on a private runtime and parks the
//! calling thread between polls.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{HistoryOptions, QueryApi, SubmitOptions};
use crate::config::{ClientConfig, PollConfig};
use crate::error::{QueryError, Result};
use crate::models::{JobStatus, QueryHistory, QueryResult, ResultPage};
use crate::pager;
use crate::poller::{self, Sleeper, ThreadSleeper, TokioSleeper};
use crate::transport::{HttpTransport, Transport};

/// Asynchronous query service client.
///
/// Cloning is cheap and shares the connection pool. The transport is released
/// when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Client {
    api: QueryApi,
    poll: PollConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Client {
    /// Creates a client over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config.poll))
    }

    /// Creates a client from `KBC_TOKEN` and `KBC_QUERY_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, poll: PollConfig) -> Self {
        Self {
            api: QueryApi::new(transport),
            poll,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces how the client waits between polls.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the polling configuration.
    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Submits statements as a new job and returns its id.
    ///
    /// No local validation is done; an empty list is rejected by the service
    /// with [`QueryError::Validation`].
    pub async fn submit_job<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
    ) -> Result<String> {
        self.submit_job_with(branch_id, workspace_id, statements, SubmitOptions::default())
            .await
    }

    /// Submits statements with explicit options.
    pub async fn submit_job_with<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
        options: SubmitOptions,
    ) -> Result<String> {
        let statements = to_owned(statements);
        let job_id = self
            .api
            .submit(branch_id, workspace_id, &statements, &options)
            .await?;
        tracing::info!(
            job_id = %job_id,
            branch_id,
            workspace_id,
            statements = statements.len(),
            "Submitted query job"
        );
        Ok(job_id)
    }

    /// Fetches the current status of a job.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.api.job_status(job_id).await
    }

    /// Fetches every result page of one statement.
    pub async fn get_job_results(&self, job_id: &str, statement_id: &str) -> Result<QueryResult> {
        pager::fetch_all_pages(&self.api, job_id, statement_id).await
    }

    /// Fetches a single result page, for callers that page manually.
    pub async fn get_results_page(
        &self,
        job_id: &str,
        statement_id: &str,
        offset: u64,
        page_size: u32,
    ) -> Result<ResultPage> {
        self.api
            .results_page(job_id, statement_id, offset, page_size)
            .await
    }

    /// Requests cancellation and returns the job id. Does not wait for the
    /// job to reach the canceled state.
    pub async fn cancel_job(&self, job_id: &str, reason: Option<&str>) -> Result<String> {
        let canceled = self.api.cancel(job_id, reason).await?;
        tracing::info!(job_id, reason, "Requested job cancellation");
        Ok(canceled)
    }

    /// Waits for a job to reach a terminal state.
    ///
    /// `timeout` defaults to the configured job timeout.
    pub async fn wait_for_job(&self, job_id: &str, timeout: Option<Duration>) -> Result<JobStatus> {
        let timeout = timeout.unwrap_or(self.poll.timeout);
        poller::wait_for_job(&self.api, self.sleeper.as_ref(), job_id, &self.poll, timeout).await
    }

    /// Lists previously executed jobs for a workspace.
    pub async fn get_query_history(
        &self,
        branch_id: &str,
        workspace_id: &str,
        options: HistoryOptions,
    ) -> Result<Vec<QueryHistory>> {
        self.api.history(branch_id, workspace_id, &options).await
    }

    /// Submits statements, waits for the job and returns one result per
    /// statement in submission order.
    ///
    /// Any failure aborts the whole call; there is no partial result.
    pub async fn execute_query<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
    ) -> Result<Vec<QueryResult>> {
        self.execute_query_with(
            branch_id,
            workspace_id,
            statements,
            SubmitOptions::default(),
            None,
        )
        .await
    }

    /// Like [`Client::execute_query`] with submit options and a job timeout.
    pub async fn execute_query_with<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
        options: SubmitOptions,
        timeout: Option<Duration>,
    ) -> Result<Vec<QueryResult>> {
        let job_id = self
            .submit_job_with(branch_id, workspace_id, statements, options)
            .await?;
        let job = self.wait_for_job(&job_id, timeout).await?;

        let mut results = Vec::with_capacity(job.statements.len());
        for statement in &job.statements {
            results.push(self.get_job_results(&job_id, &statement.id).await?);
        }
        Ok(results)
    }
}

fn to_owned<S: AsRef<str>>(statements: &[S]) -> Vec<String> {
    statements.iter().map(|s| s.as_ref().to_string()).collect()
}

/// Blocking query service client.
///
/// Owns a single-threaded runtime; polling waits occupy the calling thread.
/// Must not be used from within an async runtime.
#[derive(Debug)]
pub struct BlockingClient {
    // Declared before `runtime` so the transport is dropped first.
    inner: Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    /// Creates a blocking client over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = {
            let _guard = runtime.enter();
            Client::new(config)?
        };
        Ok(Self::from_parts(inner, runtime))
    }

    /// Creates a blocking client from `KBC_TOKEN` and `KBC_QUERY_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a blocking client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, poll: PollConfig) -> Result<Self> {
        Ok(Self::from_parts(
            Client::with_transport(transport, poll),
            build_runtime()?,
        ))
    }

    fn from_parts(inner: Client, runtime: tokio::runtime::Runtime) -> Self {
        Self {
            inner: inner.with_sleeper(Arc::new(ThreadSleeper)),
            runtime,
        }
    }

    /// See [`Client::submit_job`].
    pub fn submit_job<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
    ) -> Result<String> {
        self.runtime
            .block_on(self.inner.submit_job(branch_id, workspace_id, statements))
    }

    /// See [`Client::submit_job_with`].
    pub fn submit_job_with<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
        options: SubmitOptions,
    ) -> Result<String> {
        self.runtime.block_on(
            self.inner
                .submit_job_with(branch_id, workspace_id, statements, options),
        )
    }

    /// See [`Client::get_job_status`].
    pub fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.runtime.block_on(self.inner.get_job_status(job_id))
    }

    /// See [`Client::get_job_results`].
    pub fn get_job_results(&self, job_id: &str, statement_id: &str) -> Result<QueryResult> {
        self.runtime
            .block_on(self.inner.get_job_results(job_id, statement_id))
    }

    /// See [`Client::get_results_page`].
    pub fn get_results_page(
        &self,
        job_id: &str,
        statement_id: &str,
        offset: u64,
        page_size: u32,
    ) -> Result<ResultPage> {
        self.runtime.block_on(
            self.inner
                .get_results_page(job_id, statement_id, offset, page_size),
        )
    }

    /// See [`Client::cancel_job`].
    pub fn cancel_job(&self, job_id: &str, reason: Option<&str>) -> Result<String> {
        self.runtime.block_on(self.inner.cancel_job(job_id, reason))
    }

    /// See [`Client::wait_for_job`].
    pub fn wait_for_job(&self, job_id: &str, timeout: Option<Duration>) -> Result<JobStatus> {
        self.runtime.block_on(self.inner.wait_for_job(job_id, timeout))
    }

    /// See [`Client::get_query_history`].
    pub fn get_query_history(
        &self,
        branch_id: &str,
        workspace_id: &str,
        options: HistoryOptions,
    ) -> Result<Vec<QueryHistory>> {
        self.runtime
            .block_on(self.inner.get_query_history(branch_id, workspace_id, options))
    }

    /// See [`Client::execute_query`].
    pub fn execute_query<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
    ) -> Result<Vec<QueryResult>> {
        self.runtime
            .block_on(self.inner.execute_query(branch_id, workspace_id, statements))
    }

    /// See [`Client::execute_query_with`].
    pub fn execute_query_with<S: AsRef<str>>(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[S],
        options: SubmitOptions,
        timeout: Option<Duration>,
    ) -> Result<Vec<QueryResult>> {
        self.runtime.block_on(self.inner.execute_query_with(
            branch_id,
            workspace_id,
            statements,
            options,
            timeout,
        ))
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| QueryError::service(format!("Failed to start runtime: {e}")))
}
