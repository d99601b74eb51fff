//! Client for the Keboola Query Service.
//!
//! Submits SQL statements as asynchronous jobs, waits for them to finish with
//! bounded backoff, and reads paginated results. Service failures are mapped
//! to [`QueryError`].
//!
//! ```no_run
//! # async fn run() -> keboola_query::Result<()> {
//! let client = keboola_query::Client::from_env()?;
//! let results = client.execute_query("123", "456", &["SELECT 1 AS id"]).await?;
//! println!("{:?}", results[0].data);
//! # Ok(())
//! # }
//! ```

mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
mod pager;
pub mod poller;
pub mod transport;

pub use api::{HistoryOptions, SubmitOptions};
pub use client::{BlockingClient, Client};
pub use config::{ClientConfig, PollConfig};
pub use error::{QueryError, Result};
pub use models::{
    ActorType, Column, FailedStatement, JobState, JobStatus, QueryHistory, QueryResult,
    ResultPage, Row, Statement, StatementState,
};
pub use pager::PAGE_SIZE;
