//! Data model for query jobs and their results.

pub mod datetime;
mod job;
mod results;

pub use datetime::parse_datetime;
pub use job::{
    ActorType, FailedStatement, JobState, JobStatus, QueryHistory, Statement, StatementState,
};
pub use results::{Column, QueryResult, ResultPage, Row};
