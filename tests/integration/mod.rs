//! Integration tests for the query service client.

pub mod blocking_test;
pub mod common;
pub mod execute_test;
pub mod jobs_test;
