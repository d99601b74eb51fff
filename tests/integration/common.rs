//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use keboola_query::transport::{Method, MockTransport};
use keboola_query::{Client, PollConfig};
use serde_json::{json, Value};

pub const SUBMIT_PATH: &str = "/branches/123/workspaces/456/queries";
pub const JOB_PATH: &str = "/queries/job-abc123";

/// Polling tuned for tests: short intervals, generous timeout.
pub fn fast_poll() -> PollConfig {
    PollConfig::default()
        .with_intervals(Duration::from_millis(1), Duration::from_millis(5))
        .with_timeout(Duration::from_secs(5))
}

/// Builds a client over the mock and returns both.
pub fn client(mock: MockTransport) -> (Client, Arc<MockTransport>) {
    let mock = Arc::new(mock);
    (Client::with_transport(mock.clone(), fast_poll()), mock)
}

/// A job status payload for `job-abc123`.
pub fn job_status(state: &str, statements: Value) -> Value {
    json!({
        "queryJobId": "job-abc123",
        "status": state,
        "actorType": "user",
        "createdAt": "2024-01-01T00:00:00Z",
        "changedAt": "2024-01-01T00:01:00Z",
        "statements": statements,
    })
}

/// A completed single-column page.
pub fn page(data: Value, number_of_rows: u64) -> Value {
    json!({
        "status": "completed",
        "columns": [{"name": "1", "type": "NUMBER", "nullable": false, "length": 1}],
        "data": data,
        "numberOfRows": number_of_rows,
    })
}

/// Results path for the first page of a statement.
pub fn first_page(statement_id: &str) -> String {
    format!("{JOB_PATH}/{statement_id}/results?offset=0&pageSize=500")
}

/// Mock with a successful submission of `job-abc123`.
pub fn submitted() -> MockTransport {
    MockTransport::new().respond(
        Method::Post,
        SUBMIT_PATH,
        201,
        json!({"queryJobId": "job-abc123"}),
    )
}
