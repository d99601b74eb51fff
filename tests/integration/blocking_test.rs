//! Tests for the blocking client. These run on plain threads, outside any
//! async runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keboola_query::transport::Method;
use keboola_query::{BlockingClient, PollConfig, QueryError};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::common::{fast_poll, first_page, job_status, page, submitted, JOB_PATH};

#[test]
fn test_blocking_execute_query() {
    let mock = Arc::new(
        submitted()
            .respond(Method::Get, JOB_PATH, 200, job_status("processing", json!([])))
            .respond(
                Method::Get,
                JOB_PATH,
                200,
                job_status(
                    "completed",
                    json!([{"id": "stmt-1", "query": "SELECT 1", "status": "completed"}]),
                ),
            )
            .respond(Method::Get, &first_page("stmt-1"), 200, page(json!([["1"]]), 1)),
    );
    let client = BlockingClient::with_transport(mock.clone(), fast_poll()).unwrap();

    let results = client.execute_query("123", "456", &["SELECT 1"]).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data, vec![vec![Some("1".to_string())]]);
    assert_eq!(mock.request_count(Method::Get, JOB_PATH), 2);
}

#[test]
fn test_blocking_wait_sleeps_on_calling_thread() {
    let mock = Arc::new(
        submitted()
            .respond(Method::Get, JOB_PATH, 200, job_status("created", json!([])))
            .respond(Method::Get, JOB_PATH, 200, job_status("completed", json!([]))),
    );
    let poll = PollConfig::default()
        .with_intervals(Duration::from_millis(40), Duration::from_millis(40))
        .with_timeout(Duration::from_secs(5));
    let client = BlockingClient::with_transport(mock, poll).unwrap();

    let started = Instant::now();
    let job = client.wait_for_job("job-abc123", None).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(40));
    assert!(job.statements.is_empty());
}

#[test]
fn test_blocking_errors_match_async_errors() {
    let mock = Arc::new(submitted().respond(
        Method::Get,
        JOB_PATH,
        200,
        job_status(
            "failed",
            json!([{"id": "stmt-1", "query": "SELECT x", "status": "failed", "error": "invalid identifier 'X'"}]),
        ),
    ));
    let client = BlockingClient::with_transport(mock, fast_poll()).unwrap();

    let err = client.execute_query("123", "456", &["SELECT x"]).unwrap_err();

    assert!(matches!(err, QueryError::Job { .. }));
    assert!(err.to_string().contains("invalid identifier"));
}

#[test]
fn test_blocking_cancel_and_status() {
    let mock = Arc::new(
        submitted()
            .respond(
                Method::Post,
                "/queries/job-abc123/cancel",
                200,
                json!({"queryJobId": "job-abc123"}),
            )
            .respond(Method::Get, JOB_PATH, 200, job_status("canceled", json!([]))),
    );
    let client = BlockingClient::with_transport(mock, fast_poll()).unwrap();

    let job_id = client.submit_job("123", "456", &["SELECT 1"]).unwrap();
    assert_eq!(client.cancel_job(&job_id, None).unwrap(), "job-abc123");

    let err = client.wait_for_job(&job_id, None).unwrap_err();
    assert!(err.is_canceled());
}

#[test]
fn test_blocking_clients_on_separate_threads() {
    let handles: Vec<_> = (0..2)
        .map(|_| {
            std::thread::spawn(|| {
                let mock = Arc::new(
                    submitted()
                        .respond(
                            Method::Get,
                            JOB_PATH,
                            200,
                            job_status(
                                "completed",
                                json!([{"id": "s", "query": "SELECT 1", "status": "completed"}]),
                            ),
                        )
                        .respond(Method::Get, &first_page("s"), 200, page(json!([["1"]]), 1)),
                );
                let client = BlockingClient::with_transport(mock, fast_poll()).unwrap();
                client.execute_query("123", "456", &["SELECT 1"]).unwrap().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}
