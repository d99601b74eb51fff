//! Tests for the individual job operations: submit, status, results, cancel.

use keboola_query::transport::{Method, MockTransport};
use keboola_query::{JobState, QueryError, StatementState};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::common::{client, first_page, job_status, submitted, JOB_PATH, SUBMIT_PATH};

#[tokio::test]
async fn test_submit_job_success() {
    let (client, mock) = client(submitted());

    let job_id = client
        .submit_job("123", "456", &["SELECT * FROM test"])
        .await
        .unwrap();

    assert_eq!(job_id, "job-abc123");
    let request = &mock.requests()[0];
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.body, Some(json!({"statements": ["SELECT * FROM test"]})));
}

#[tokio::test]
async fn test_submit_job_auth_error() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Post,
        SUBMIT_PATH,
        401,
        json!({"exception": "Invalid token", "exceptionId": "err-123"}),
    ));

    let err = client
        .submit_job("123", "456", &["SELECT * FROM test"])
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Authentication { .. }));
    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.exception_id(), Some("err-123"));
}

#[tokio::test]
async fn test_submit_job_forbidden() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Post,
        SUBMIT_PATH,
        403,
        json!({"exception": "Token lacks permission", "exceptionId": "err-403"}),
    ));

    let err = client.submit_job("123", "456", &["SELECT 1"]).await.unwrap_err();

    assert!(matches!(
        err,
        QueryError::Authentication {
            status_code: 403,
            ..
        }
    ));
    assert_eq!(err.exception_id(), Some("err-403"));
}

#[tokio::test]
async fn test_submit_job_validation_error() {
    let (client, mock) = client(MockTransport::new().respond(
        Method::Post,
        SUBMIT_PATH,
        400,
        json!({"exception": "Statements must not be empty"}),
    ));
    let statements: [&str; 0] = [];

    let err = client.submit_job("123", "456", &statements).await.unwrap_err();

    assert!(matches!(err, QueryError::Validation { .. }));
    assert_eq!(err.message(), "Statements must not be empty");
    // The empty list is sent as-is; the service decides.
    assert_eq!(mock.requests()[0].body, Some(json!({"statements": []})));
}

#[tokio::test]
async fn test_get_job_status_success() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Get,
        JOB_PATH,
        200,
        job_status(
            "completed",
            json!([{
                "id": "stmt-1",
                "query": "SELECT * FROM test",
                "status": "completed",
                "rowsAffected": 100
            }]),
        ),
    ));

    let status = client.get_job_status("job-abc123").await.unwrap();

    assert_eq!(status.query_job_id, "job-abc123");
    assert_eq!(status.status, JobState::Completed);
    assert_eq!(status.statements.len(), 1);
    assert_eq!(status.statements[0].status, StatementState::Completed);
    assert_eq!(status.statements[0].rows_affected, Some(100));
}

#[tokio::test]
async fn test_terminal_status_refetch_is_identical() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Get,
        JOB_PATH,
        200,
        job_status(
            "failed",
            json!([{"id": "stmt-1", "query": "SELECT x", "status": "failed", "error": "bad"}]),
        ),
    ));

    let first = client.get_job_status("job-abc123").await.unwrap();
    let second = client.get_job_status("job-abc123").await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.statements, second.statements);
}

#[tokio::test]
async fn test_get_job_status_not_found() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Get,
        "/queries/missing",
        404,
        json!({"exception": "Query job not found"}),
    ));

    let err = client.get_job_status("missing").await.unwrap_err();
    assert!(matches!(err, QueryError::NotFound { .. }));
}

#[tokio::test]
async fn test_get_job_results_success() {
    let (client, mock) = client(MockTransport::new().respond(
        Method::Get,
        &first_page("stmt-1"),
        200,
        json!({
            "status": "completed",
            "columns": [
                {"name": "id", "type": "NUMBER", "nullable": false, "length": 38},
                {"name": "name", "type": "VARCHAR", "nullable": true, "length": 256}
            ],
            "data": [["1", "Alice"], ["2", "Bob"]],
            "numberOfRows": 2,
            "rowsAffected": 0
        }),
    ));

    let result = client.get_job_results("job-abc123", "stmt-1").await.unwrap();

    assert_eq!(result.status, StatementState::Completed);
    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "id");
    assert_eq!(result.row_count(), 2);
    assert_eq!(
        result.data[0],
        vec![Some("1".to_string()), Some("Alice".to_string())]
    );
    assert_eq!(
        mock.request_count(Method::Get, "/queries/job-abc123/stmt-1/results"),
        1
    );
}

#[tokio::test]
async fn test_get_results_page_passes_offset() {
    let (client, mock) = client(MockTransport::new().respond(
        Method::Get,
        &format!("{JOB_PATH}/stmt-1/results?offset=100&pageSize=50"),
        200,
        json!({"status": "completed", "data": [["x"]], "numberOfRows": 101}),
    ));

    let page = client
        .get_results_page("job-abc123", "stmt-1", 100, 50)
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_cancel_job_success() {
    let (client, mock) = client(MockTransport::new().respond(
        Method::Post,
        "/queries/job-abc123/cancel",
        200,
        json!({"queryJobId": "job-abc123"}),
    ));

    let job_id = client
        .cancel_job("job-abc123", Some("Test cancellation"))
        .await
        .unwrap();

    assert_eq!(job_id, "job-abc123");
    assert_eq!(
        mock.requests()[0].body,
        Some(json!({"reason": "Test cancellation"}))
    );
    // Cancellation does not poll.
    assert_eq!(mock.request_count(Method::Get, JOB_PATH), 0);
}

#[tokio::test]
async fn test_server_error_is_service_error() {
    let (client, _) = client(MockTransport::new().respond(
        Method::Post,
        "/queries/job-abc123/cancel",
        500,
        json!({"exception": "Internal error", "exceptionId": "exc-500"}),
    ));

    let err = client.cancel_job("job-abc123", None).await.unwrap_err();

    assert!(matches!(err, QueryError::Service { .. }));
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.exception_id(), Some("exc-500"));
}

#[tokio::test]
async fn test_transport_failure_is_service_error_without_status() {
    let (client, _) = client(MockTransport::new().fail(Method::Get, JOB_PATH, "connection refused"));

    let err = client.get_job_status("job-abc123").await.unwrap_err();

    assert!(matches!(err, QueryError::Service { .. }));
    assert_eq!(err.status_code(), None);
}
