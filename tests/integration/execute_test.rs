//! End-to-end tests of `execute_query` in non-blocking mode.

use std::time::Duration;

use futures::future::join_all;
use keboola_query::transport::{Method, MockTransport};
use keboola_query::{QueryError, SubmitOptions};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::common::{client, first_page, job_status, page, submitted, JOB_PATH, SUBMIT_PATH};

#[tokio::test]
async fn test_execute_query_success() {
    let mock = submitted()
        .respond(
            Method::Get,
            JOB_PATH,
            200,
            job_status(
                "completed",
                json!([{"id": "stmt-1", "query": "SELECT 1", "status": "completed"}]),
            ),
        )
        .respond(Method::Get, &first_page("stmt-1"), 200, page(json!([["1"]]), 1));
    let (client, _) = client(mock);

    let results = client.execute_query("123", "456", &["SELECT 1"]).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data, vec![vec![Some("1".to_string())]]);
    assert_eq!(results[0].statement_id, "stmt-1");
}

#[tokio::test]
async fn test_execute_query_polls_until_terminal() {
    let mock = submitted()
        .respond(Method::Get, JOB_PATH, 200, job_status("created", json!([])))
        .respond(
            Method::Get,
            JOB_PATH,
            200,
            job_status(
                "processing",
                json!([{"id": "stmt-1", "query": "SELECT 1", "status": "processing"}]),
            ),
        )
        .respond(
            Method::Get,
            JOB_PATH,
            200,
            job_status(
                "completed",
                json!([{"id": "stmt-1", "query": "SELECT 1", "status": "completed"}]),
            ),
        )
        .respond(Method::Get, &first_page("stmt-1"), 200, page(json!([["1"]]), 1));
    let (client, mock) = client(mock);

    let results = client.execute_query("123", "456", &["SELECT 1"]).await.unwrap();

    assert_eq!(results[0].row_count(), 1);
    assert_eq!(mock.request_count(Method::Get, JOB_PATH), 3);

    // Strict ordering: submit, every poll, then results.
    let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            SUBMIT_PATH.to_string(),
            JOB_PATH.to_string(),
            JOB_PATH.to_string(),
            JOB_PATH.to_string(),
            format!("{JOB_PATH}/stmt-1/results"),
        ]
    );
}

#[tokio::test]
async fn test_execute_query_preserves_statement_order() {
    let mock = submitted()
        .respond(
            Method::Get,
            JOB_PATH,
            200,
            job_status(
                "completed",
                json!([
                    {"id": "stmt-a", "query": "SELECT 'a'", "status": "completed"},
                    {"id": "stmt-b", "query": "SELECT 'b'", "status": "completed"}
                ]),
            ),
        )
        .respond(Method::Get, &first_page("stmt-b"), 200, page(json!([["b"]]), 1))
        .respond(Method::Get, &first_page("stmt-a"), 200, page(json!([["a"]]), 1));
    let (client, _) = client(mock);

    let results = client
        .execute_query("123", "456", &["SELECT 'a'", "SELECT 'b'"])
        .await
        .unwrap();

    let first_cells: Vec<Option<String>> = results.iter().map(|r| r.data[0][0].clone()).collect();
    assert_eq!(first_cells, vec![Some("a".to_string()), Some("b".to_string())]);
}

#[tokio::test]
async fn test_execute_query_job_fails() {
    let mock = submitted().respond(
        Method::Get,
        JOB_PATH,
        200,
        job_status(
            "failed",
            json!([{
                "id": "stmt-1",
                "query": "SELECT * FROM nonexistent",
                "status": "failed",
                "error": "Table 'nonexistent' does not exist"
            }]),
        ),
    );
    let (client, mock) = client(mock);

    let err = client
        .execute_query("123", "456", &["SELECT * FROM nonexistent"])
        .await
        .unwrap_err();

    assert_eq!(err.job_id(), Some("job-abc123"));
    assert!(err.to_string().contains("does not exist"));
    match &err {
        QueryError::Job {
            failed_statements, ..
        } => {
            assert_eq!(failed_statements.len(), 1);
            assert_eq!(failed_statements[0].id, "stmt-1");
        }
        other => panic!("expected job error, got {other:?}"),
    }
    assert_eq!(
        mock.request_count(Method::Get, "/queries/job-abc123/stmt-1/results"),
        0
    );
}

#[tokio::test]
async fn test_execute_query_timeout() {
    let mock = submitted().respond(
        Method::Get,
        JOB_PATH,
        200,
        job_status(
            "processing",
            json!([{"id": "stmt-1", "query": "SELECT SLEEP(600)", "status": "processing"}]),
        ),
    );
    let (client, mock) = client(mock);

    let err = client
        .execute_query_with(
            "123",
            "456",
            &["SELECT SLEEP(600)"],
            SubmitOptions::default(),
            Some(Duration::from_millis(30)),
        )
        .await
        .unwrap_err();

    match err {
        QueryError::JobTimeout {
            job_id,
            last_status,
            ..
        } => {
            assert_eq!(job_id, "job-abc123");
            assert_eq!(last_status, keboola_query::JobState::Processing);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(mock.request_count(Method::Get, JOB_PATH) >= 2);
}

#[tokio::test]
async fn test_execute_query_surfaces_page_failure() {
    let mock = submitted()
        .respond(
            Method::Get,
            JOB_PATH,
            200,
            job_status(
                "completed",
                json!([{"id": "stmt-1", "query": "SELECT 1", "status": "completed"}]),
            ),
        )
        .respond(
            Method::Get,
            &first_page("stmt-1"),
            200,
            json!({"status": "failed", "message": "Result expired"}),
        );
    let (client, _) = client(mock);

    let err = client.execute_query("123", "456", &["SELECT 1"]).await.unwrap_err();

    assert!(matches!(err, QueryError::Job { .. }));
    assert!(err.message().contains("Result expired"));
}

#[tokio::test]
async fn test_concurrent_executions_progress_independently() {
    let mut mock = MockTransport::new();
    for n in 0..3 {
        let job = format!("job-{n}");
        mock = mock
            .respond(
                Method::Post,
                &format!("/branches/123/workspaces/{n}/queries"),
                201,
                json!({"queryJobId": job}),
            )
            .respond(
                Method::Get,
                &format!("/queries/{job}"),
                200,
                json!({
                    "queryJobId": job,
                    "status": "processing",
                    "actorType": "user",
                    "statements": []
                }),
            )
            .respond(
                Method::Get,
                &format!("/queries/{job}"),
                200,
                json!({
                    "queryJobId": job,
                    "status": "completed",
                    "actorType": "user",
                    "statements": [{"id": "s", "query": "SELECT 1", "status": "completed"}]
                }),
            )
            .respond(
                Method::Get,
                &format!("/queries/{job}/s/results"),
                200,
                page(json!([[n.to_string()]]), 1),
            );
    }
    let (client, _) = client(mock);

    let workspaces: Vec<String> = (0..3).map(|n| n.to_string()).collect();
    let outcomes = join_all(
        workspaces
            .iter()
            .map(|ws| client.execute_query("123", ws, &["SELECT 1"])),
    )
    .await;

    for (n, outcome) in outcomes.into_iter().enumerate() {
        let results = outcome.unwrap();
        assert_eq!(results[0].data[0][0], Some(n.to_string()));
    }
}
