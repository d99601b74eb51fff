//! Typed wrappers over the query service endpoints.
//!
//! Each call crosses the network boundary exactly once. Non-2xx responses go
//! through [`QueryError::from_response`]; undecodable 2xx bodies become
//! [`QueryError::Service`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::{QueryError, Result};
use crate::models::{JobStatus, QueryHistory, ResultPage};
use crate::transport::{ApiRequest, Transport};

/// Options for job submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Run all statements in a single transaction.
    pub transactional: bool,
}

/// Options for listing query history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Return only jobs listed after this job id.
    pub after_id: Option<String>,
    /// Maximum number of jobs to return.
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    statements: &'a [String],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    transactional: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobIdBody {
    query_job_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    queries: Vec<QueryHistory>,
}

/// Endpoint-level API over a shared transport.
#[derive(Debug, Clone)]
pub(crate) struct QueryApi {
    transport: Arc<dyn Transport>,
}

impl QueryApi {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `POST /branches/{branch}/workspaces/{workspace}/queries`
    pub(crate) async fn submit(
        &self,
        branch_id: &str,
        workspace_id: &str,
        statements: &[String],
        options: &SubmitOptions,
    ) -> Result<String> {
        let body = serde_json::to_value(SubmitBody {
            statements,
            transactional: options.transactional,
        })
        .map_err(|e| QueryError::service(format!("Failed to encode request: {e}")))?;

        let request = ApiRequest::post(
            format!("/branches/{branch_id}/workspaces/{workspace_id}/queries"),
            body,
        );
        let created: JobIdBody = self.call(&request).await?;
        Ok(created.query_job_id)
    }

    /// `GET /queries/{job_id}`
    pub(crate) async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.call(&ApiRequest::get(format!("/queries/{job_id}"))).await
    }

    /// `GET /queries/{job_id}/{statement_id}/results`
    pub(crate) async fn results_page(
        &self,
        job_id: &str,
        statement_id: &str,
        offset: u64,
        page_size: u32,
    ) -> Result<ResultPage> {
        let request = ApiRequest::get(format!("/queries/{job_id}/{statement_id}/results"))
            .with_query("offset", offset)
            .with_query("pageSize", page_size);
        self.call(&request).await
    }

    /// `POST /queries/{job_id}/cancel`
    pub(crate) async fn cancel(&self, job_id: &str, reason: Option<&str>) -> Result<String> {
        let body = match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        let request = ApiRequest::post(format!("/queries/{job_id}/cancel"), body);
        let canceled: JobIdBody = self.call(&request).await?;
        Ok(canceled.query_job_id)
    }

    /// `GET /branches/{branch}/workspaces/{workspace}/queries`
    pub(crate) async fn history(
        &self,
        branch_id: &str,
        workspace_id: &str,
        options: &HistoryOptions,
    ) -> Result<Vec<QueryHistory>> {
        let mut request =
            ApiRequest::get(format!("/branches/{branch_id}/workspaces/{workspace_id}/queries"));
        if let Some(after_id) = &options.after_id {
            request = request.with_query("afterId", after_id);
        }
        if let Some(page_size) = options.page_size {
            request = request.with_query("pageSize", page_size);
        }
        let body: HistoryBody = self.call(&request).await?;
        Ok(body.queries)
    }

    async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let err = QueryError::from_response(response.status, &response.body);
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = response.status,
                category = err.category(),
                "Request rejected"
            );
            return Err(err);
        }

        serde_json::from_slice(&response.body).map_err(|e| QueryError::Service {
            message: format!(
                "Malformed response from {} {}: {e}",
                request.method, request.path
            ),
            status_code: Some(response.status),
            exception_id: None,
        })
    }
}
