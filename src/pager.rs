//! Result paging: reads every page of one statement into a [`QueryResult`].

use crate::api::QueryApi;
use crate::error::{QueryError, Result};
use crate::models::{FailedStatement, QueryResult, ResultPage};

/// Rows requested per page.
pub const PAGE_SIZE: u32 = 500;

/// Fetches all pages for a statement, starting at offset 0.
///
/// Columns and status come from the first page. Paging stops at the first
/// short page or once `numberOfRows` rows are accumulated. A page reporting a
/// non-successful statement aborts with [`QueryError::Job`].
pub(crate) async fn fetch_all_pages(
    api: &QueryApi,
    job_id: &str,
    statement_id: &str,
) -> Result<QueryResult> {
    let first = api.results_page(job_id, statement_id, 0, PAGE_SIZE).await?;
    ensure_success(job_id, statement_id, &first)?;

    let mut last_len = first.data.len();
    let mut result = QueryResult::from_first_page(statement_id, first);
    let mut offset = u64::from(PAGE_SIZE);
    let mut pages = 1u32;

    while !is_last_page(last_len, result.row_count(), result.number_of_rows) {
        let page = api
            .results_page(job_id, statement_id, offset, PAGE_SIZE)
            .await?;
        ensure_success(job_id, statement_id, &page)?;

        last_len = page.data.len();
        result.data.extend(page.data);
        offset += u64::from(PAGE_SIZE);
        pages += 1;
    }

    tracing::debug!(
        job_id,
        statement_id,
        rows = result.row_count(),
        pages,
        "Fetched statement results"
    );
    Ok(result)
}

fn is_last_page(page_len: usize, accumulated: usize, total: Option<u64>) -> bool {
    page_len < PAGE_SIZE as usize || total.is_some_and(|total| accumulated as u64 >= total)
}

fn ensure_success(job_id: &str, statement_id: &str, page: &ResultPage) -> Result<()> {
    if page.status.is_success() {
        return Ok(());
    }

    let error = page
        .message
        .clone()
        .unwrap_or_else(|| format!("statement is in state '{}'", page.status));
    Err(QueryError::Job {
        message: format!("results unavailable for statement {statement_id}: {error}"),
        job_id: job_id.to_string(),
        failed_statements: vec![FailedStatement {
            id: statement_id.to_string(),
            error,
        }],
        canceled: false,
    })
}
