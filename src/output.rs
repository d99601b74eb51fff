//! Rendering of results and job status for the terminal.

use keboola_query::{JobStatus, QueryResult};
use serde::Serialize;

/// Text shown for SQL NULL.
const NULL_TEXT: &str = "NULL";

/// Serializes any output value as pretty JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Renders a result as an aligned text table followed by a row count.
pub fn render_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return match result.rows_affected {
            Some(n) => format!("({n} rows affected)\n"),
            None => "(no result set)\n".to_string(),
        };
    }

    let headers = result.column_names();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &result.data {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                let len = cell.as_deref().unwrap_or(NULL_TEXT).chars().count();
                *width = (*width).max(len);
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers.iter().copied(), &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, separator.iter().map(String::as_str), &widths);
    for row in &result.data {
        push_line(
            &mut out,
            row.iter().map(|c| c.as_deref().unwrap_or(NULL_TEXT)),
            &widths,
        );
    }

    let count = result.row_count();
    out.push_str(&format!(
        "({count} {})\n",
        if count == 1 { "row" } else { "rows" }
    ));
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}

/// Renders a job status summary, one line per statement.
pub fn render_job(job: &JobStatus) -> String {
    let mut out = format!(
        "Job {} [{}] by {}\n",
        job.query_job_id, job.status, job.actor_type
    );
    if let Some(created) = job.created_at {
        out.push_str(&format!("  created: {}\n", created.to_rfc3339()));
    }
    if let Some(changed) = job.changed_at {
        out.push_str(&format!("  changed: {}\n", changed.to_rfc3339()));
    }
    for statement in &job.statements {
        out.push_str(&format!("  - {} [{}] {}", statement.id, statement.status, statement.query));
        if let Some(rows) = statement.rows_affected {
            out.push_str(&format!(" ({rows} rows)"));
        }
        if let Some(error) = &statement.error {
            out.push_str(&format!("\n      error: {error}"));
        }
        out.push('\n');
    }
    out
}
