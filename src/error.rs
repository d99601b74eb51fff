//! Error types for the query service client.
//!
//! Every response that crosses the network boundary is classified into exactly
//! one [`QueryError`] variant by [`QueryError::from_response`].

use serde::Deserialize;
use thiserror::Error;

use crate::models::{FailedStatement, JobState};

/// Message used when an error body carries no `exception` field.
const GENERIC_MESSAGE: &str = "Unknown error";

/// Main error type for query service operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The token was rejected (HTTP 401/403).
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        status_code: u16,
        exception_id: Option<String>,
    },

    /// The request was rejected as invalid (HTTP 400/422).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        status_code: u16,
        context: Option<serde_json::Value>,
    },

    /// The job, statement, branch or workspace does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        exception_id: Option<String>,
    },

    /// The job reached a terminal state other than completed, or a statement
    /// result could not be read because the statement did not succeed.
    #[error("Job {job_id} failed: {message}")]
    Job {
        message: String,
        job_id: String,
        failed_statements: Vec<FailedStatement>,
        canceled: bool,
    },

    /// The client gave up waiting. The job may still be running server-side.
    #[error("Job {job_id} timed out: {message}")]
    JobTimeout {
        message: String,
        job_id: String,
        last_status: JobState,
    },

    /// Catch-all for unexpected status codes, transport failures and
    /// malformed responses.
    #[error("Query service error: {message}")]
    Service {
        message: String,
        status_code: Option<u16>,
        exception_id: Option<String>,
    },

    /// Local configuration errors (missing token, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body shape shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    exception: Option<String>,
    exception_id: Option<String>,
    context: Option<serde_json::Value>,
}

impl QueryError {
    /// Classifies a non-2xx response.
    ///
    /// Total over all inputs: unknown status codes and undecodable bodies fall
    /// through to [`QueryError::Service`].
    pub fn from_response(status_code: u16, body: &[u8]) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
        let raw_text = if parsed.is_none() {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        } else {
            None
        };
        let ErrorBody {
            exception,
            exception_id,
            context,
        } = parsed.unwrap_or_default();

        let message = exception
            .or(raw_text)
            .unwrap_or_else(|| format!("{GENERIC_MESSAGE} (HTTP {status_code})"));

        match status_code {
            401 | 403 => Self::Authentication {
                message,
                status_code,
                exception_id,
            },
            400 | 422 => Self::Validation {
                message,
                status_code,
                context,
            },
            404 => Self::NotFound {
                message,
                exception_id,
            },
            _ => Self::Service {
                message,
                status_code: Some(status_code),
                exception_id,
            },
        }
    }

    /// Creates a service error with no HTTP status (transport or decoding failure).
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service {
            message: msg.into(),
            status_code: None,
            exception_id: None,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a failed-job error from the statements that reported errors.
    pub fn job_failed(job_id: impl Into<String>, failed_statements: Vec<FailedStatement>) -> Self {
        let job_id = job_id.into();
        let message = if failed_statements.is_empty() {
            "job ended in state 'failed' without statement-level errors".to_string()
        } else {
            failed_statements
                .iter()
                .map(|s| format!("statement {}: {}", s.id, s.error))
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self::Job {
            message,
            job_id,
            failed_statements,
            canceled: false,
        }
    }

    /// Creates an error for a job that was canceled before completing.
    pub fn job_canceled(job_id: impl Into<String>) -> Self {
        Self::Job {
            message: "job was canceled".to_string(),
            job_id: job_id.into(),
            failed_statements: Vec::new(),
            canceled: true,
        }
    }

    /// Creates a client-side timeout error.
    pub fn job_timeout(job_id: impl Into<String>, last_status: JobState, waited_secs: f64) -> Self {
        Self::JobTimeout {
            message: format!(
                "no terminal state after {waited_secs:.1}s (last status: {last_status})"
            ),
            job_id: job_id.into(),
            last_status,
        }
    }

    /// Returns the human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::Job { message, .. }
            | Self::JobTimeout { message, .. }
            | Self::Service { message, .. } => message,
            Self::Config(message) => message,
        }
    }

    /// Returns the HTTP status code, if the error came from an HTTP response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status_code, .. } | Self::Validation { status_code, .. } => {
                Some(*status_code)
            }
            Self::NotFound { .. } => Some(404),
            Self::Service { status_code, .. } => *status_code,
            Self::Job { .. } | Self::JobTimeout { .. } | Self::Config(_) => None,
        }
    }

    /// Returns the service-assigned exception id, if any.
    pub fn exception_id(&self) -> Option<&str> {
        match self {
            Self::Authentication { exception_id, .. }
            | Self::NotFound { exception_id, .. }
            | Self::Service { exception_id, .. } => exception_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the job id for job-level errors.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Job { job_id, .. } | Self::JobTimeout { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Returns true for a job that ended in the canceled state.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Job { canceled: true, .. })
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "Authentication Error",
            Self::Validation { .. } => "Validation Error",
            Self::NotFound { .. } => "Not Found",
            Self::Job { .. } => "Job Error",
            Self::JobTimeout { .. } => "Job Timeout",
            Self::Service { .. } => "Query Service Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::service(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::service(format!("Failed to connect to the query service: {e}"))
        } else {
            Self::service(format!("Request failed: {e}"))
        }
    }
}

/// Result type alias using QueryError.
pub type Result<T> = std::result::Result<T, QueryError>;
