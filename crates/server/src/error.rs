// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use harborview_clients::ClientError;

/// Structured JSON error response for API errors.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../ui/types/generated/")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes.
///
/// Errors stay scoped to the failing endpoint -- a panel-level failure must
/// never blank the whole review or lose the selected submission.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("No ingested heartbeats for submission: {0}")]
    HeartbeatsNotReady(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(usize),

    #[error("No file group for entity: {0}")]
    FileGroupNotFound(String),

    #[error("Source file not found: {path}@{branch}")]
    SourceNotFound { path: String, branch: String },

    #[error("Upstream client error: {0}")]
    Client(#[from] ClientError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::SubmissionNotFound(id) => {
                tracing::warn!(submission_id = %id, "Submission not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Submission not found", format!("Record: {id}")),
                )
            }
            ApiError::HeartbeatsNotReady(id) => {
                tracing::debug!(submission_id = %id, "Heartbeats not ingested yet");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details(
                        "Heartbeats not ingested yet",
                        format!("Run a heartbeat sync for submission {id} first"),
                    ),
                )
            }
            ApiError::ClusterNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Cluster not found", format!("Cluster id: {id}")),
            ),
            ApiError::FileGroupNotFound(entity) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("File group not found", format!("Entity: {entity}")),
            ),
            ApiError::SourceNotFound { path, branch } => (
                // Not-found condition, not a fault: the reviewer sees an
                // inline message and picks another file group.
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details(
                    "Source file not found",
                    format!("{path} on branch {branch}"),
                ),
            ),
            ApiError::Client(client_err) => {
                tracing::error!(error = %client_err, "Upstream client error");
                let status = match client_err {
                    ClientError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    ErrorResponse::with_details("Upstream service error", client_err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
