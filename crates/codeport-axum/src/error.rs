//! Axum-specific error types and mappings.
//!
//! Maps `McpError` and `TransformError` to HTTP status codes and JSON
//! bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codeport_mcp::McpError;
use codeport_transform::{FileFailure, TransformError};
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict (resource already exists).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream MCP server or inference backend failed.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// An upstream did not become ready in time.
    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// Every processable file of a refactor job failed.
    #[error("{message}")]
    BatchFailed {
        message: String,
        details: Vec<FileFailure>,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FileFailure>>,
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) | Self::BatchFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match self {
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::BadGateway(msg)
            | Self::GatewayTimeout(msg)
            | Self::Internal(msg) => (msg, None),
            Self::BatchFailed { message, details } => (message, Some(details)),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
            details,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<McpError> for HttpError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::ToolNotFound(_) | McpError::NotConnected(_) => Self::NotFound(err.to_string()),
            McpError::AlreadyConnected(_) => Self::Conflict(err.to_string()),
            McpError::InvalidConfig(msg) => Self::BadRequest(msg),
            McpError::Timeout { .. } => Self::GatewayTimeout(err.to_string()),
            McpError::Json(_) => Self::Internal(err.to_string()),
            McpError::Spawn(_)
            | McpError::Handshake { .. }
            | McpError::Server { .. }
            | McpError::Protocol(_)
            | McpError::Transport(_)
            | McpError::ChannelClosed(_)
            | McpError::Io(_) => Self::BadGateway(err.to_string()),
        }
    }
}

impl From<TransformError> for HttpError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Archive(_) | TransformError::UnsafeEntry(_) => {
                Self::BadRequest(err.to_string())
            }
            TransformError::Io { .. } | TransformError::Walk { .. } | TransformError::Task(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
