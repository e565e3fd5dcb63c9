//! Internal error types for the generation client.
//!
//! Mapped to `GenerationError` at the port boundary.

use std::time::Duration;

use codeport_core::GenerationError;
use thiserror::Error;

/// Errors building or talking to the generation backend.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// The configured URL does not parse.
    #[error("Invalid generation URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Generation request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from generation backend: {0}")]
    InvalidResponse(String),
}

impl From<OllamaError> for GenerationError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::Timeout { after, .. } => Self::Timeout(after),
            OllamaError::Status { status, body } => Self::Status { status, body },
            OllamaError::InvalidResponse(message) => Self::InvalidResponse(message),
            other @ (OllamaError::InvalidUrl { .. }
            | OllamaError::ClientBuild(_)
            | OllamaError::Network { .. }) => Self::Unreachable(other.to_string()),
        }
    }
}
