//! Text generation port.
//!
//! Abstracts the inference backend behind a single non-streaming call:
//! prompt + system prompt + options in, response text out.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::GenerationRequest;

/// Errors reported by a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend could not be reached.
    #[error("Generation backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success HTTP status.
    #[error("Generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within its deadline.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend's response body was not in the expected shape.
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

/// A backend that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a complete response for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
