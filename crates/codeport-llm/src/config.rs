//! Public configuration for the generation client.

use std::time::Duration;

/// Path of the non-streaming generation endpoint.
pub const GENERATE_PATH: &str = "/api/generate";

/// Configuration for [`OllamaClient`](crate::OllamaClient).
///
/// ```
/// use codeport_llm::OllamaConfig;
/// use std::time::Duration;
///
/// let config = OllamaConfig::new("http://localhost:11434", "qwen2.5-coder:7b")
///     .with_timeout(Duration::from_secs(120));
/// assert_eq!(config.endpoint(), "http://localhost:11434/api/generate");
/// ```
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub(crate) url: String,
    pub(crate) model: String,
    pub(crate) timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://ollama:11434/api/generate".to_string(),
            model: "qwen2.5-coder:1.5b-base".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl OllamaConfig {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the per-request deadline.
    ///
    /// Defaults to 600 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The generation endpoint, with `/api/generate` appended to bare base URLs.
    pub fn endpoint(&self) -> String {
        let trimmed = self.url.trim_end_matches('/');
        if trimmed.ends_with(GENERATE_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{GENERATE_PATH}")
        }
    }
}
