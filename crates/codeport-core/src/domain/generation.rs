//! LLM generation request types.

use serde::{Deserialize, Serialize};

/// Default sampling temperature for code generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default context window, in tokens.
pub const DEFAULT_NUM_CTX: u32 = 16_384;

/// Per-request generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,

    /// Context window size in tokens.
    pub num_ctx: u32,

    /// Model override; the backend's configured model is used when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            num_ctx: DEFAULT_NUM_CTX,
            model: None,
        }
    }
}

/// A single non-streaming generation request: prompt, system prompt, options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: String,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: system.into(),
            options: GenerationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}
