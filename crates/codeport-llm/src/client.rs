//! `TextGenerator` implementation over the Ollama generate API.

use async_trait::async_trait;
use codeport_core::{GenerationError, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OllamaConfig;
use crate::error::OllamaError;

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

/// Non-streaming generation client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: Url,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, OllamaError> {
        let raw = config.endpoint();
        let endpoint = Url::parse(&raw).map_err(|source| OllamaError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OllamaError::ClientBuild)?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn post(&self, request: &GenerationRequest) -> Result<String, OllamaError> {
        let model = request
            .options
            .model
            .as_deref()
            .unwrap_or(&self.config.model);
        let body = GenerateBody {
            model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            options: GenerateOptions {
                temperature: request.options.temperature,
                num_ctx: request.options.num_ctx,
            },
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %model,
            prompt_chars = request.prompt.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        let reply: GenerateReply = serde_json::from_str(&text)
            .map_err(|e| OllamaError::InvalidResponse(e.to_string()))?;

        tracing::debug!(model = %model, response_chars = reply.response.len(), "Generation complete");
        Ok(reply.response)
    }

    fn classify(&self, err: reqwest::Error) -> OllamaError {
        if err.is_timeout() {
            OllamaError::Timeout {
                url: self.endpoint.to_string(),
                after: self.config.timeout,
            }
        } else {
            OllamaError::Network {
                url: self.endpoint.to_string(),
                source: err,
            }
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.post(request).await.map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "Generation failed");
            GenerationError::from(e)
        })
    }
}
