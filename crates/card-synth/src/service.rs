use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// One request to the generative completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,

    /// Maximum output length bound, in tokens
    pub max_output_tokens: u32,
}

/// The generative completion service, treated as an opaque text-completion
/// collaborator. Synchronous; implementations carry their own timeout.
pub trait CompletionService {
    fn generate(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

/// Configuration for the HTTP completion client
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    /// Base URL of an OpenAI-compatible API ("https://api.openai.com/v1")
    pub base_url: String,

    /// Model identifier ("o4-mini", "gpt-4o", ...)
    pub model: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Whole-request timeout; expiry maps to `ServiceError::timeout`
    pub timeout: Duration,
}

/// Blocking HTTP client against an OpenAI-compatible chat-completions
/// endpoint. The pipeline is synchronous per run, so the blocking client
/// is the natural fit.
pub struct HttpCompletionService {
    client: reqwest::blocking::Client,
    config: HttpServiceConfig,
}

impl HttpCompletionService {
    pub fn new(config: HttpServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::transport(format!("failed to build client: {e}")))?;

        Ok(Self { client, config })
    }
}

impl CompletionService for HttpCompletionService {
    fn generate(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "max_tokens": request.max_output_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::timeout(format!("request to {url} timed out"))
                } else {
                    ServiceError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::quota(format!("{url} returned 429")));
        }
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            let snippet: String = detail.chars().take(200).collect();
            return Err(ServiceError::transport(format!(
                "{url} returned {status}: {snippet}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| ServiceError::transport(format!("malformed response body: {e}")))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::transport("response carries no message content".to_string())
            })
    }
}
