//! Decision generator backed by an OpenAI-compatible chat completions API.
//!
//! Works with OpenAI, Azure, Ollama, vLLM and other servers exposing
//! `/chat/completions`. A batch is sent as concurrent single requests, at most
//! `batch.len()` in flight, and the responses are returned in request order.

use super::DecisionGenerator;
use super::prompt;
use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::types::{GenerationRequest, Lang};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

pub struct OpenAiCompatGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout_secs: u64,
    lang: Lang,
}

impl OpenAiCompatGenerator {
    /// Build a generator, reading the API key from `config.api_key_env`.
    pub fn new(config: &GeneratorConfig, lang: Lang) -> Result<Self, GeneratorError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| GeneratorError::AuthFailed {
            provider: format!("env var '{}' not set", config.api_key_env),
        })?;
        Self::with_api_key(config, lang, api_key)
    }

    pub fn with_api_key(
        config: &GeneratorConfig,
        lang: Lang,
        api_key: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeneratorError::Api {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            lang,
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let rendered = prompt::render(request, self.lang);
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": rendered.system},
                {"role": "user", "content": rendered.user},
            ],
            "temperature": self.temperature,
            "stream": false,
        })
    }

    async fn complete_one(&self, request: &GenerationRequest) -> Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let response_body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, retry_after, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| GeneratorError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;
        Self::parse_content(&json)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> GeneratorError {
        if e.is_timeout() {
            GeneratorError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            GeneratorError::Connection {
                message: e.to_string(),
            }
        }
    }

    /// Map an HTTP error status to a generator fault.
    fn map_http_error(
        status: reqwest::StatusCode,
        retry_after: Option<u64>,
        body: &str,
    ) -> GeneratorError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed");
                GeneratorError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            408 => GeneratorError::Timeout { timeout_secs: 0 },
            429 => GeneratorError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(5),
            },
            code if code >= 500 => GeneratorError::Connection {
                message: format!("Server error ({code}): {body}"),
            },
            code => GeneratorError::Api {
                message: format!("HTTP {code}: {body}"),
            },
        }
    }

    /// Extract `choices[0].message.content`.
    ///
    /// A choice without text content (refusals, content filtering) yields an
    /// empty string, which degrades to a raw-text result for that row only.
    fn parse_content(json: &Value) -> Result<String, GeneratorError> {
        let choice = json
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| GeneratorError::ResponseParse {
                message: "response has no choices[0]".to_string(),
            })?;
        match choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            Some(content) => Ok(content.to_string()),
            None => {
                let finish_reason = choice
                    .get("finish_reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                warn!(finish_reason, "Completion has no text content");
                Ok(String::new())
            }
        }
    }
}

#[async_trait]
impl DecisionGenerator for OpenAiCompatGenerator {
    async fn generate(&self, batch: &[GenerationRequest]) -> Result<Vec<String>, GeneratorError> {
        let futures: Vec<_> = batch
            .iter()
            .map(|request| self.complete_one(request))
            .collect();
        futures::future::join_all(futures)
            .await
            .into_iter()
            .collect()
    }

    fn name(&self) -> &str {
        &self.model
    }
}
