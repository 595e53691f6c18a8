//! Language-model provider abstraction and implementations.
//!
//! Defines the [`ChatModel`] trait and two concrete clients:
//! - **[`OpenAiChatModel`]** — any OpenAI-compatible `/chat/completions`
//!   endpoint; the base URL, model id, and credential env-var name are
//!   configuration, so non-OpenAI hosts speaking the same shape work too.
//! - **[`OllamaChatModel`]** — a local Ollama instance's `/api/chat` endpoint.
//!
//! Sampling temperature is pinned to zero in every request so identical
//! prompts reproduce identical completions; it is deliberately not a
//! configuration knob. Retry behavior mirrors the embedding clients:
//! 429/5xx/network errors back off exponentially, other 4xx fail fast.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;

/// Deterministic sampling for reproducible answers.
const TEMPERATURE: f64 = 0.0;

/// Language-model failure. A failed generation is surfaced to the caller;
/// it must never be silently swallowed or crash the hosting process.
#[derive(Debug)]
pub enum GenerationError {
    Config(String),
    Transport(String),
    Api(String),
    EmptyCompletion,
    Malformed(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Config(e) => write!(f, "language model misconfigured: {}", e),
            GenerationError::Transport(e) => write!(f, "language model unreachable: {}", e),
            GenerationError::Api(e) => write!(f, "language model error: {}", e),
            GenerationError::EmptyCompletion => write!(f, "language model returned an empty completion"),
            GenerationError::Malformed(e) => write!(f, "malformed completion response: {}", e),
        }
    }
}

impl std::error::Error for GenerationError {}

/// A capability endpoint that completes an instruction-style prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;
    /// Complete `prompt` under `system` instructions. Returns the completion
    /// text; an empty completion is an error, not an answer.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

/// Create the configured [`ChatModel`].
pub fn create_chat_model(config: &LlmConfig) -> Result<Box<dyn ChatModel>, GenerationError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiChatModel::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChatModel::new(config)?)),
        other => Err(GenerationError::Config(format!(
            "unknown provider '{}'",
            other
        ))),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationError::Config(e.to_string()))
}

fn non_empty(completion: String) -> Result<String, GenerationError> {
    let trimmed = completion.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(trimmed.to_string())
}

// ============ OpenAI-compatible provider ============

#[derive(Debug)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GenerationError::Config(format!(
                "environment variable {} not set",
                config.api_key_env
            ))
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": TEMPERATURE,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, delay_secs = delay.as_secs(), "retrying completion call");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/chat/completions", self.url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
                        return non_empty(parse_openai_completion(&json)?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(GenerationError::Api(format!("{}: {}", status, body_text)));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(GenerationError::Api(format!("{}: {}", status, body_text)));
                }
                Err(e) => {
                    last_err = Some(GenerationError::Transport(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| GenerationError::Transport("completion failed after retries".into())))
    }
}

fn parse_openai_completion(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| GenerationError::Malformed("missing choices[0].message.content".to_string()))
}

// ============ Ollama provider ============

pub struct OllamaChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
            "options": {"temperature": TEMPERATURE},
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/chat", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
                        return non_empty(parse_ollama_completion(&json)?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(GenerationError::Api(format!("{}: {}", status, body_text)));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(GenerationError::Api(format!("{}: {}", status, body_text)));
                }
                Err(e) => {
                    last_err = Some(GenerationError::Transport(format!(
                        "is Ollama running at {}? {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| GenerationError::Transport("completion failed after retries".into())))
    }
}

fn parse_ollama_completion(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| GenerationError::Malformed("missing message.content".to_string()))
}
