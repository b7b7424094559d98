//! LLM Client: the single point of entry for all model calls in the tailor.
//!
//! ARCHITECTURAL RULE: No other module may talk to a model backend directly.
//! Everything goes through `CompletionClient`; backends are variants behind it.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, LlmProvider};

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod prompts;
#[cfg(test)]
pub mod testing;

pub use gemini::GeminiClient;
pub use mock::MockClient;
pub use ollama::OllamaClient;

/// Transport-level retries for 429 / 5xx responses. Parse and validation
/// retries live in `tailoring::retry`, not here.
const MAX_TRANSPORT_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Sampling options shared by every HTTP backend.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// "Send a prompt, get text back." Transport failures surface as `LlmError`;
/// callers decide what, if anything, to retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;

    /// Model identifier, for logs and `info`.
    fn model(&self) -> &str;
}

/// Constructs the configured backend.
pub fn build_client(config: &Config, model: &str) -> anyhow::Result<Arc<dyn CompletionClient>> {
    let options = GenerationOptions {
        model: model.to_string(),
        temperature: config.llm_temperature,
        max_tokens: config.llm_max_tokens,
    };

    let client: Arc<dyn CompletionClient> = match config.llm_provider {
        LlmProvider::Ollama => {
            let base_url = config.llm_base_url.clone().ok_or_else(|| {
                anyhow::anyhow!("RESUME_TAILOR_LLM_BASE_URL must be set for Ollama")
            })?;
            Arc::new(OllamaClient::new(http_client()?, base_url, options))
        }
        LlmProvider::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
            Arc::new(GeminiClient::new(http_client()?, api_key, options))
        }
        LlmProvider::Mock => Arc::new(MockClient::new(model)),
    };

    info!(
        "LLM client initialized (provider: {}, model: {})",
        config.llm_provider.as_str(),
        client.model()
    );
    Ok(client)
}

fn http_client() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// Sends a JSON request, retrying on 429 (rate limit) and 5xx with exponential
/// backoff, and deserializes a successful body. `build` is called once per
/// attempt because a `RequestBuilder` is consumed by `send`.
pub(crate) async fn send_with_backoff<T, F>(backend: &str, build: F) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_TRANSPORT_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "{backend} call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("{backend} API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: T = response.json().await?;
        debug!("{backend} call succeeded on attempt {}", attempt + 1);
        return Ok(parsed);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: MAX_TRANSPORT_RETRIES,
    }))
}

/// Pulls `error.message` (Gemini) or `error` (Ollama) out of an error body,
/// falling back to the raw body.
fn api_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Strips the delimiters of the first ``` fenced block in model output.
///
/// The opening fence may carry a language tag (```yaml). Text outside the
/// first block is discarded. An unterminated fence keeps everything after it.
pub fn strip_code_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };

    let after_open = &text[open + 3..];
    // Skip the language tag line, if any.
    let body = match after_open.find('\n') {
        Some(nl) if !after_open[..nl].contains("```") => &after_open[nl + 1..],
        _ => after_open,
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}
