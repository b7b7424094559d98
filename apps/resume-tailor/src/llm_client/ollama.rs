//! Ollama backend: `POST {base_url}/api/chat`, non-streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_with_backoff, CompletionClient, GenerationOptions, LlmError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(client: Client, base_url: String, options: GenerationOptions) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatRequest {
            model: &self.options.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        };
        let url = self.chat_url();

        let response: ChatResponse =
            send_with_backoff("Ollama", || self.client.post(&url).json(&body)).await?;

        tracing::debug!(
            "Ollama usage: prompt_tokens={}, completion_tokens={}",
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0)
        );

        response
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    fn model(&self) -> &str {
        &self.options.model
    }
}
