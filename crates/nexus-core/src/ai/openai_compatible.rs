//! OpenAI-compatible provider implementation
//!
//! Works with any server that implements the OpenAI chat completions API.
//! The reasoning slot (DeepSeek) and the conversational slot (Groq) both use
//! this adapter; local servers work too:
//! - DeepSeek (https://api.deepseek.com/v1)
//! - Groq (https://api.groq.com/openai/v1)
//! - vLLM (http://localhost:8000/v1)
//! - LocalAI / llama-server (http://localhost:8080/v1)
//!
//! The configured `base_url` includes the API version segment; requests go
//! to `{base_url}/chat/completions`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::{Error, Result};

use super::parsing::with_json_instruction;
use super::sse;
use super::types::{Capability, ChunkCallback, ProviderId};
use super::AIProvider;

/// OpenAI-compatible provider
///
/// Supports text, native JSON mode and SSE streaming. Media, grounded search
/// and embeddings are left to the multimodal provider.
#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    id: ProviderId,
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    structured_temperature: f32,
    max_tokens: u32,
    structured_max_tokens: u32,
}

impl OpenAICompatibleProvider {
    /// Create a provider from slot settings and a credential
    pub fn new(id: ProviderId, settings: &ProviderSettings, api_key: Option<&str>) -> Self {
        let http_client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_default();

        Self {
            id,
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            temperature: settings.temperature,
            structured_temperature: settings.structured_temperature,
            max_tokens: settings.max_tokens,
            structured_max_tokens: settings.structured_max_tokens,
        }
    }

    fn messages(prompt: &str, system_prompt: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        messages
    }

    fn post(&self, request: &ChatCompletionRequest) -> RequestBuilder {
        let mut req_builder = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }
        req_builder
    }

    /// Send the request and fail on non-2xx statuses
    async fn send(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response> {
        let response = self.post(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: self.id,
                message: format!("API error {}: {}", status, body),
            });
        }

        Ok(response)
    }

    /// Make a non-streaming chat completion request
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<String> {
        let response = self.send(&request).await?;
        let chat_response: ChatCompletionResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Error::Provider {
                provider: self.id,
                message: "Empty response from chat completions API".to_string(),
            });
        }

        debug!(provider = %self.id, model = %self.model, "Chat completion: {}", content);
        Ok(content)
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Native JSON mode selector
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// One SSE chunk of a streamed completion
#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
}

#[async_trait]
impl AIProvider for OpenAICompatibleProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::GenerateText,
            Capability::GenerateStructured,
            Capability::StreamText,
        ]
    }

    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        self.chat_completion(ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::messages(prompt, system_prompt),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            response_format: None,
            stream: false,
        })
        .await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema_hint: Option<&serde_json::Value>,
    ) -> Result<String> {
        // JSON mode requires the word "JSON" somewhere in the messages
        let prompt = with_json_instruction(prompt, schema_hint);

        self.chat_completion(ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::messages(&prompt, Some(system_prompt)),
            temperature: Some(self.structured_temperature),
            max_tokens: Some(self.structured_max_tokens),
            response_format: Some(ResponseFormat {
                kind: "json_object".to_string(),
            }),
            stream: false,
        })
        .await
    }

    async fn stream_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        on_chunk: &ChunkCallback,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::messages(prompt, system_prompt),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            response_format: None,
            stream: true,
        };

        let response = self.send(&request).await?;
        let mut full = String::new();

        sse::for_each_data(self.id, response, |data| {
            let chunk: ChatStreamChunk = serde_json::from_str(data)?;
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    on_chunk(&content);
                    full.push_str(&content);
                }
            }
            Ok(())
        })
        .await?;

        if full.is_empty() {
            return Err(Error::Provider {
                provider: self.id,
                message: "Stream ended without content".to_string(),
            });
        }
        Ok(full)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self.http_client.get(format!("{}/models", self.base_url));
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        match req_builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
