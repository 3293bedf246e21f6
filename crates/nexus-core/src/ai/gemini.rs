//! Gemini provider implementation
//!
//! Serves the multimodal slot: plain and JSON-constrained generation, inline
//! images and PDFs, search grounding via the `google_search` tool, SSE
//! streaming and text embeddings. The API key travels as the `key` query
//! parameter.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::{Error, Result};

use super::sse;
use super::types::{Capability, ChunkCallback, MediaPayload, ProviderId};
use super::AIProvider;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Gemini provider
#[derive(Clone)]
pub struct GeminiProvider {
    id: ProviderId,
    http_client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: String,
    temperature: f32,
    structured_temperature: f32,
    max_tokens: u32,
    structured_max_tokens: u32,
}

impl GeminiProvider {
    /// Create a provider from slot settings and a credential
    pub fn new(id: ProviderId, settings: &ProviderSettings, api_key: &str) -> Self {
        let http_client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_default();

        Self {
            id,
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embedding_model: settings
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            api_key: api_key.to_string(),
            temperature: settings.temperature,
            structured_temperature: settings.structured_temperature,
            max_tokens: settings.max_tokens,
            structured_max_tokens: settings.structured_max_tokens,
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn generation_config(&self, structured: bool) -> GenerationConfig {
        if structured {
            GenerationConfig {
                temperature: self.structured_temperature,
                max_output_tokens: self.structured_max_tokens,
                response_mime_type: Some("application/json".to_string()),
                response_schema: None,
            }
        } else {
            GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
                response_mime_type: None,
                response_schema: None,
            }
        }
    }

    fn request(&self, parts: Vec<Part>, system_prompt: Option<&str>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: system_prompt.filter(|s| !s.is_empty()).map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            tools: Vec::new(),
            generation_config: self.generation_config(false),
        }
    }

    /// POST to a model method and fail on non-2xx statuses
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(self.error(format!("API error {}: {}", status, message)));
        }

        Ok(response)
    }

    /// Run generateContent and return the concatenated candidate text
    async fn generate_content(&self, request: GenerateContentRequest) -> Result<String> {
        let response = self
            .post(self.model_url(&self.model, "generateContent"), &request, &[])
            .await?;
        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(error) = parsed.error {
            return Err(self.error(format!("Gemini API error: {}", error.message)));
        }

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(self.error("No content in response".to_string()));
        }

        debug!(provider = %self.id, model = %self.model, "Gemini response: {}", text);
        Ok(text)
    }

    fn error(&self, message: String) -> Error {
        Error::Provider {
            provider: self.id,
            message,
        }
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn text(text: &str) -> Self {
        Part::Text {
            text: text.to_string(),
        }
    }

    fn media(media: &MediaPayload) -> Self {
        Part::Inline {
            inline_data: InlineData {
                mime_type: media.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&media.bytes),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ErrorDetail>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined
    fn text(&self) -> String {
        self.candidates
            .as_deref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[async_trait]
impl AIProvider for GeminiProvider {
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
            Capability::UnderstandMedia,
            Capability::GroundedSearch,
            Capability::Embed,
        ]
    }

    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let request = self.request(vec![Part::text(prompt)], system_prompt);
        self.generate_content(request).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema_hint: Option<&serde_json::Value>,
    ) -> Result<String> {
        let mut request = self.request(vec![Part::text(prompt)], Some(system_prompt));
        request.generation_config = self.generation_config(true);
        request.generation_config.response_schema = schema_hint.cloned();
        self.generate_content(request).await
    }

    async fn stream_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        on_chunk: &ChunkCallback,
    ) -> Result<String> {
        let request = self.request(vec![Part::text(prompt)], system_prompt);
        let response = self
            .post(
                self.model_url(&self.model, "streamGenerateContent"),
                &request,
                &[("alt", "sse")],
            )
            .await?;

        let mut full = String::new();
        sse::for_each_data(self.id, response, |data| {
            let chunk: GenerateContentResponse = serde_json::from_str(data)?;
            if let Some(error) = chunk.error {
                return Err(self.error(format!("Gemini API error: {}", error.message)));
            }
            let text = chunk.text();
            if !text.is_empty() {
                on_chunk(&text);
                full.push_str(&text);
            }
            Ok(())
        })
        .await?;

        if full.is_empty() {
            return Err(self.error("Stream ended without content".to_string()));
        }
        Ok(full)
    }

    async fn understand_media(&self, media: &MediaPayload, prompt: &str) -> Result<String> {
        let request = self.request(vec![Part::text(prompt), Part::media(media)], None);
        self.generate_content(request).await
    }

    async fn grounded_search(&self, query: &str) -> Result<String> {
        let prompt = format!(
            "Search for current market information about: {}. Provide accurate, up-to-date pricing information based on your knowledge.",
            query
        );
        let mut request = self.request(vec![Part::text(&prompt)], None);
        request.tools = vec![Tool {
            google_search: serde_json::json!({}),
        }];
        self.generate_content(request).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content {
                role: None,
                parts: vec![Part::text(text)],
            },
        };

        let response = self
            .post(
                self.model_url(&self.embedding_model, "embedContent"),
                &request,
                &[],
            )
            .await?;
        let parsed: EmbedContentResponse = response.json().await?;

        if parsed.embedding.values.is_empty() {
            return Err(self.error("Empty embedding in response".to_string()));
        }
        Ok(parsed.embedding.values)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
