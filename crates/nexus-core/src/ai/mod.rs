//! Pluggable AI provider abstraction
//!
//! This module provides a provider-agnostic interface for AI operations and
//! the orchestration layer that routes financial tasks across providers.
//!
//! # Architecture
//!
//! - `AIProvider` trait: the capability surface every adapter exposes
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Adapters: `OpenAICompatibleProvider`, `GeminiProvider`, `MockProvider`
//! - `ProviderRegistry`: caller-owned map of configured clients
//! - `Orchestrator`: table-driven task router plus the structured output coercer
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = NexusConfig::load()?;
//! let registry = Arc::new(ProviderRegistry::from_env(config.clone()));
//! let orchestrator = Orchestrator::new(registry);
//!
//! let result = orchestrator
//!     .orchestrate(TaskDescriptor::conversation("How am I doing this month?"))
//!     .await?;
//! println!("{} (via {})", result.content, result.provider_used);
//! ```
//!
//! # Configuration
//!
//! Environment variables (names configurable in providers.toml):
//! - `DEEPSEEK_API_KEY`: reasoning provider credential
//! - `GROQ_API_KEY`: conversational provider credential
//! - `GEMINI_API_KEY`: multimodal provider credential

mod gemini;
mod mock;
mod openai_compatible;
pub mod parsing;
pub mod registry;
pub mod router;
mod sse;
pub mod structured;
pub mod types;

pub use gemini::GeminiProvider;
pub use mock::{MockCall, MockProvider, MockReply};
pub use openai_compatible::OpenAICompatibleProvider;
pub use registry::ProviderRegistry;
pub use router::{
    AIResult, Orchestrator, RouteStep, RoutingTable, StepOperation, TaskDescriptor, TaskKind,
    TaskRoute,
};
pub use types::*;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait defining the capability surface of every provider adapter
///
/// Adapters implement the subset they support; the default methods fail with
/// `UnsupportedCapability`. Implementations must be Send + Sync so one client
/// can serve interleaved orchestrations.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Which provider slot this adapter serves
    fn id(&self) -> ProviderId;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;

    /// Operations this adapter supports
    fn capabilities(&self) -> Vec<Capability>;

    /// Single-shot free-form completion
    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// Completion constrained to JSON
    ///
    /// The default asks for JSON in the prompt; adapters with a native JSON
    /// mode override this.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema_hint: Option<&serde_json::Value>,
    ) -> Result<String> {
        let prompt = parsing::with_json_instruction(prompt, schema_hint);
        self.generate_text(&prompt, Some(system_prompt)).await
    }

    /// Incremental completion; `on_chunk` fires once per fragment in arrival order
    async fn stream_text(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _on_chunk: &ChunkCallback,
    ) -> Result<String> {
        Err(self.unsupported(Capability::StreamText))
    }

    /// Analyze an image or document
    async fn understand_media(&self, _media: &MediaPayload, _prompt: &str) -> Result<String> {
        Err(self.unsupported(Capability::UnderstandMedia))
    }

    /// Answer informed by current external knowledge
    async fn grounded_search(&self, _query: &str) -> Result<String> {
        Err(self.unsupported(Capability::GroundedSearch))
    }

    /// Fixed-dimension embedding vector
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(self.unsupported(Capability::Embed))
    }

    /// Check if the provider endpoint is reachable with the configured credential
    async fn health_check(&self) -> bool;

    /// Build the error for an operation this adapter lacks
    fn unsupported(&self, capability: Capability) -> Error {
        Error::UnsupportedCapability {
            provider: self.id(),
            capability,
        }
    }

    /// Summary for display
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            model: self.model().to_string(),
            host: self.host().to_string(),
            capabilities: self.capabilities(),
        }
    }
}

/// Concrete provider client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
/// All variants implement the same AIProvider operations.
#[derive(Clone)]
pub enum ProviderClient {
    /// OpenAI-compatible chat API (DeepSeek, Groq, vLLM, LocalAI, ...)
    OpenAICompatible(OpenAICompatibleProvider),
    /// Google Gemini API
    Gemini(GeminiProvider),
    /// Scripted provider for testing
    Mock(MockProvider),
}

impl ProviderClient {
    /// Create a mock client for a provider slot
    pub fn mock(id: ProviderId) -> Self {
        ProviderClient::Mock(MockProvider::new(id))
    }
}

impl From<MockProvider> for ProviderClient {
    fn from(mock: MockProvider) -> Self {
        ProviderClient::Mock(mock)
    }
}

impl From<OpenAICompatibleProvider> for ProviderClient {
    fn from(provider: OpenAICompatibleProvider) -> Self {
        ProviderClient::OpenAICompatible(provider)
    }
}

impl From<GeminiProvider> for ProviderClient {
    fn from(provider: GeminiProvider) -> Self {
        ProviderClient::Gemini(provider)
    }
}

// Implement AIProvider for ProviderClient by delegating to the inner adapter
#[async_trait]
impl AIProvider for ProviderClient {
    fn id(&self) -> ProviderId {
        match self {
            ProviderClient::OpenAICompatible(p) => p.id(),
            ProviderClient::Gemini(p) => p.id(),
            ProviderClient::Mock(p) => p.id(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::OpenAICompatible(p) => p.model(),
            ProviderClient::Gemini(p) => p.model(),
            ProviderClient::Mock(p) => p.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::OpenAICompatible(p) => p.host(),
            ProviderClient::Gemini(p) => p.host(),
            ProviderClient::Mock(p) => p.host(),
        }
    }

    fn capabilities(&self) -> Vec<Capability> {
        match self {
            ProviderClient::OpenAICompatible(p) => p.capabilities(),
            ProviderClient::Gemini(p) => p.capabilities(),
            ProviderClient::Mock(p) => p.capabilities(),
        }
    }

    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        match self {
            ProviderClient::OpenAICompatible(p) => p.generate_text(prompt, system_prompt).await,
            ProviderClient::Gemini(p) => p.generate_text(prompt, system_prompt).await,
            ProviderClient::Mock(p) => p.generate_text(prompt, system_prompt).await,
        }
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema_hint: Option<&serde_json::Value>,
    ) -> Result<String> {
        match self {
            ProviderClient::OpenAICompatible(p) => {
                p.generate_structured(prompt, system_prompt, schema_hint)
                    .await
            }
            ProviderClient::Gemini(p) => {
                p.generate_structured(prompt, system_prompt, schema_hint)
                    .await
            }
            ProviderClient::Mock(p) => {
                p.generate_structured(prompt, system_prompt, schema_hint)
                    .await
            }
        }
    }

    async fn stream_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        on_chunk: &ChunkCallback,
    ) -> Result<String> {
        match self {
            ProviderClient::OpenAICompatible(p) => {
                p.stream_text(prompt, system_prompt, on_chunk).await
            }
            ProviderClient::Gemini(p) => p.stream_text(prompt, system_prompt, on_chunk).await,
            ProviderClient::Mock(p) => p.stream_text(prompt, system_prompt, on_chunk).await,
        }
    }

    async fn understand_media(&self, media: &MediaPayload, prompt: &str) -> Result<String> {
        match self {
            ProviderClient::OpenAICompatible(p) => p.understand_media(media, prompt).await,
            ProviderClient::Gemini(p) => p.understand_media(media, prompt).await,
            ProviderClient::Mock(p) => p.understand_media(media, prompt).await,
        }
    }

    async fn grounded_search(&self, query: &str) -> Result<String> {
        match self {
            ProviderClient::OpenAICompatible(p) => p.grounded_search(query).await,
            ProviderClient::Gemini(p) => p.grounded_search(query).await,
            ProviderClient::Mock(p) => p.grounded_search(query).await,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            ProviderClient::OpenAICompatible(p) => p.embed(text).await,
            ProviderClient::Gemini(p) => p.embed(text).await,
            ProviderClient::Mock(p) => p.embed(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::OpenAICompatible(p) => p.health_check().await,
            ProviderClient::Gemini(p) => p.health_check().await,
            ProviderClient::Mock(p) => p.health_check().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_client_mock() {
        let client = ProviderClient::mock(ProviderId::Reasoning);
        assert_eq!(client.id(), ProviderId::Reasoning);
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_unsupported_capability_default() {
        let client: ProviderClient = MockProvider::new(ProviderId::Conversational)
            .without(Capability::GroundedSearch)
            .into();

        let err = client.grounded_search("price of a kettle").await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCapability {
                provider: ProviderId::Conversational,
                capability: Capability::GroundedSearch
            }
        ));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = ProviderClient::mock(ProviderId::Multimodal);
        assert!(client.health_check().await);
    }
}
