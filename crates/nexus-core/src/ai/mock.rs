//! Mock provider for testing
//!
//! Scriptable per capability: queue replies (text, failures, chunked streams,
//! hangs) and inspect the prompts each operation received. Clones share the
//! script and the call log, so a test can keep a handle while the registry
//! hands copies to the router.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{Capability, ChunkCallback, MediaPayload, ProviderId};
use super::AIProvider;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this text (streamed as a single chunk)
    Text(String),
    /// Succeed, streaming these chunks in order
    Chunks(Vec<String>),
    /// Emit these chunks, then fail mid-stream
    ChunksThenFail(Vec<String>, String),
    /// Succeed with an embedding
    Embedding(Vec<f32>),
    /// Fail with a provider error
    Fail(String),
    /// Never resolve (exercises router timeouts)
    Hang,
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        MockReply::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }
}

/// A recorded call
#[derive(Debug, Clone)]
pub struct MockCall {
    pub capability: Capability,
    pub prompt: String,
    pub system_prompt: Option<String>,
}

#[derive(Default)]
struct MockState {
    replies: HashMap<Capability, VecDeque<MockReply>>,
    calls: Vec<MockCall>,
}

/// Mock AI provider for testing
///
/// Unscripted calls return predictable canned responses.
#[derive(Clone)]
pub struct MockProvider {
    id: ProviderId,
    state: Arc<Mutex<MockState>>,
    disabled: HashSet<Capability>,
    failure: Option<String>,
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockProvider {
    /// Create a new mock provider (healthy, every capability enabled)
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(MockState::default())),
            disabled: HashSet::new(),
            failure: None,
            healthy: true,
        }
    }

    /// Create a provider whose every call fails with `message`
    pub fn failing(id: ProviderId, message: &str) -> Self {
        let mut mock = Self::new(id);
        mock.failure = Some(message.to_string());
        mock.healthy = false;
        mock
    }

    /// Queue a reply for one capability
    pub fn with_reply(self, capability: Capability, reply: MockReply) -> Self {
        self.lock()
            .replies
            .entry(capability)
            .or_default()
            .push_back(reply);
        self
    }

    /// Shorthand: queue a text reply
    pub fn with_text(self, capability: Capability, text: &str) -> Self {
        self.with_reply(capability, MockReply::text(text))
    }

    /// Remove a capability (calls fail with UnsupportedCapability)
    pub fn without(mut self, capability: Capability) -> Self {
        self.disabled.insert(capability);
        self
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made to one capability
    pub fn call_count(&self, capability: Capability) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.capability == capability)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and pick the reply to play back
    fn next_reply(
        &self,
        capability: Capability,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<MockReply> {
        let mut state = self.lock();
        state.calls.push(MockCall {
            capability,
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
        });

        if self.disabled.contains(&capability) {
            return Err(self.unsupported(capability));
        }
        if let Some(ref message) = self.failure {
            return Ok(MockReply::Fail(message.clone()));
        }

        let scripted = state
            .replies
            .get_mut(&capability)
            .and_then(|queue| queue.pop_front());

        Ok(scripted.unwrap_or_else(|| default_reply(capability)))
    }

    /// Play a reply for a non-streaming operation
    async fn play(&self, reply: MockReply) -> Result<String> {
        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Chunks(chunks) => Ok(chunks.concat()),
            MockReply::ChunksThenFail(_, message) | MockReply::Fail(message) => {
                Err(self.provider_error(message))
            }
            MockReply::Embedding(values) => Ok(format!("{:?}", values)),
            MockReply::Hang => {
                std::future::pending::<()>().await;
                Err(self.provider_error("mock hang resolved".to_string()))
            }
        }
    }

    fn provider_error(&self, message: String) -> Error {
        Error::Provider {
            provider: self.id,
            message,
        }
    }
}

fn default_reply(capability: Capability) -> MockReply {
    match capability {
        Capability::GenerateText => MockReply::text("mock response"),
        Capability::GenerateStructured => MockReply::text("{}"),
        Capability::StreamText => MockReply::chunks(&["mock ", "response"]),
        Capability::UnderstandMedia => MockReply::text("mock media analysis"),
        Capability::GroundedSearch => MockReply::text("mock search result"),
        Capability::Embed => MockReply::Embedding(vec![0.1, 0.2, 0.3]),
    }
}

#[async_trait]
impl AIProvider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn capabilities(&self) -> Vec<Capability> {
        [
            Capability::GenerateText,
            Capability::GenerateStructured,
            Capability::StreamText,
            Capability::UnderstandMedia,
            Capability::GroundedSearch,
            Capability::Embed,
        ]
        .into_iter()
        .filter(|c| !self.disabled.contains(c))
        .collect()
    }

    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let reply = self.next_reply(Capability::GenerateText, prompt, system_prompt)?;
        self.play(reply).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        _schema_hint: Option<&serde_json::Value>,
    ) -> Result<String> {
        let reply = self.next_reply(Capability::GenerateStructured, prompt, Some(system_prompt))?;
        self.play(reply).await
    }

    async fn stream_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        on_chunk: &ChunkCallback,
    ) -> Result<String> {
        let reply = self.next_reply(Capability::StreamText, prompt, system_prompt)?;
        match reply {
            MockReply::Text(text) => {
                on_chunk(&text);
                Ok(text)
            }
            MockReply::Chunks(chunks) => {
                let mut full = String::new();
                for chunk in chunks {
                    on_chunk(&chunk);
                    full.push_str(&chunk);
                }
                Ok(full)
            }
            MockReply::ChunksThenFail(chunks, message) => {
                for chunk in chunks {
                    on_chunk(&chunk);
                }
                Err(self.provider_error(message))
            }
            other => self.play(other).await,
        }
    }

    async fn understand_media(&self, media: &MediaPayload, prompt: &str) -> Result<String> {
        let reply = self.next_reply(Capability::UnderstandMedia, prompt, Some(&media.mime_type))?;
        self.play(reply).await
    }

    async fn grounded_search(&self, query: &str) -> Result<String> {
        let reply = self.next_reply(Capability::GroundedSearch, query, None)?;
        self.play(reply).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.next_reply(Capability::Embed, text, None)? {
            MockReply::Embedding(values) => Ok(values),
            other => self.play(other).await.map(|_| Vec::new()),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
