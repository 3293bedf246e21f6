//! Task router
//!
//! Maps each task kind to a primary and a fallback provider step. A task runs
//! its primary step; on any failure (missing credential, unsupported
//! capability, transport, HTTP status, empty content, timeout) the fallback
//! step runs once. The same provider is never retried.
//!
//! Default routing:
//!
//! | Task         | Primary                            | Fallback                          |
//! |--------------|------------------------------------|-----------------------------------|
//! | reasoning    | reasoning `generate_text`          | multimodal `generate_text` (merged)|
//! | conversation | conversational text or stream      | multimodal `generate_text` (merged)|
//! | multimodal   | multimodal `understand_media`      | reasoning `generate_text`          |
//! | search       | multimodal `grounded_search`       | reasoning `generate_text`          |
//!
//! "Merged" means the system prompt is prepended to the prompt as
//! `"{system}\n\n{prompt}"` instead of being sent separately.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::prompts::PromptLibrary;

use super::registry::ProviderRegistry;
use super::types::{ChunkCallback, MediaPayload, ProviderId};
use super::AIProvider;

/// Kind of work a pipeline asks the orchestrator to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Long-form analysis (budgets, forecasts)
    Reasoning,
    /// Fast replies, narratives, recommendations
    Conversation,
    /// Image or document understanding
    Multimodal,
    /// Questions needing current external knowledge
    Search,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Conversation => "conversation",
            Self::Multimodal => "multimodal",
            Self::Search => "search",
        }
    }

    pub fn all() -> &'static [TaskKind] {
        &[
            Self::Reasoning,
            Self::Conversation,
            Self::Multimodal,
            Self::Search,
        ]
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reasoning" => Ok(Self::Reasoning),
            "conversation" | "conversational" => Ok(Self::Conversation),
            "multimodal" => Ok(Self::Multimodal),
            "search" => Ok(Self::Search),
            _ => Err(format!("Unknown task kind: {}", s)),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of routed work
///
/// Built with the consuming builder methods; not modified once handed to the
/// orchestrator.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub kind: TaskKind,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub media: Option<MediaPayload>,
    pub streaming: bool,
    pub on_chunk: Option<ChunkCallback>,
}

impl TaskDescriptor {
    pub fn new(kind: TaskKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            system_prompt: None,
            media: None,
            streaming: false,
            on_chunk: None,
        }
    }

    pub fn reasoning(prompt: impl Into<String>) -> Self {
        Self::new(TaskKind::Reasoning, prompt)
    }

    pub fn conversation(prompt: impl Into<String>) -> Self {
        Self::new(TaskKind::Conversation, prompt)
    }

    pub fn multimodal(prompt: impl Into<String>, media: MediaPayload) -> Self {
        Self::new(TaskKind::Multimodal, prompt).with_media(media)
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::new(TaskKind::Search, query)
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_media(mut self, media: MediaPayload) -> Self {
        self.media = Some(media);
        self
    }

    /// Request incremental delivery (honored for conversation tasks)
    pub fn streaming(mut self, on_chunk: ChunkCallback) -> Self {
        self.streaming = true;
        self.on_chunk = Some(on_chunk);
        self
    }

    /// System prompt prepended to the prompt, for steps that take one string
    fn merged_prompt(&self) -> String {
        match self.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            Some(system) => format!("{}\n\n{}", system, self.prompt),
            None => self.prompt.clone(),
        }
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("kind", &self.kind)
            .field("prompt_len", &self.prompt.len())
            .field("has_system_prompt", &self.system_prompt.is_some())
            .field("media", &self.media.as_ref().map(|m| &m.mime_type))
            .field("streaming", &self.streaming)
            .finish()
    }
}

/// Outcome of one orchestration
#[derive(Debug, Clone, PartialEq)]
pub struct AIResult {
    pub content: String,
    pub provider_used: ProviderId,
    pub was_fallback: bool,
}

/// How a route step invokes its provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOperation {
    /// `generate_text(prompt, system_prompt)`
    GenerateText,
    /// `generate_text("{system}\n\n{prompt}", None)`
    GenerateTextMerged,
    /// `stream_text` when the task asks for streaming, else `generate_text`
    StreamableText,
    /// `understand_media(media, merged prompt)`; requires media
    UnderstandMedia,
    /// `grounded_search(prompt)`
    GroundedSearch,
}

/// A provider plus the operation to call on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteStep {
    pub provider: ProviderId,
    pub operation: StepOperation,
}

impl RouteStep {
    pub fn new(provider: ProviderId, operation: StepOperation) -> Self {
        Self {
            provider,
            operation,
        }
    }
}

/// Primary and fallback steps for one task kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRoute {
    pub primary: RouteStep,
    pub fallback: RouteStep,
}

/// Task kind to route mapping
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<TaskKind, TaskRoute>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            routes: TaskKind::all()
                .iter()
                .map(|&kind| (kind, default_route(kind)))
                .collect(),
        }
    }
}

fn default_route(kind: TaskKind) -> TaskRoute {
    use ProviderId::*;
    use StepOperation::*;

    match kind {
        TaskKind::Reasoning => TaskRoute {
            primary: RouteStep::new(Reasoning, GenerateText),
            fallback: RouteStep::new(Multimodal, GenerateTextMerged),
        },
        TaskKind::Conversation => TaskRoute {
            primary: RouteStep::new(Conversational, StreamableText),
            fallback: RouteStep::new(Multimodal, GenerateTextMerged),
        },
        TaskKind::Multimodal => TaskRoute {
            primary: RouteStep::new(Multimodal, UnderstandMedia),
            fallback: RouteStep::new(Reasoning, GenerateText),
        },
        TaskKind::Search => TaskRoute {
            primary: RouteStep::new(Multimodal, GroundedSearch),
            fallback: RouteStep::new(Reasoning, GenerateText),
        },
    }
}

impl RoutingTable {
    /// Route for a task kind
    pub fn route(&self, kind: TaskKind) -> TaskRoute {
        self.routes
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_route(kind))
    }

    /// Replace the route for a task kind
    pub fn set(&mut self, kind: TaskKind, route: TaskRoute) {
        self.routes.insert(kind, route);
    }

    /// Builder form of `set`
    pub fn with_route(mut self, kind: TaskKind, route: TaskRoute) -> Self {
        self.set(kind, route);
        self
    }
}

/// Routes tasks to providers and applies fallback
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    table: RoutingTable,
    task_timeouts: HashMap<TaskKind, Duration>,
    default_timeout: Duration,
    prompts: Arc<PromptLibrary>,
}

impl Orchestrator {
    /// Create an orchestrator with the default routing table and the
    /// registry's configured timeouts
    ///
    /// Pipelines use the embedded prompts until `with_prompts` installs a
    /// library that honors user overrides.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let config = registry.config();
        let task_timeouts = config.task_timeouts.clone();
        let default_timeout = config.default_timeout;

        Self {
            registry,
            table: RoutingTable::default(),
            task_timeouts,
            default_timeout,
            prompts: Arc::new(PromptLibrary::embedded_only()),
        }
    }

    /// Substitute the prompt library used by the pipelines
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Substitute the routing table
    pub fn with_routing_table(mut self, table: RoutingTable) -> Self {
        self.table = table;
        self
    }

    /// Override the attempt timeout for one task kind
    pub fn with_timeout(mut self, kind: TaskKind, timeout: Duration) -> Self {
        self.task_timeouts.insert(kind, timeout);
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// Attempt timeout for a task kind
    pub fn timeout_for(&self, kind: TaskKind) -> Duration {
        self.task_timeouts
            .get(&kind)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Run a task on its primary provider, falling back once on failure
    pub async fn orchestrate(&self, task: TaskDescriptor) -> Result<AIResult> {
        if task.kind == TaskKind::Multimodal && task.media.is_none() {
            return Err(Error::InvalidRequest(
                "Multimodal task requires an image or document payload".to_string(),
            ));
        }

        let route = self.table.route(task.kind);
        let timeout = self.timeout_for(task.kind);

        debug!(task = %task.kind, provider = %route.primary.provider, "Routing task");

        let primary_err = match self.attempt(route.primary, &task, true, timeout).await {
            Ok(content) => {
                return Ok(AIResult {
                    content,
                    provider_used: route.primary.provider,
                    was_fallback: false,
                })
            }
            Err(e) => e,
        };

        warn!(
            task = %task.kind,
            provider = %route.primary.provider,
            fallback = %route.fallback.provider,
            "Primary provider failed: {}",
            primary_err
        );

        match self.attempt(route.fallback, &task, false, timeout).await {
            Ok(content) => {
                info!(task = %task.kind, provider = %route.fallback.provider, "Fallback provider succeeded");
                Ok(AIResult {
                    content,
                    provider_used: route.fallback.provider,
                    was_fallback: true,
                })
            }
            Err(fallback_err) => {
                warn!(
                    task = %task.kind,
                    provider = %route.fallback.provider,
                    "Fallback provider failed: {}",
                    fallback_err
                );
                Err(Error::AllProvidersFailed {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    /// Embedding from the multimodal provider (no fallback: only it embeds)
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let client = self.registry.get(ProviderId::Multimodal)?;
        client.embed(text).await
    }

    /// One bounded step; a timeout counts as the provider failing
    async fn attempt(
        &self,
        step: RouteStep,
        task: &TaskDescriptor,
        allow_stream: bool,
        timeout: Duration,
    ) -> Result<String> {
        let content = tokio::time::timeout(timeout, self.run_step(step, task, allow_stream))
            .await
            .map_err(|_| Error::Timeout {
                provider: step.provider,
                timeout,
            })??;

        if content.trim().is_empty() {
            return Err(Error::Provider {
                provider: step.provider,
                message: "Empty response".to_string(),
            });
        }
        Ok(content)
    }

    async fn run_step(
        &self,
        step: RouteStep,
        task: &TaskDescriptor,
        allow_stream: bool,
    ) -> Result<String> {
        let client = self.registry.get(step.provider)?;
        let system = task.system_prompt.as_deref();

        match step.operation {
            StepOperation::GenerateText => client.generate_text(&task.prompt, system).await,
            StepOperation::GenerateTextMerged => {
                client.generate_text(&task.merged_prompt(), None).await
            }
            StepOperation::StreamableText => match task.on_chunk {
                Some(ref on_chunk) if allow_stream && task.streaming => {
                    client.stream_text(&task.prompt, system, on_chunk).await
                }
                _ => client.generate_text(&task.prompt, system).await,
            },
            StepOperation::UnderstandMedia => {
                let media = task.media.as_ref().ok_or_else(|| {
                    Error::InvalidRequest("Media step requires a media payload".to_string())
                })?;
                client.understand_media(media, &task.merged_prompt()).await
            }
            StepOperation::GroundedSearch => client.grounded_search(&task.prompt).await,
        }
    }
}
