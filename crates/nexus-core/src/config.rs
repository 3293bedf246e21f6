//! Provider and routing configuration
//!
//! Describes where each provider slot lives (endpoint, model, sampling
//! settings, credential variable) and how long the router waits for a single
//! attempt of each task kind.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/nexus/config/providers.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Values missing from an override file keep their built-in defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::ai::{ProviderId, TaskKind};
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/providers.toml");

/// Wire protocol spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderApi {
    /// `/chat/completions` (DeepSeek, Groq, vLLM, LocalAI, ...)
    OpenAICompatible,
    /// Google Generative Language API
    Gemini,
}

impl FromStr for ProviderApi {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai_compatible" | "openai" => Ok(Self::OpenAICompatible),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(format!("Unknown provider api: {}", s)),
        }
    }
}

/// Settings for one provider slot
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api: ProviderApi,
    pub base_url: String,
    pub model: String,
    /// Model used for `embed` (multimodal provider only)
    pub embedding_model: Option<String>,
    pub temperature: f32,
    /// Lower temperature used for JSON-constrained generation
    pub structured_temperature: f32,
    pub max_tokens: u32,
    pub structured_max_tokens: u32,
    /// HTTP client timeout
    pub timeout: Duration,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl ProviderSettings {
    /// Built-in defaults for a provider slot
    pub fn defaults_for(id: ProviderId) -> Self {
        match id {
            ProviderId::Reasoning => Self {
                api: ProviderApi::OpenAICompatible,
                base_url: "https://api.deepseek.com/v1".to_string(),
                model: "deepseek-chat".to_string(),
                embedding_model: None,
                temperature: 0.7,
                structured_temperature: 0.3,
                max_tokens: 2000,
                structured_max_tokens: 3000,
                timeout: Duration::from_secs(90),
                api_key_env: "DEEPSEEK_API_KEY".to_string(),
            },
            ProviderId::Conversational => Self {
                api: ProviderApi::OpenAICompatible,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                embedding_model: None,
                temperature: 0.8,
                structured_temperature: 0.3,
                max_tokens: 1500,
                structured_max_tokens: 1500,
                timeout: Duration::from_secs(30),
                api_key_env: "GROQ_API_KEY".to_string(),
            },
            ProviderId::Multimodal => Self {
                api: ProviderApi::Gemini,
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-1.5-flash".to_string(),
                embedding_model: Some("text-embedding-004".to_string()),
                temperature: 0.7,
                structured_temperature: 0.3,
                max_tokens: 2048,
                structured_max_tokens: 4096,
                timeout: Duration::from_secs(120),
                api_key_env: "GEMINI_API_KEY".to_string(),
            },
        }
    }

    /// Point this slot at a different endpoint (local servers, test mocks)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Full configuration: provider slots plus router timeouts
#[derive(Debug, Clone)]
pub struct NexusConfig {
    pub providers: HashMap<ProviderId, ProviderSettings>,
    /// Timeout applied to a routed attempt when no task override exists
    pub default_timeout: Duration,
    /// Per-task attempt timeouts
    pub task_timeouts: HashMap<TaskKind, Duration>,
}

impl Default for NexusConfig {
    fn default() -> Self {
        let providers = ProviderId::all()
            .iter()
            .map(|&id| (id, ProviderSettings::defaults_for(id)))
            .collect();

        Self {
            providers,
            default_timeout: Duration::from_secs(60),
            task_timeouts: HashMap::new(),
        }
    }
}

impl NexusConfig {
    /// Load configuration (override in data dir first, then embedded default)
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit override path (falls back to defaults if missing)
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Settings for a provider slot
    pub fn provider(&self, id: ProviderId) -> ProviderSettings {
        self.providers
            .get(&id)
            .cloned()
            .unwrap_or_else(|| ProviderSettings::defaults_for(id))
    }

    /// Attempt timeout for a task kind
    pub fn timeout_for_task(&self, task: TaskKind) -> Duration {
        self.task_timeouts
            .get(&task)
            .copied()
            .unwrap_or(self.default_timeout)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("nexus").join("config").join("providers.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<NexusConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    let content = match path {
        Some(path) if path.exists() => fs::read_to_string(&path)
            .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    providers: Option<HashMap<String, RawProvider>>,
    routing: Option<RawRouting>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    api: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    temperature: Option<f32>,
    structured_temperature: Option<f32>,
    max_tokens: Option<u32>,
    structured_max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    api_key_env: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRouting {
    default_timeout_secs: Option<u64>,
    tasks: Option<HashMap<String, RawTaskRouting>>,
}

#[derive(Debug, Deserialize)]
struct RawTaskRouting {
    timeout_secs: Option<u64>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<NexusConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = NexusConfig::default();

    if let Some(providers) = raw.providers {
        for (name, raw_provider) in providers {
            let Ok(id) = name.parse::<ProviderId>() else {
                tracing::warn!(provider = %name, "Skipping unknown provider in config");
                continue;
            };

            let settings = config
                .providers
                .entry(id)
                .or_insert_with(|| ProviderSettings::defaults_for(id));

            if let Some(api) = raw_provider.api {
                settings.api = api.parse().map_err(Error::InvalidData)?;
            }
            if let Some(base_url) = raw_provider.base_url {
                settings.base_url = base_url.trim_end_matches('/').to_string();
            }
            if let Some(model) = raw_provider.model {
                settings.model = model;
            }
            if let Some(embedding_model) = raw_provider.embedding_model {
                settings.embedding_model = Some(embedding_model);
            }
            if let Some(temperature) = raw_provider.temperature {
                settings.temperature = temperature;
            }
            if let Some(temperature) = raw_provider.structured_temperature {
                settings.structured_temperature = temperature;
            }
            if let Some(max_tokens) = raw_provider.max_tokens {
                settings.max_tokens = max_tokens;
            }
            if let Some(max_tokens) = raw_provider.structured_max_tokens {
                settings.structured_max_tokens = max_tokens;
            }
            if let Some(timeout) = raw_provider.timeout_secs {
                settings.timeout = Duration::from_secs(timeout);
            }
            if let Some(env) = raw_provider.api_key_env {
                settings.api_key_env = env;
            }
        }
    }

    if let Some(routing) = raw.routing {
        if let Some(timeout) = routing.default_timeout_secs {
            config.default_timeout = Duration::from_secs(timeout);
        }
        if let Some(tasks) = routing.tasks {
            for (task_name, task) in tasks {
                let Ok(kind) = task_name.parse::<TaskKind>() else {
                    continue; // Skip unknown task kinds
                };
                if let Some(timeout) = task.timeout_secs {
                    config
                        .task_timeouts
                        .insert(kind, Duration::from_secs(timeout));
                }
            }
        }
    }

    Ok(config)
}
