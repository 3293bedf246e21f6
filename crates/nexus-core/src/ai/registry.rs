//! Provider registry
//!
//! Owns one client per configured provider slot. Callers share it behind an
//! `Arc`; lookups hand out clones, so reconfiguring a slot never disturbs a
//! call that already captured the previous client.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::config::{NexusConfig, ProviderApi};
use crate::error::{Error, Result};

use super::types::{ProviderId, ProviderInfo};
use super::{AIProvider, GeminiProvider, OpenAICompatibleProvider, ProviderClient};

/// Caller-owned map of configured provider clients
pub struct ProviderRegistry {
    config: NexusConfig,
    clients: RwLock<HashMap<ProviderId, ProviderClient>>,
}

impl ProviderRegistry {
    /// Create an empty registry (nothing configured)
    pub fn new(config: NexusConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry configured from each slot's API key variable
    ///
    /// Slots whose variable is unset or empty stay unconfigured.
    pub fn from_env(config: NexusConfig) -> Self {
        let registry = Self::new(config);

        for &id in ProviderId::all() {
            let env = registry.config.provider(id).api_key_env;
            match std::env::var(&env) {
                Ok(key) if !key.trim().is_empty() => registry.configure(id, key.trim()),
                _ => debug!(provider = %id, env = %env, "No credential in environment"),
            }
        }

        registry
    }

    /// Build and install the adapter for a slot; the last call wins
    pub fn configure(&self, id: ProviderId, credential: &str) {
        let settings = self.config.provider(id);
        let client = match settings.api {
            ProviderApi::OpenAICompatible => ProviderClient::OpenAICompatible(
                OpenAICompatibleProvider::new(id, &settings, Some(credential)),
            ),
            ProviderApi::Gemini => {
                ProviderClient::Gemini(GeminiProvider::new(id, &settings, credential))
            }
        };

        info!(provider = %id, model = %settings.model, "Configured AI provider");
        self.install(id, client);
    }

    /// Install a prebuilt client (tests, custom endpoints)
    pub fn install(&self, id: ProviderId, client: impl Into<ProviderClient>) {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.insert(id, client.into());
    }

    /// Remove a slot's client
    pub fn remove(&self, id: ProviderId) {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.remove(&id);
    }

    /// Clone the client for a slot, or `NotConfigured`
    pub fn get(&self, id: ProviderId) -> Result<ProviderClient> {
        let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
        clients.get(&id).cloned().ok_or(Error::NotConfigured(id))
    }

    /// Whether a slot has a client
    pub fn is_configured(&self, id: ProviderId) -> bool {
        let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
        clients.contains_key(&id)
    }

    /// Display info for every configured slot, in slot order
    pub fn infos(&self) -> Vec<ProviderInfo> {
        ProviderId::all()
            .iter()
            .filter_map(|&id| self.get(id).ok())
            .map(|client| client.info())
            .collect()
    }

    /// Configuration this registry builds adapters from
    pub fn config(&self) -> &NexusConfig {
        &self.config
    }
}
