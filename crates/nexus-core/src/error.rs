//! Error types for Nexus

use std::time::Duration;

use thiserror::Error;

use crate::ai::{Capability, ProviderId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider not configured: {0}. Supply an API key before routing tasks to it.")]
    NotConfigured(ProviderId),

    #[error("Provider {provider} does not support {capability}")]
    UnsupportedCapability {
        provider: ProviderId,
        capability: Capability,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider {provider} failed: {message}")]
    Provider {
        provider: ProviderId,
        message: String,
    },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout {
        provider: ProviderId,
        timeout: Duration,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Structured generation failed. Primary: {primary}, Repair: {repair}")]
    StructuredGenerationFailed { primary: String, repair: String },

    #[error("All AI providers failed. Primary: {primary}, Fallback: {fallback}")]
    AllProvidersFailed { primary: String, fallback: String },

    #[error("Product identification failed: {0}")]
    IdentificationFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
