//! AI provider types
//!
//! These types are provider-agnostic and used across all adapter implementations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a configured provider slot
///
/// The set is fixed; only credentials (and endpoint settings) are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Long-form financial reasoning (DeepSeek-style chat API)
    Reasoning,
    /// Low-latency conversational replies (Groq-style chat API)
    Conversational,
    /// Images, documents, grounded search and embeddings (Gemini-style API)
    Multimodal,
}

impl ProviderId {
    /// Get the config key for this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Conversational => "conversational",
            Self::Multimodal => "multimodal",
        }
    }

    /// Get all provider identities
    pub fn all() -> &'static [ProviderId] {
        &[Self::Reasoning, Self::Conversational, Self::Multimodal]
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reasoning" | "deepseek" => Ok(Self::Reasoning),
            "conversational" | "conversation" | "groq" => Ok(Self::Conversational),
            "multimodal" | "gemini" => Ok(Self::Multimodal),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One operation of the provider capability surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GenerateText,
    GenerateStructured,
    StreamText,
    UnderstandMedia,
    GroundedSearch,
    Embed,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateText => "generate_text",
            Self::GenerateStructured => "generate_structured",
            Self::StreamText => "stream_text",
            Self::UnderstandMedia => "understand_media",
            Self::GroundedSearch => "grounded_search",
            Self::Embed => "embed",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of media attached to a multimodal task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
}

/// Raw media bytes plus the MIME type the provider should be told
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaPayload {
    /// An image payload; the MIME type defaults to JPEG
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Image,
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    /// A PDF document payload
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Document,
            mime_type: "application/pdf".to_string(),
            bytes,
        }
    }

    /// Override the MIME type (e.g. "image/png")
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Guess an image payload's MIME type from a file extension
    pub fn image_from_extension(bytes: Vec<u8>, extension: &str) -> Self {
        let mime = match extension.to_lowercase().as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            _ => "image/jpeg",
        };
        Self::image(bytes).with_mime_type(mime)
    }
}

/// Callback receiving streamed text fragments in arrival order
pub type ChunkCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Provider configuration information for display
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub model: String,
    pub host: String,
    pub capabilities: Vec<Capability>,
}
