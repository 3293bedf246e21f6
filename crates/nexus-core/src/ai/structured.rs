//! Structured output coercer
//!
//! Turns model output into typed values. The reasoning provider's native JSON
//! mode runs first; if the call or the parse fails, exactly one repair call
//! asks the multimodal provider for JSON-only text. Nothing is fabricated: the
//! result either deserializes into `T` or the call fails.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::parsing::{parse_json, JSON_ONLY_INSTRUCTION};
use super::router::{Orchestrator, TaskKind};
use super::types::ProviderId;
use super::AIProvider;

impl Orchestrator {
    /// Generate a typed value from a prompt
    ///
    /// `schema_hint` is forwarded to providers with native schema support.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema_hint: Option<&serde_json::Value>,
    ) -> Result<T> {
        let timeout = self.timeout_for(TaskKind::Reasoning);

        let primary = async {
            let client = self.registry().get(ProviderId::Reasoning)?;
            let raw = bounded(
                ProviderId::Reasoning,
                timeout,
                client.generate_structured(prompt, system_prompt, schema_hint),
            )
            .await?;
            debug!(provider = %ProviderId::Reasoning, "Structured response: {}", raw);
            parse_json::<T>(&raw)
        };

        let primary_err = match primary.await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        warn!(
            provider = %ProviderId::Reasoning,
            "Structured generation failed, attempting JSON repair: {}",
            primary_err
        );

        let repair_prompt = format!(
            "{}\n\n{}\n\n{}",
            system_prompt, prompt, JSON_ONLY_INSTRUCTION
        );
        let repair = async {
            let client = self.registry().get(ProviderId::Multimodal)?;
            let raw = bounded(
                ProviderId::Multimodal,
                timeout,
                client.generate_text(&repair_prompt, None),
            )
            .await?;
            debug!(provider = %ProviderId::Multimodal, "Repair response: {}", raw);
            parse_json::<T>(&raw)
        };

        repair.await.map_err(|repair_err| {
            warn!(provider = %ProviderId::Multimodal, "JSON repair failed: {}", repair_err);
            Error::StructuredGenerationFailed {
                primary: primary_err.to_string(),
                repair: repair_err.to_string(),
            }
        })
    }
}

async fn bounded<F>(provider: ProviderId, timeout: Duration, call: F) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| Error::Timeout { provider, timeout })?
}
