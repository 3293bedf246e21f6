//! Bank statement text extraction

use std::collections::HashMap;

use tracing::info;

use crate::ai::{MediaPayload, Orchestrator, TaskDescriptor};
use crate::error::Result;
use crate::prompts::PromptId;

use super::render_prompt;

/// Transcribe the transactions in a PDF bank statement
///
/// Returns the model's text as-is; turning it into `Transaction` values is
/// left to the caller.
pub async fn extract_statement_text(
    orchestrator: &Orchestrator,
    pdf_bytes: Vec<u8>,
) -> Result<String> {
    let prompt = render_prompt(orchestrator, PromptId::ExtractStatement, &HashMap::new())?;
    let task = TaskDescriptor::multimodal(prompt.user, MediaPayload::pdf(pdf_bytes))
        .with_system(prompt.system);

    let result = orchestrator.orchestrate(task).await?;
    info!(
        provider = %result.provider_used,
        fallback = result.was_fallback,
        "Extracted statement text"
    );
    Ok(result.content)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::{Capability, MockProvider, ProviderId, ProviderRegistry};
    use crate::config::NexusConfig;

    #[tokio::test]
    async fn test_sends_pdf_to_multimodal_provider() {
        let multimodal = MockProvider::new(ProviderId::Multimodal).with_text(
            Capability::UnderstandMedia,
            "2024-06-01, -4.50, COFFEE SHOP",
        );
        let registry = Arc::new(ProviderRegistry::new(NexusConfig::default()));
        registry.install(ProviderId::Multimodal, multimodal.clone());
        let orch = Orchestrator::new(registry);

        let text = extract_statement_text(&orch, b"%PDF-1.4".to_vec()).await.unwrap();
        assert_eq!(text, "2024-06-01, -4.50, COFFEE SHOP");

        let call = &multimodal.calls()[0];
        // The mock records the MIME type in place of a system prompt
        assert_eq!(call.system_prompt.as_deref(), Some("application/pdf"));
        assert!(call.prompt.contains("Extract all transaction data from this bank statement"));
    }

    #[tokio::test]
    async fn test_fails_when_no_provider_can_answer() {
        let orch = Orchestrator::new(Arc::new(ProviderRegistry::new(NexusConfig::default())));
        assert!(extract_statement_text(&orch, b"%PDF-1.4".to_vec()).await.is_err());
    }
}
