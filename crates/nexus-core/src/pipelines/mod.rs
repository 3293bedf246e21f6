//! Domain pipelines
//!
//! Each pipeline builds its context deterministically, asks the orchestrator
//! for an AI answer, and falls back to a deterministic baseline when the AI
//! path fails. Pipelines never return AI failures to the caller, with one
//! exception: procurement cannot advise on a product it could not identify.

use std::collections::HashMap;
use std::future::Future;

use crate::ai::Orchestrator;
use crate::error::Result;
use crate::prompts::PromptId;

pub mod budget;
pub mod forecast;
pub mod narrative;
pub mod payees;
pub mod procurement;
pub mod statement;

pub use budget::generate_budgets;
pub use forecast::generate_forecast;
pub use narrative::{generate_narrative, generate_quick_win, NarrativeInput};
pub use payees::{cluster_payees, PayeeCluster};
pub use procurement::{analyze_procurement, find_relevant_budget, verdict, BudgetStatus};
pub use statement::extract_statement_text;

/// Await an AI attempt, computing `baseline` if it fails
///
/// The failure is logged with `label` and then discarded.
pub async fn with_fallback<T, F, B>(label: &str, attempt: F, baseline: B) -> T
where
    F: Future<Output = Result<T>>,
    B: FnOnce() -> T,
{
    match attempt.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                pipeline = label,
                error = %e,
                "AI path failed, using deterministic fallback"
            );
            baseline()
        }
    }
}

/// System and rendered user text for one prompt
pub(crate) struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

pub(crate) fn render_prompt(
    orchestrator: &Orchestrator,
    id: PromptId,
    vars: &HashMap<&str, &str>,
) -> Result<RenderedPrompt> {
    let prompt = orchestrator.prompts().get(id)?;
    Ok(RenderedPrompt {
        system: prompt.system().to_string(),
        user: prompt.render_user(vars),
    })
}
