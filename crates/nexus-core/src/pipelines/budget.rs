//! Personalized budget generation

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::ai::Orchestrator;
use crate::analytics::{category_totals, trailing_category_totals};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetPeriod, Provenance, Transaction};
use crate::prompts::PromptId;

use super::{render_prompt, with_fallback};

/// Headroom added to historical spend in fallback budgets
const FALLBACK_BUFFER: f64 = 1.10;

/// Trailing windows, in months, summarized for the model
const WINDOWS: [u32; 3] = [3, 6, 12];

#[derive(Debug, Deserialize)]
struct BudgetPlan {
    budgets: Vec<PlannedBudget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedBudget {
    category: String,
    amount: f64,
    #[serde(default)]
    historical_average: Option<f64>,
    #[serde(default)]
    seasonality_factor: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Generate one budget per spending category
///
/// Uses the reasoning task with 3, 6 and 12 month category totals. Any AI
/// failure, or an empty plan, produces fallback budgets of 110% of the
/// trailing three months instead.
pub async fn generate_budgets(
    orchestrator: &Orchestrator,
    transactions: &[Transaction],
    period: BudgetPeriod,
    today: NaiveDate,
) -> Vec<Budget> {
    with_fallback(
        "budget",
        personalized_budgets(orchestrator, transactions, period, today),
        || fallback_budgets(transactions, period, today),
    )
    .await
}

async fn personalized_budgets(
    orchestrator: &Orchestrator,
    transactions: &[Transaction],
    period: BudgetPeriod,
    today: NaiveDate,
) -> Result<Vec<Budget>> {
    let [totals_3m, totals_6m, totals_12m] =
        WINDOWS.map(|months| format_totals(&trailing_category_totals(transactions, today, months)));
    let current_month = today.format("%B").to_string();

    let vars = HashMap::from([
        ("period", period.as_str()),
        ("totals_3m", totals_3m.as_str()),
        ("totals_6m", totals_6m.as_str()),
        ("totals_12m", totals_12m.as_str()),
        ("current_month", current_month.as_str()),
    ]);
    let prompt = render_prompt(orchestrator, PromptId::BudgetAnalysis, &vars)?;

    let plan: BudgetPlan = orchestrator
        .generate_structured(&prompt.user, &prompt.system, None)
        .await?;

    let budgets: Vec<Budget> = plan
        .budgets
        .into_iter()
        .filter(|b| !b.category.trim().is_empty() && b.amount.is_finite())
        .enumerate()
        .map(|(index, b)| Budget {
            id: format!("budget-{}", index),
            category: b.category,
            amount: b.amount,
            period,
            rollover: true,
            provenance: Provenance::Personalized,
            historical_average: b.historical_average,
            seasonality_factor: b.seasonality_factor,
            reasoning: b.reasoning,
        })
        .collect();

    if budgets.is_empty() {
        return Err(Error::InvalidData("AI returned no budgets".to_string()));
    }

    info!(count = budgets.len(), "Generated personalized budgets");
    Ok(budgets)
}

/// Budgets from historical spend alone
///
/// Uses the trailing three months; when that window has no expenses the
/// longer windows and then the whole history are tried, so any expense
/// history yields at least one budget.
pub(crate) fn fallback_budgets(
    transactions: &[Transaction],
    period: BudgetPeriod,
    today: NaiveDate,
) -> Vec<Budget> {
    let totals = WINDOWS
        .iter()
        .map(|&months| trailing_category_totals(transactions, today, months))
        .find(|totals| !totals.is_empty())
        .unwrap_or_else(|| category_totals(transactions));

    totals
        .into_iter()
        .enumerate()
        .map(|(index, (category, total))| Budget {
            id: format!("budget-fallback-{}", index),
            category,
            amount: (total * FALLBACK_BUFFER).round(),
            period,
            rollover: true,
            provenance: Provenance::Fallback,
            historical_average: Some(total),
            seasonality_factor: None,
            reasoning: None,
        })
        .collect()
}

fn format_totals(totals: &BTreeMap<String, f64>) -> String {
    if totals.is_empty() {
        return "(no spending)".to_string();
    }
    totals
        .iter()
        .map(|(category, amount)| format!("- {}: ${:.2}", category, amount))
        .collect::<Vec<_>>()
        .join("\n")
}
