//! Plain-language spending summaries and quick-win tips

use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::ai::{ChunkCallback, Orchestrator, TaskDescriptor};
use crate::analytics::{burn_rate, detect_phantom_spend, top_categories};
use crate::error::Result;
use crate::models::{BurnRateStatus, CategoryTotal, NarrativePeriod, PhantomSpend, Transaction};
use crate::prompts::PromptId;

use super::{render_prompt, with_fallback};

const TOP_CATEGORY_COUNT: usize = 5;

const NO_PHANTOM_SPEND: &str = "Great job! No phantom spending detected. Keep up the good work!";

/// Figures a narrative is written from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeInput {
    pub burn_rate: f64,
    pub total_expenses: f64,
    pub total_income: f64,
    pub top_categories: Vec<CategoryTotal>,
    /// Free-text notes on unusual activity
    pub anomalies: Vec<String>,
}

impl NarrativeInput {
    /// Summarize the trailing month of `transactions`
    ///
    /// Phantom spends become the anomaly notes.
    pub fn from_transactions(transactions: &[Transaction], today: NaiveDate) -> Self {
        let rate = burn_rate(transactions, None, today);
        let since = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN);
        let recent: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.date >= since)
            .cloned()
            .collect();

        let anomalies = detect_phantom_spend(transactions, today)
            .iter()
            .map(|p| {
                format!(
                    "{} small purchases at {} totalling ${:.2} this month",
                    p.frequency, p.payee, p.total_monthly
                )
            })
            .collect();

        Self {
            burn_rate: rate.percentage,
            total_expenses: rate.monthly_expenses,
            total_income: rate.monthly_income,
            top_categories: top_categories(&recent, TOP_CATEGORY_COUNT),
            anomalies,
        }
    }
}

/// Write a short coaching summary for `period`
///
/// Streams through `on_chunk` when given. If the conversation task fails,
/// a templated summary of the same figures is returned.
pub async fn generate_narrative(
    orchestrator: &Orchestrator,
    input: &NarrativeInput,
    period: NarrativePeriod,
    on_chunk: Option<ChunkCallback>,
) -> String {
    with_fallback(
        "narrative",
        ai_narrative(orchestrator, input, period, on_chunk),
        || fallback_narrative(input, period),
    )
    .await
}

async fn ai_narrative(
    orchestrator: &Orchestrator,
    input: &NarrativeInput,
    period: NarrativePeriod,
    on_chunk: Option<ChunkCallback>,
) -> Result<String> {
    let burn_rate = format!("{:.1}", input.burn_rate);
    let total_spent = format!("{:.2}", input.total_expenses);
    let total_income = format!("{:.2}", input.total_income);
    let categories = input
        .top_categories
        .iter()
        .map(|c| format!("- {}: ${:.2}", c.category, c.amount))
        .collect::<Vec<_>>()
        .join("\n");
    let anomalies = input
        .anomalies
        .iter()
        .map(|a| format!("- {}", a))
        .collect::<Vec<_>>()
        .join("\n");

    let vars = HashMap::from([
        ("period", period.as_str()),
        ("burn_rate", burn_rate.as_str()),
        ("total_spent", total_spent.as_str()),
        ("total_income", total_income.as_str()),
        ("top_categories", categories.as_str()),
        ("anomalies", anomalies.as_str()),
    ]);
    let prompt = render_prompt(orchestrator, PromptId::FinancialNarrative, &vars)?;

    let mut task = TaskDescriptor::conversation(prompt.user).with_system(prompt.system);
    if let Some(on_chunk) = on_chunk {
        task = task.streaming(on_chunk);
    }
    Ok(orchestrator.orchestrate(task).await?.content)
}

fn fallback_narrative(input: &NarrativeInput, period: NarrativePeriod) -> String {
    let mut text = format!(
        "Your {} summary: you spent ${:.2} against ${:.2} of income, a burn rate of {:.1}%.",
        period, input.total_expenses, input.total_income, input.burn_rate
    );

    if let Some(top) = input.top_categories.first() {
        text.push_str(&format!(
            " Your largest category was {} at ${:.2}.",
            top.category, top.amount
        ));
    }

    let status = match input.burn_rate {
        r if r < 60.0 => BurnRateStatus::Healthy,
        r if r < 80.0 => BurnRateStatus::Warning,
        _ => BurnRateStatus::Critical,
    };
    text.push_str(match status {
        BurnRateStatus::Healthy => " You're living well within your means. Nice work!",
        BurnRateStatus::Warning => " Spending is getting close to your income, so keep an eye on it.",
        BurnRateStatus::Critical => " Spending is eating most of your income. Look for one category to trim this week.",
    });

    if !input.anomalies.is_empty() {
        text.push_str(&format!(" Worth a look: {}.", input.anomalies.join("; ")));
    }
    text
}

/// One actionable tip aimed at the costliest phantom spend
///
/// `phantom_spends` is expected in the order `detect_phantom_spend` returns.
pub async fn generate_quick_win(
    orchestrator: &Orchestrator,
    phantom_spends: &[PhantomSpend],
    burn_rate: f64,
) -> String {
    let Some(top) = phantom_spends.first() else {
        return NO_PHANTOM_SPEND.to_string();
    };

    with_fallback(
        "quick_win",
        ai_quick_win(orchestrator, top, burn_rate),
        || {
            format!(
                "Cutting back on small purchases at {} could save you about ${:.0} a year.",
                top.payee, top.annualized_cost
            )
        },
    )
    .await
}

async fn ai_quick_win(
    orchestrator: &Orchestrator,
    top: &PhantomSpend,
    burn_rate: f64,
) -> Result<String> {
    let burn_rate = format!("{:.1}", burn_rate);
    let annual_cost = format!("{:.0}", top.annualized_cost);
    let vars = HashMap::from([
        ("burn_rate", burn_rate.as_str()),
        ("category", top.category.as_str()),
        ("annual_cost", annual_cost.as_str()),
    ]);
    let prompt = render_prompt(orchestrator, PromptId::QuickWin, &vars)?;

    let task = TaskDescriptor::conversation(prompt.user).with_system(prompt.system);
    Ok(orchestrator.orchestrate(task).await?.content)
}
