//! Cash-flow forecasting

use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::ai::Orchestrator;
use crate::analytics::{average_monthly_expenses, average_monthly_income, recurring_payees};
use crate::error::{Error, Result};
use crate::models::{CashFlowForecast, ForecastHorizon, ForecastPoint, Provenance, Transaction};
use crate::prompts::PromptId;

use super::{render_prompt, with_fallback};

/// Transactions included verbatim in the prompt, most recent first
const RECENT_LIMIT: usize = 50;

const FALLBACK_CONFIDENCE: f64 = 0.6;
const FALLBACK_FACTORS: [&str; 2] = ["Historical average income", "Historical average expenses"];

#[derive(Debug, Deserialize)]
struct ForecastAnalysis {
    forecasts: Vec<ForecastEntry>,
    #[serde(default)]
    alerts: Vec<AlertEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastEntry {
    date: String,
    projected_balance: f64,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    factors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AlertEntry {
    date: String,
    #[serde(default, rename = "type")]
    _kind: Option<String>,
    message: String,
}

/// Forecast month-end balances for the next `horizon` months
///
/// Falls back to a straight-line projection of average income and expenses
/// when the AI path fails.
pub async fn generate_forecast(
    orchestrator: &Orchestrator,
    transactions: &[Transaction],
    current_balance: f64,
    horizon: ForecastHorizon,
    today: NaiveDate,
) -> CashFlowForecast {
    let monthly_income = average_monthly_income(transactions);
    let monthly_expenses = average_monthly_expenses(transactions);

    with_fallback(
        "forecast",
        ai_forecast(
            orchestrator,
            transactions,
            current_balance,
            monthly_income,
            monthly_expenses,
            horizon,
            today,
        ),
        || {
            fallback_forecast(
                current_balance,
                monthly_income,
                monthly_expenses,
                horizon.months(),
                today,
            )
        },
    )
    .await
}

async fn ai_forecast(
    orchestrator: &Orchestrator,
    transactions: &[Transaction],
    current_balance: f64,
    monthly_income: f64,
    monthly_expenses: f64,
    horizon: ForecastHorizon,
    today: NaiveDate,
) -> Result<CashFlowForecast> {
    let recurring = serde_json::to_string(&recurring_payees(transactions))?;
    let recent = serde_json::to_string(&recent_transactions(transactions))?;
    let months = horizon.months().to_string();
    let start_date = add_months(today, 1).to_string();
    let current_balance = format!("{:.2}", current_balance);
    let avg_income = format!("{:.2}", monthly_income);
    let avg_expenses = format!("{:.2}", monthly_expenses);

    let vars = HashMap::from([
        ("months", months.as_str()),
        ("start_date", start_date.as_str()),
        ("current_balance", current_balance.as_str()),
        ("avg_income", avg_income.as_str()),
        ("avg_expenses", avg_expenses.as_str()),
        ("recurring", recurring.as_str()),
        ("recent_transactions", recent.as_str()),
    ]);
    let prompt = render_prompt(orchestrator, PromptId::CashFlowForecast, &vars)?;

    let analysis: ForecastAnalysis = orchestrator
        .generate_structured(&prompt.user, &prompt.system, None)
        .await?;

    if analysis.forecasts.is_empty() {
        return Err(Error::InvalidData("AI returned no forecast points".to_string()));
    }

    let points = analysis
        .forecasts
        .into_iter()
        .map(|f| {
            Ok(ForecastPoint {
                date: parse_date(&f.date)?,
                projected_balance: f.projected_balance,
                confidence: f.confidence.clamp(0.0, 1.0),
                contributing_factors: f.factors,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let alerts = analysis
        .alerts
        .into_iter()
        .map(|a| format!("{}: {}", a.date, a.message))
        .collect();

    info!(points = points.len(), "Generated AI cash-flow forecast");
    Ok(CashFlowForecast {
        points,
        alerts,
        provenance: Provenance::Personalized,
    })
}

/// Straight-line projection: each month adds income and subtracts expenses
pub(crate) fn fallback_forecast(
    current_balance: f64,
    monthly_income: f64,
    monthly_expenses: f64,
    months: u32,
    today: NaiveDate,
) -> CashFlowForecast {
    let mut balance = current_balance;
    let mut points = Vec::with_capacity(months as usize);
    let mut alerts = Vec::new();

    for i in 1..=months {
        let date = add_months(today, i);
        balance = balance + monthly_income - monthly_expenses;

        points.push(ForecastPoint {
            date,
            projected_balance: balance,
            confidence: FALLBACK_CONFIDENCE,
            contributing_factors: FALLBACK_FACTORS.iter().map(|f| f.to_string()).collect(),
        });

        if balance < 0.0 {
            alerts.push(format!(
                "{}: Projected overdraft of ${:.2}",
                date.format("%Y-%m-%d"),
                balance.abs()
            ));
        }
    }

    CashFlowForecast {
        points,
        alerts,
        provenance: Provenance::Fallback,
    }
}

fn recent_transactions(transactions: &[Transaction]) -> Vec<serde_json::Value> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|t| {
            json!({
                "date": t.date.to_string(),
                "amount": t.amount,
                "type": t.kind.as_str(),
                "category": t.category,
            })
        })
        .collect()
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Accepts `YYYY-MM-DD`, ignoring any trailing time component
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let day = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::InvalidData(format!("Invalid forecast date '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::{Capability, MockProvider, ProviderId, ProviderRegistry};
    use crate::config::NexusConfig;
    use crate::models::TransactionKind;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn balances(forecast: &CashFlowForecast) -> Vec<f64> {
        forecast.points.iter().map(|p| p.projected_balance).collect()
    }

    #[test]
    fn test_fallback_steps_income_minus_expenses() {
        let forecast = fallback_forecast(1000.0, 2000.0, 2500.0, 3, today());
        assert_eq!(balances(&forecast), vec![500.0, 0.0, -500.0]);
        assert_eq!(forecast.alerts, vec!["2024-09-15: Projected overdraft of $500.00"]);
        assert_eq!(forecast.provenance, Provenance::Fallback);
    }

    #[test]
    fn test_fallback_overdraft_alerts_only_for_negative_months() {
        let forecast = fallback_forecast(2000.0, 1000.0, 2500.0, 3, today());
        assert_eq!(balances(&forecast), vec![500.0, -1000.0, -2500.0]);
        assert_eq!(
            forecast.alerts,
            vec![
                "2024-08-15: Projected overdraft of $1000.00",
                "2024-09-15: Projected overdraft of $2500.00",
            ]
        );

        let first = &forecast.points[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(first.confidence, 0.6);
        assert_eq!(
            first.contributing_factors,
            vec!["Historical average income", "Historical average expenses"]
        );
    }

    #[test]
    fn test_fallback_month_end_dates_clamp() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let forecast = fallback_forecast(0.0, 0.0, 0.0, 1, jan31);
        assert_eq!(forecast.points[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(
            parse_date("2024-07-01T00:00:00Z").unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        assert!(parse_date("next month").is_err());
    }

    fn history() -> Vec<Transaction> {
        let tx = |date: &str, amount: f64, kind: TransactionKind| Transaction {
            id: date.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            payee: "Employer".to_string(),
            description: String::new(),
            category: "General".to_string(),
            kind,
            is_recurring: false,
        };
        vec![
            tx("2024-05-01", 2000.0, TransactionKind::Income),
            tx("2024-05-10", -2500.0, TransactionKind::Expense),
        ]
    }

    #[tokio::test]
    async fn test_ai_forecast_clamps_and_renders_alerts() {
        let reasoning = MockProvider::new(ProviderId::Reasoning).with_text(
            Capability::GenerateStructured,
            r#"{
                "forecasts": [
                    {"date": "2024-07-15", "projectedBalance": 800, "confidence": 1.4, "factors": ["Salary"]},
                    {"date": "2024-08-15", "projectedBalance": -20, "confidence": -0.2, "factors": []}
                ],
                "alerts": [{"date": "2024-08-15", "type": "overdraft", "message": "Balance dips below zero"}]
            }"#,
        );
        let registry = Arc::new(ProviderRegistry::new(NexusConfig::default()));
        registry.install(ProviderId::Reasoning, reasoning.clone());
        let orch = Orchestrator::new(registry);

        let forecast =
            generate_forecast(&orch, &history(), 1000.0, ForecastHorizon::ThreeMonths, today()).await;

        assert_eq!(forecast.provenance, Provenance::Personalized);
        assert_eq!(forecast.points[0].confidence, 1.0);
        assert_eq!(forecast.points[1].confidence, 0.0);
        assert_eq!(forecast.alerts, vec!["2024-08-15: Balance dips below zero"]);

        let prompt = &reasoning.calls()[0].prompt;
        assert!(prompt.contains("Current balance: $1000.00"));
        assert!(prompt.contains("Average monthly income: $2000.00"));
        assert!(prompt.contains("next 3 months"));
    }

    #[tokio::test]
    async fn test_prompt_carries_fifty_most_recent_transactions() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let txs: Vec<Transaction> = (0..60u64)
            .map(|i| Transaction {
                id: format!("tx-{}", i),
                date: start + chrono::Days::new(i),
                amount: -10.0,
                payee: "Grocer".to_string(),
                description: String::new(),
                category: "Groceries".to_string(),
                kind: TransactionKind::Expense,
                is_recurring: false,
            })
            .collect();

        let reasoning = MockProvider::new(ProviderId::Reasoning).with_text(
            Capability::GenerateStructured,
            r#"{"forecasts": [{"date": "2024-04-01", "projectedBalance": 100, "confidence": 0.5}]}"#,
        );
        let registry = Arc::new(ProviderRegistry::new(NexusConfig::default()));
        registry.install(ProviderId::Reasoning, reasoning.clone());
        let orch = Orchestrator::new(registry);

        generate_forecast(&orch, &txs, 1000.0, ForecastHorizon::ThreeMonths, today()).await;

        let prompt = &reasoning.calls()[0].prompt;
        let line = prompt
            .split("Most recent transactions:\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap();
        let recent: Vec<serde_json::Value> = serde_json::from_str(line).unwrap();

        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0]["date"], "2024-02-29");
        assert_eq!(recent[RECENT_LIMIT - 1]["date"], "2024-01-11");
        assert!(recent.iter().all(|t| t["date"] != "2024-01-01"));
    }

    #[tokio::test]
    async fn test_unreachable_providers_use_fallback() {
        let orch = Orchestrator::new(Arc::new(ProviderRegistry::new(NexusConfig::default())));
        let forecast =
            generate_forecast(&orch, &history(), 1000.0, ForecastHorizon::SixMonths, today()).await;

        assert_eq!(forecast.provenance, Provenance::Fallback);
        assert_eq!(forecast.points.len(), 6);
        assert_eq!(forecast.points[0].projected_balance, 500.0);
    }
}
