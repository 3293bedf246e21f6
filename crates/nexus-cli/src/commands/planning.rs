//! Budget and forecast command implementations

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use nexus_core::{
    generate_budgets, generate_forecast, Budget, BudgetPeriod, CashFlowForecast, ForecastHorizon,
    Provenance,
};

use super::{build_orchestrator, load_transactions, today, truncate};

pub async fn cmd_budget(
    config: Option<&Path>,
    file: &Path,
    period: BudgetPeriod,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let orchestrator = build_orchestrator(config)?;

    let budgets = generate_budgets(&orchestrator, &transactions, period, today()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&budgets)?);
    } else {
        print!("{}", format_budgets(&budgets, period));
    }
    Ok(())
}

pub fn format_budgets(budgets: &[Budget], period: BudgetPeriod) -> String {
    let mut out = String::new();

    if budgets.is_empty() {
        out.push_str("No spending history to budget from.\n");
        return out;
    }

    let source = match budgets[0].provenance {
        Provenance::Personalized => "AI personalized",
        Provenance::Fallback => "historical baseline",
    };
    let _ = writeln!(out, "💰 {} budgets ({})\n", capitalize(period.as_str()), source);
    let _ = writeln!(out, "{:<24} {:>10} {:>12}  {}", "CATEGORY", "AMOUNT", "HIST AVG", "NOTES");
    let _ = writeln!(out, "{}", "-".repeat(80));

    for budget in budgets {
        let average = budget
            .historical_average
            .map(|a| format!("${:.2}", a))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<24} {:>10} {:>12}  {}",
            truncate(&budget.category, 24),
            format!("${:.2}", budget.amount),
            average,
            truncate(budget.reasoning.as_deref().unwrap_or(""), 30)
        );
    }

    let total: f64 = budgets.iter().map(|b| b.amount).sum();
    let _ = writeln!(out, "{}", "-".repeat(80));
    let _ = writeln!(out, "{:<24} {:>10}", "TOTAL", format!("${:.2}", total));
    out
}

pub async fn cmd_forecast(
    config: Option<&Path>,
    file: &Path,
    balance: f64,
    horizon: ForecastHorizon,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let orchestrator = build_orchestrator(config)?;

    let forecast =
        generate_forecast(&orchestrator, &transactions, balance, horizon, today()).await;

    print!("{}", format_forecast(&forecast));
    Ok(())
}

pub fn format_forecast(forecast: &CashFlowForecast) -> String {
    let mut out = String::new();

    let source = match forecast.provenance {
        Provenance::Personalized => "AI forecast",
        Provenance::Fallback => "straight-line projection",
    };
    let _ = writeln!(out, "📈 Cash-flow forecast ({})\n", source);
    let _ = writeln!(out, "{:<12} {:>14} {:>11}", "DATE", "BALANCE", "CONFIDENCE");
    let _ = writeln!(out, "{}", "-".repeat(40));

    for point in &forecast.points {
        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>10.0}%",
            point.date.format("%Y-%m-%d"),
            format!("${:.2}", point.projected_balance),
            point.confidence * 100.0
        );
    }

    if !forecast.alerts.is_empty() {
        let _ = writeln!(out, "\n⚠️  Alerts:");
        for alert in &forecast.alerts {
            let _ = writeln!(out, "   {}", alert);
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
