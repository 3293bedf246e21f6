//! Burn rate, savings velocity and phantom spend detection

use std::collections::HashMap;

use chrono::{Months, NaiveDate};

use crate::models::{
    BurnRate, BurnRateStatus, PhantomSpend, SavingsTrend, SavingsVelocity, Transaction,
};

const DEBT_KEYWORDS: &[&str] = &["loan", "credit", "mortgage"];

const HEALTHY_BELOW: f64 = 60.0;
const WARNING_BELOW: f64 = 80.0;

/// Net worth change (in percent) treated as flat
const STABLE_BAND: f64 = 2.0;

/// Purchases under this absolute amount count as small
const PHANTOM_MAX_AMOUNT: f64 = 15.0;
/// Minimum small purchases at one payee within a month
const PHANTOM_MIN_COUNT: usize = 10;
const PHANTOM_EXAMPLES: usize = 5;

fn one_month_ago(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(1))
        .unwrap_or(NaiveDate::MIN)
}

fn is_debt_payment(tx: &Transaction) -> bool {
    let description = tx.description.to_lowercase();
    DEBT_KEYWORDS.iter().any(|k| description.contains(k))
}

/// Share of income spent on non-debt expenses over the last month
///
/// `monthly_income` overrides the income summed from the window. With no
/// income the percentage is 0.
pub fn burn_rate(
    transactions: &[Transaction],
    monthly_income: Option<f64>,
    today: NaiveDate,
) -> BurnRate {
    let since = one_month_ago(today);
    let recent: Vec<&Transaction> = transactions.iter().filter(|t| t.date >= since).collect();

    let monthly_expenses: f64 = recent
        .iter()
        .filter(|t| t.is_expense())
        .map(|t| t.amount.abs())
        .sum();
    let debt_payments: f64 = recent
        .iter()
        .filter(|t| t.is_expense() && is_debt_payment(t))
        .map(|t| t.amount.abs())
        .sum();
    let income = monthly_income.unwrap_or_else(|| {
        recent
            .iter()
            .filter(|t| t.is_income())
            .map(|t| t.amount.abs())
            .sum()
    });

    let percentage = if income > 0.0 {
        (monthly_expenses - debt_payments) / income * 100.0
    } else {
        0.0
    };

    let status = if percentage < HEALTHY_BELOW {
        BurnRateStatus::Healthy
    } else if percentage < WARNING_BELOW {
        BurnRateStatus::Warning
    } else {
        BurnRateStatus::Critical
    };

    BurnRate {
        percentage,
        status,
        monthly_expenses,
        monthly_income: income,
        debt_payments,
    }
}

/// Percent change in net worth between two snapshots
pub fn savings_velocity(current_net_worth: f64, previous_net_worth: f64) -> SavingsVelocity {
    let net_worth_change = current_net_worth - previous_net_worth;
    let percentage = if previous_net_worth != 0.0 {
        net_worth_change / previous_net_worth.abs() * 100.0
    } else {
        0.0
    };

    let trend = if percentage > STABLE_BAND {
        SavingsTrend::Increasing
    } else if percentage < -STABLE_BAND {
        SavingsTrend::Decreasing
    } else {
        SavingsTrend::Stable
    };

    SavingsVelocity {
        percentage,
        trend,
        net_worth_change,
    }
}

/// Find payees with many small purchases over the last month
///
/// Sorted by annualized cost, largest first.
pub fn detect_phantom_spend(transactions: &[Transaction], today: NaiveDate) -> Vec<PhantomSpend> {
    let since = one_month_ago(today);

    let mut groups: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|t| t.is_expense() && t.date >= since && t.amount.abs() < PHANTOM_MAX_AMOUNT)
    {
        groups.entry(tx.payee.as_str()).or_default().push(tx);
    }

    let mut spends: Vec<PhantomSpend> = groups
        .into_iter()
        .filter(|(_, txs)| txs.len() >= PHANTOM_MIN_COUNT)
        .map(|(payee, txs)| {
            let total_monthly: f64 = txs.iter().map(|t| t.amount.abs()).sum();
            PhantomSpend {
                payee: payee.to_string(),
                category: txs[0].category.clone(),
                frequency: txs.len(),
                average_amount: total_monthly / txs.len() as f64,
                total_monthly,
                annualized_cost: total_monthly * 12.0,
                examples: txs.iter().take(PHANTOM_EXAMPLES).map(|t| (*t).clone()).collect(),
            }
        })
        .collect();

    spends.sort_by(|a, b| b.annualized_cost.total_cmp(&a.annualized_cost));
    spends
}
