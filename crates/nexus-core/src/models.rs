//! Domain models for Nexus
//!
//! All values here are short-lived: callers supply transactions and budgets,
//! pipelines return budgets, forecasts and recommendations. Nothing is
//! persisted by the core.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "credit" | "deposit" => Ok(Self::Income),
            "expense" | "debit" | "purchase" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank transaction supplied by the caller
///
/// `amount` is signed: expenses are usually negative, but every aggregate
/// uses the absolute value for expenses so either convention works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub payee: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub kind: TransactionKind,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }
}

/// Budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" => Ok(Self::Yearly),
            _ => Err(format!("Unknown budget period: {}", s)),
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a pipeline result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Produced by an AI provider
    #[default]
    Personalized,
    /// Deterministic baseline used after the AI path failed
    Fallback,
}

/// A spending budget for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub rollover: bool,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonality_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Budget {
    pub fn is_personalized(&self) -> bool {
        self.provenance == Provenance::Personalized
    }
}

/// Forecast length in months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastHorizon {
    #[default]
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl ForecastHorizon {
    pub fn months(&self) -> u32 {
        match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = String;

    fn try_from(months: u32) -> std::result::Result<Self, Self::Error> {
        match months {
            3 => Ok(Self::ThreeMonths),
            6 => Ok(Self::SixMonths),
            12 => Ok(Self::TwelveMonths),
            _ => Err(format!("Forecast horizon must be 3, 6 or 12 months, got {}", months)),
        }
    }
}

impl FromStr for ForecastHorizon {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let months: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid forecast horizon: {}", s))?;
        Self::try_from(months)
    }
}

/// Projected balance at one future date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub projected_balance: f64,
    /// In [0, 1]
    pub confidence: f64,
    pub contributing_factors: Vec<String>,
}

/// A cash-flow forecast with human-readable alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowForecast {
    pub points: Vec<ForecastPoint>,
    /// Rendered as `"<date>: <message>"`
    pub alerts: Vec<String>,
    pub provenance: Provenance,
}

/// Purchase verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Buy,
    Wait,
    Avoid,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Wait => "wait",
            Self::Avoid => "avoid",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advice on a product photographed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementRecommendation {
    pub item_name: String,
    pub identified_price: f64,
    pub market_price: f64,
    pub budget_category: String,
    pub budget_remaining: f64,
    pub verdict: Verdict,
    pub reasoning: String,
}

/// Health bucket for the burn rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnRateStatus {
    Healthy,
    Warning,
    Critical,
}

impl BurnRateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for BurnRateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Share of income spent on non-debt expenses over the trailing month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRate {
    pub percentage: f64,
    pub status: BurnRateStatus,
    pub monthly_expenses: f64,
    pub monthly_income: f64,
    pub debt_payments: f64,
}

/// Direction of net worth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavingsTrend {
    Increasing,
    Decreasing,
    Stable,
}

/// Net worth change between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsVelocity {
    pub percentage: f64,
    pub trend: SavingsTrend,
    pub net_worth_change: f64,
}

/// Frequent small purchases at one payee that add up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhantomSpend {
    pub payee: String,
    pub category: String,
    pub frequency: usize,
    pub average_amount: f64,
    pub total_monthly: f64,
    pub annualized_cost: f64,
    pub examples: Vec<Transaction>,
}

/// Billing cadence of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionFrequency {
    Weekly,
    Monthly,
    Yearly,
}

/// A recurring charge found in the transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub amount: f64,
    pub frequency: SubscriptionFrequency,
    pub last_charged: NaiveDate,
    /// No charge in the last three months
    pub is_zombie: bool,
    pub cancel_url: Option<String>,
}

/// Summary period for narratives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativePeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl NarrativePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for NarrativePeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Unknown narrative period: {}", s)),
        }
    }
}

impl fmt::Display for NarrativePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending total for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Payee seen often enough to count as recurring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPayee {
    pub payee: String,
    pub average_amount: f64,
    pub frequency: usize,
}
