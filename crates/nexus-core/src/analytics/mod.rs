//! Deterministic spending analytics
//!
//! Pure functions over caller-supplied transactions. Pipelines use them to
//! build prompt context and to compute their baselines when AI fails; the CLI
//! prints them directly.
//!
//! Every function that looks at a trailing window takes `today` explicitly so
//! results are reproducible.

pub mod aggregate;
pub mod burn_rate;
pub mod payees;
pub mod subscriptions;

pub use aggregate::{
    average_monthly_expenses, average_monthly_income, category_totals, month_span,
    recurring_payees, top_categories, trailing_category_totals, window_start,
};
pub use burn_rate::{burn_rate, detect_phantom_spend, savings_velocity};
pub use payees::{clean_payee_names, cosine_similarity, deduplicate_transactions, normalize_payee};
pub use subscriptions::{cancel_url, is_likely_subscription, scan_subscriptions};
