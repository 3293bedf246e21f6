//! Category totals, trailing windows and monthly averages

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::models::{CategoryTotal, RecurringPayee, Transaction};

/// Minimum transactions at one payee to count as recurring
const RECURRING_MIN_COUNT: usize = 3;

/// Sum of |amount| per category over expense transactions
///
/// Keys are sorted so prompts and fallback budgets are stable.
pub fn category_totals<'a, I>(transactions: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals = BTreeMap::new();
    for tx in transactions.into_iter().filter(|t| t.is_expense()) {
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount.abs();
    }
    totals
}

/// First day of the month `months_back` months before `today`'s month
pub fn window_start(today: NaiveDate, months_back: u32) -> NaiveDate {
    today
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(months_back)))
        .unwrap_or(NaiveDate::MIN)
}

/// Category totals for expenses dated on or after `window_start(today, months)`
pub fn trailing_category_totals(
    transactions: &[Transaction],
    today: NaiveDate,
    months: u32,
) -> BTreeMap<String, f64> {
    let start = window_start(today, months);
    category_totals(transactions.iter().filter(|t| t.date >= start))
}

/// Months covered by a set of transactions: `max(1, round(days / 30))`
///
/// Zero for an empty set.
pub fn month_span<'a, I>(transactions: I) -> u32
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for tx in transactions {
        range = Some(match range {
            Some((earliest, latest)) => (earliest.min(tx.date), latest.max(tx.date)),
            None => (tx.date, tx.date),
        });
    }

    match range {
        Some((earliest, latest)) => {
            let days = (latest - earliest).num_days() as f64;
            ((days / 30.0).round() as u32).max(1)
        }
        None => 0,
    }
}

/// Total income divided by the month span of income transactions
pub fn average_monthly_income(transactions: &[Transaction]) -> f64 {
    average_per_month(transactions.iter().filter(|t| t.is_income()).collect())
}

/// Total |expenses| divided by the month span of expense transactions
pub fn average_monthly_expenses(transactions: &[Transaction]) -> f64 {
    average_per_month(transactions.iter().filter(|t| t.is_expense()).collect())
}

fn average_per_month(transactions: Vec<&Transaction>) -> f64 {
    if transactions.is_empty() {
        return 0.0;
    }
    let total: f64 = transactions.iter().map(|t| t.amount.abs()).sum();
    let months = month_span(transactions.iter().copied());
    total / f64::from(months.max(1))
}

/// Payees with at least three transactions, with their average |amount|
pub fn recurring_payees(transactions: &[Transaction]) -> Vec<RecurringPayee> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups.entry(tx.payee.as_str()).or_default().push(tx);
    }

    groups
        .into_iter()
        .filter(|(_, txs)| txs.len() >= RECURRING_MIN_COUNT)
        .map(|(payee, txs)| RecurringPayee {
            payee: payee.to_string(),
            average_amount: txs.iter().map(|t| t.amount.abs()).sum::<f64>() / txs.len() as f64,
            frequency: txs.len(),
        })
        .collect()
}

/// Largest expense categories, descending
pub fn top_categories(transactions: &[Transaction], limit: usize) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = category_totals(transactions)
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect();
    totals.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    totals.truncate(limit);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;

    fn tx(date: &str, amount: f64, payee: &str, category: &str, kind: TransactionKind) -> Transaction {
        Transaction {
            id: format!("{}-{}", date, payee),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            payee: payee.to_string(),
            description: payee.to_string(),
            category: category.to_string(),
            kind,
            is_recurring: false,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_window_start_is_first_of_month() {
        assert_eq!(window_start(today(), 3), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(window_start(today(), 12), NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(window_start(jan, 1), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    }

    #[test]
    fn test_trailing_food_total() {
        let txs = vec![
            tx("2024-06-01", -10.0, "Cafe", "Food", TransactionKind::Expense),
            tx("2024-05-10", -20.0, "Grocer", "Food", TransactionKind::Expense),
            tx("2024-04-02", -5.0, "Bakery", "Food", TransactionKind::Expense),
            // Outside the window
            tx("2024-02-20", -100.0, "Grocer", "Food", TransactionKind::Expense),
            // Not an expense
            tx("2024-06-01", 3000.0, "Employer", "Food", TransactionKind::Income),
        ];

        let totals = trailing_category_totals(&txs, today(), 3);
        assert_eq!(totals.get("Food").copied(), Some(35.0));
        assert_eq!(totals.len(), 1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let txs = vec![tx("2024-03-01", -12.0, "Gym", "Health", TransactionKind::Expense)];
        assert_eq!(trailing_category_totals(&txs, today(), 3)["Health"], 12.0);
    }

    #[test]
    fn test_month_span() {
        let txs = vec![
            tx("2024-01-01", 1.0, "a", "x", TransactionKind::Income),
            tx("2024-03-31", 1.0, "b", "x", TransactionKind::Income),
        ];
        assert_eq!(month_span(&txs), 3);
        assert_eq!(month_span(&txs[..1]), 1);
        assert_eq!(month_span(&Vec::<Transaction>::new()), 0);
    }

    #[test]
    fn test_monthly_averages() {
        let txs = vec![
            tx("2024-01-01", 3000.0, "Employer", "Salary", TransactionKind::Income),
            tx("2024-01-31", 3000.0, "Employer", "Salary", TransactionKind::Income),
            tx("2024-01-05", -400.0, "Landlord", "Rent", TransactionKind::Expense),
            tx("2024-01-20", -200.0, "Grocer", "Food", TransactionKind::Expense),
        ];
        // 30 days of income → one month
        assert_eq!(average_monthly_income(&txs), 6000.0);
        assert_eq!(average_monthly_expenses(&txs), 600.0);
        assert_eq!(average_monthly_income(&[]), 0.0);
    }

    #[test]
    fn test_recurring_payees_need_three() {
        let txs = vec![
            tx("2024-01-01", -15.0, "Netflix", "Streaming", TransactionKind::Expense),
            tx("2024-02-01", -15.0, "Netflix", "Streaming", TransactionKind::Expense),
            tx("2024-03-01", -18.0, "Netflix", "Streaming", TransactionKind::Expense),
            tx("2024-03-01", -50.0, "Shell", "Gas", TransactionKind::Expense),
            tx("2024-03-09", -50.0, "Shell", "Gas", TransactionKind::Expense),
        ];
        let recurring = recurring_payees(&txs);
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].payee, "Netflix");
        assert_eq!(recurring[0].frequency, 3);
        assert!((recurring[0].average_amount - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_categories_sorted() {
        let txs = vec![
            tx("2024-06-01", -10.0, "a", "Food", TransactionKind::Expense),
            tx("2024-06-01", -900.0, "b", "Rent", TransactionKind::Expense),
            tx("2024-06-01", -60.0, "c", "Gas", TransactionKind::Expense),
        ];
        let top = top_categories(&txs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].category, "Rent");
        assert_eq!(top[1].category, "Gas");
    }
}
