//! Payee cleanup and transaction deduplication

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::Transaction;

/// Well-known chains, matched by substring on the cleaned uppercase name
const CHAINS: &[(&str, &str)] = &[
    ("STARBUCKS", "Starbucks"),
    ("WALMART", "Walmart"),
    ("TARGET", "Target"),
    ("AMAZON", "Amazon"),
    ("MCDONALDS", "McDonald's"),
    ("SHELL", "Shell"),
    ("CHEVRON", "Chevron"),
    ("COSTCO", "Costco"),
    ("WHOLE FOODS", "Whole Foods"),
    ("TRADER JOE", "Trader Joe's"),
];

struct PayeePatterns {
    location_number: Regex,
    long_number: Regex,
    channel_prefix: Regex,
    business_suffix: Regex,
    store_suffix: Regex,
}

fn patterns() -> &'static PayeePatterns {
    static PATTERNS: OnceLock<PayeePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PayeePatterns {
        location_number: Regex::new(r"\s+#\d+.*$").expect("valid regex"),
        long_number: Regex::new(r"\s+\d{3,}.*$").expect("valid regex"),
        channel_prefix: Regex::new(r"(?i)^(POS|ATM|DEBIT|CREDIT|PAYMENT|TRANSFER)\s+")
            .expect("valid regex"),
        business_suffix: Regex::new(r"(?i)\s+(INC|LLC|LTD|CORP|CO|CORPORATION)\.?$")
            .expect("valid regex"),
        store_suffix: Regex::new(r"(?i)\s+STORE$").expect("valid regex"),
    })
}

/// Canonical display name for a raw bank payee string
///
/// `"POS STARBUCKS #1234 SEATTLE"` becomes `"Starbucks"`,
/// `"ACME WIDGETS LLC"` becomes `"Acme Widgets"`.
pub fn normalize_payee(raw: &str) -> String {
    let p = patterns();

    let upper = raw.to_uppercase();
    let stripped = p.location_number.replace(&upper, "");
    let stripped = p.long_number.replace(&stripped, "");
    let stripped = p.channel_prefix.replace(&stripped, "");
    let stripped = p.business_suffix.replace(stripped.trim(), "");
    let stripped = p.store_suffix.replace(&stripped, "");
    let cleaned = stripped.trim();

    if let Some((_, name)) = CHAINS.iter().find(|(key, _)| cleaned.contains(key)) {
        return (*name).to_string();
    }

    cleaned
        .split(' ')
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Replace every payee with its canonical name, preserving order
pub fn clean_payee_names(transactions: &[Transaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|tx| Transaction {
            payee: normalize_payee(&tx.payee),
            ..tx.clone()
        })
        .collect()
}

/// Drop repeats of the same date, amount and payee, keeping the first
pub fn deduplicate_transactions(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut seen = HashSet::new();
    transactions
        .iter()
        .filter(|tx| seen.insert(format!("{}-{}-{}", tx.date, tx.amount, tx.payee)))
        .cloned()
        .collect()
}

/// Cosine similarity of two embedding vectors
///
/// Returns 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::TransactionKind;

    fn tx(payee: &str, amount: f64) -> Transaction {
        Transaction {
            id: payee.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            amount,
            payee: payee.to_string(),
            description: String::new(),
            category: "Misc".to_string(),
            kind: TransactionKind::Expense,
            is_recurring: false,
        }
    }

    #[test]
    fn test_normalize_chains() {
        assert_eq!(normalize_payee("POS STARBUCKS #1234 SEATTLE WA"), "Starbucks");
        assert_eq!(normalize_payee("mcdonalds 00423 springfield"), "McDonald's");
        assert_eq!(normalize_payee("TRADER JOE S #552"), "Trader Joe's");
    }

    #[test]
    fn test_normalize_strips_suffixes_and_title_cases() {
        assert_eq!(normalize_payee("ACME WIDGETS LLC"), "Acme Widgets");
        assert_eq!(normalize_payee("debit joe's hardware store"), "Joe's Hardware");
        assert_eq!(normalize_payee("Blue Bottle Coffee Inc."), "Blue Bottle Coffee");
        assert_eq!(normalize_payee("TRANSFER CITY WATER 98765432"), "City Water");
    }

    #[test]
    fn test_clean_payee_names_preserves_order() {
        let cleaned = clean_payee_names(&[tx("SHELL OIL 5734", -40.0), tx("LOCAL DELI", -9.0)]);
        assert_eq!(cleaned[0].payee, "Shell");
        assert_eq!(cleaned[1].payee, "Local Deli");
        assert_eq!(cleaned[0].amount, -40.0);
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let mut second = tx("Grocer", -20.0);
        second.id = "other".to_string();
        let deduped = deduplicate_transactions(&[tx("Grocer", -20.0), second, tx("Grocer", -21.0)]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "Grocer");
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
