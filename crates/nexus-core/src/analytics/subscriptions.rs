//! Subscription scanner
//!
//! Groups recurring-looking charges by payee and classifies their cadence
//! from the average gap between charges.

use std::collections::HashMap;

use chrono::{Months, NaiveDate};

use crate::models::{Subscription, SubscriptionFrequency, Transaction};

const SUBSCRIPTION_KEYWORDS: &[&str] = &[
    "netflix",
    "spotify",
    "hulu",
    "disney",
    "prime",
    "apple",
    "subscription",
    "monthly",
    "membership",
    "premium",
    "adobe",
    "microsoft",
    "google",
    "dropbox",
    "icloud",
    "gym",
    "fitness",
    "insurance",
    "phone",
    "internet",
];

const CANCEL_URLS: &[(&str, &str)] = &[
    ("netflix", "https://www.netflix.com/cancelplan"),
    ("spotify", "https://www.spotify.com/account/subscription/"),
    ("hulu", "https://secure.hulu.com/account"),
    ("disney", "https://www.disneyplus.com/account"),
    ("amazon", "https://www.amazon.com/gp/primecentral"),
    ("apple", "https://support.apple.com/en-us/HT202039"),
];

/// Months without a charge before a subscription counts as a zombie
const ZOMBIE_AFTER_MONTHS: u32 = 3;

/// True when the description mentions a known subscription keyword
pub fn is_likely_subscription(transaction: &Transaction) -> bool {
    let description = transaction.description.to_lowercase();
    SUBSCRIPTION_KEYWORDS.iter().any(|k| description.contains(k))
}

/// Known cancellation page for a payee, matched by substring
pub fn cancel_url(payee: &str) -> Option<&'static str> {
    let payee = payee.to_lowercase();
    CANCEL_URLS
        .iter()
        .find(|(key, _)| payee.contains(key))
        .map(|(_, url)| *url)
}

fn classify_interval(days: f64) -> SubscriptionFrequency {
    if days < 10.0 {
        SubscriptionFrequency::Weekly
    } else if days < 40.0 {
        SubscriptionFrequency::Monthly
    } else {
        SubscriptionFrequency::Yearly
    }
}

/// Find subscriptions in a transaction history
///
/// A payee needs at least two recurring or subscription-like charges.
/// Results are sorted by average amount, largest first.
pub fn scan_subscriptions(transactions: &[Transaction], today: NaiveDate) -> Vec<Subscription> {
    let mut groups: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|t| t.is_recurring || is_likely_subscription(t))
    {
        groups.entry(tx.payee.as_str()).or_default().push(tx);
    }

    let zombie_cutoff = today
        .checked_sub_months(Months::new(ZOMBIE_AFTER_MONTHS))
        .unwrap_or(NaiveDate::MIN);

    let mut subscriptions: Vec<Subscription> = groups
        .into_iter()
        .filter(|(_, txs)| txs.len() >= 2)
        .filter_map(|(payee, txs)| {
            let mut dates: Vec<NaiveDate> = txs.iter().map(|t| t.date).collect();
            dates.sort();
            let first = *dates.first()?;
            let last = *dates.last()?;

            // Mean of consecutive gaps equals the total span over the gap count
            let avg_interval = (last - first).num_days() as f64 / (dates.len() - 1) as f64;
            let amount = txs.iter().map(|t| t.amount.abs()).sum::<f64>() / txs.len() as f64;

            Some(Subscription {
                name: payee.to_string(),
                amount,
                frequency: classify_interval(avg_interval),
                last_charged: last,
                is_zombie: last < zombie_cutoff,
                cancel_url: cancel_url(payee).map(str::to_string),
            })
        })
        .collect();

    subscriptions.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    subscriptions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;

    fn charge(date: &str, amount: f64, payee: &str, description: &str) -> Transaction {
        Transaction {
            id: format!("{}-{}", date, payee),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            payee: payee.to_string(),
            description: description.to_string(),
            category: "Subscriptions".to_string(),
            kind: TransactionKind::Expense,
            is_recurring: false,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_keyword_match_uses_description() {
        assert!(is_likely_subscription(&charge("2024-06-01", -9.99, "SPOT", "Spotify Premium")));
        assert!(!is_likely_subscription(&charge("2024-06-01", -9.99, "Netflix", "card purchase")));
    }

    #[test]
    fn test_cancel_url_lookup() {
        assert_eq!(cancel_url("NETFLIX.COM"), Some("https://www.netflix.com/cancelplan"));
        assert_eq!(cancel_url("Amazon Prime"), Some("https://www.amazon.com/gp/primecentral"));
        assert_eq!(cancel_url("Local Gym"), None);
    }

    #[test]
    fn test_scan_classifies_and_sorts() {
        let txs = vec![
            charge("2024-04-01", -15.49, "Netflix", "Netflix monthly"),
            charge("2024-05-01", -15.49, "Netflix", "Netflix monthly"),
            charge("2024-06-01", -15.49, "Netflix", "Netflix monthly"),
            charge("2024-05-27", -25.0, "Gym", "Gym membership"),
            charge("2024-06-03", -25.0, "Gym", "Gym membership"),
            charge("2024-06-10", -25.0, "Gym", "Gym membership"),
            // Single charge never qualifies
            charge("2024-06-02", -5.0, "Dropbox", "Dropbox plan"),
        ];

        let subs = scan_subscriptions(&txs, today());
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].name, "Gym");
        assert_eq!(subs[0].frequency, SubscriptionFrequency::Weekly);
        assert_eq!(subs[1].name, "Netflix");
        assert_eq!(subs[1].frequency, SubscriptionFrequency::Monthly);
        assert_eq!(subs[1].last_charged, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(subs[1].cancel_url.is_some());
        assert!(!subs[1].is_zombie);
    }

    #[test]
    fn test_yearly_zombie() {
        let txs = vec![
            charge("2022-01-10", -99.0, "Adobe", "Adobe annual"),
            charge("2023-01-10", -99.0, "Adobe", "Adobe annual"),
        ];
        let subs = scan_subscriptions(&txs, today());
        assert_eq!(subs[0].frequency, SubscriptionFrequency::Yearly);
        assert!(subs[0].is_zombie);
    }

    #[test]
    fn test_recurring_flag_counts_without_keyword() {
        let mut a = charge("2024-05-05", -40.0, "City Water", "utility");
        let mut b = charge("2024-06-05", -40.0, "City Water", "utility");
        a.is_recurring = true;
        b.is_recurring = true;
        let subs = scan_subscriptions(&[a, b], today());
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].cancel_url, None);
    }
}
