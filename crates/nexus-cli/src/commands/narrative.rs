//! Spending summary command

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use nexus_core::analytics::{burn_rate, detect_phantom_spend, scan_subscriptions};
use nexus_core::{
    generate_narrative, generate_quick_win, NarrativeInput, NarrativePeriod, Subscription,
};

use super::{build_orchestrator, load_transactions, stdout_sink, today};

pub async fn cmd_narrative(
    config: Option<&Path>,
    file: &Path,
    period: NarrativePeriod,
    stream: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let orchestrator = build_orchestrator(config)?;
    let today = today();

    let rate = burn_rate(&transactions, None, today);
    println!(
        "🔥 Burn rate: {:.1}% ({}) - ${:.2} spent of ${:.2} income\n",
        rate.percentage, rate.status, rate.monthly_expenses, rate.monthly_income
    );

    let input = NarrativeInput::from_transactions(&transactions, today);
    if stream {
        generate_narrative(&orchestrator, &input, period, Some(stdout_sink())).await;
        println!();
    } else {
        let text = generate_narrative(&orchestrator, &input, period, None).await;
        println!("{}", text);
    }

    let phantom = detect_phantom_spend(&transactions, today);
    let tip = generate_quick_win(&orchestrator, &phantom, rate.percentage).await;
    println!("\n💡 {}", tip);

    let subscriptions = scan_subscriptions(&transactions, today);
    print!("{}", format_subscriptions(&subscriptions));
    Ok(())
}

/// Subscription list with zombies flagged; empty when there are none
pub fn format_subscriptions(subscriptions: &[Subscription]) -> String {
    let mut out = String::new();
    if subscriptions.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\n📺 Subscriptions:");
    for sub in subscriptions {
        let flag = if sub.is_zombie { " 🧟 no charge in 3 months" } else { "" };
        let _ = writeln!(
            out,
            "   {:<24} ${:>8.2} {:?}, last {}{}",
            sub.name, sub.amount, sub.frequency, sub.last_charged, flag
        );
        if let Some(url) = &sub.cancel_url {
            let _ = writeln!(out, "      cancel: {}", url);
        }
    }
    out
}
