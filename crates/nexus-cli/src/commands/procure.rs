//! Purchase advice command

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use nexus_core::{analyze_procurement, MediaPayload, ProcurementRecommendation, Verdict};

use super::{build_orchestrator, load_budgets};

pub async fn cmd_procure(config: Option<&Path>, image: &Path, budgets: &Path) -> Result<()> {
    let budgets = load_budgets(budgets)?;
    let bytes = std::fs::read(image)
        .with_context(|| format!("Failed to read image: {}", image.display()))?;
    let extension = image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let media = MediaPayload::image_from_extension(bytes, extension);

    let orchestrator = build_orchestrator(config)?;

    println!("🔍 Identifying product...");
    let recommendation = analyze_procurement(&orchestrator, media, &budgets)
        .await
        .context("Could not analyze the product photo")?;

    print!("{}", format_recommendation(&recommendation));
    Ok(())
}

pub fn format_recommendation(rec: &ProcurementRecommendation) -> String {
    let badge = match rec.verdict {
        Verdict::Buy => "✅ BUY",
        Verdict::Wait => "⏳ WAIT",
        Verdict::Avoid => "🚫 AVOID",
    };

    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rec.item_name);
    let _ = writeln!(out, "   Price seen:    ${:.2}", rec.identified_price);
    let _ = writeln!(out, "   Market price:  ${:.2}", rec.market_price);
    let _ = writeln!(
        out,
        "   Budget:        ${:.2} remaining in {}",
        rec.budget_remaining, rec.budget_category
    );
    let _ = writeln!(out, "\n{}\n", badge);
    let _ = writeln!(out, "{}", rec.reasoning);
    out
}
