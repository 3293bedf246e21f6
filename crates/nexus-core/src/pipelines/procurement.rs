//! Procurement advice for a photographed product
//!
//! Four phases run in order: identify the product from the image, look up a
//! market price, find the matching budget, and ask for a short
//! recommendation. Only identification is fatal; the other phases degrade.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{info, warn};

use crate::ai::parsing::{extract_dollar_amount, parse_json};
use crate::ai::{MediaPayload, Orchestrator, TaskDescriptor};
use crate::error::{Error, Result};
use crate::models::{Budget, ProcurementRecommendation, Verdict};
use crate::prompts::PromptId;

use super::render_prompt;

/// Share of a budget assumed spent when no spending data is supplied
const ASSUMED_SPENT_SHARE: f64 = 0.5;

/// Estimated prices up to this multiple of the market price count as fair
const FAIR_PRICE_TOLERANCE: f64 = 1.1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifiedProduct {
    product_name: String,
    estimated_price: f64,
    #[serde(default)]
    category: String,
}

/// Spending position of one budget
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub category: String,
    pub allocated: f64,
    pub spent: f64,
}

impl BudgetStatus {
    /// Status for a budget with no spending data: half is assumed spent
    ///
    /// Replace with real per-category spend once callers pass it in.
    pub fn assumed(budget: &Budget) -> Self {
        Self {
            category: budget.category.clone(),
            allocated: budget.amount,
            spent: budget.amount * ASSUMED_SPENT_SHARE,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.allocated - self.spent
    }
}

/// First budget whose category contains `category`, ignoring case
///
/// Substring matching is coarse ("Home" matches "Home Office"); a shared
/// category taxonomy would make this exact.
pub fn find_relevant_budget<'a>(budgets: &'a [Budget], category: &str) -> Option<&'a Budget> {
    let needle = category.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    budgets
        .iter()
        .find(|b| b.category.to_lowercase().contains(&needle))
}

/// Deterministic purchase verdict
///
/// Buy when the budget covers the price and the price is within 10% of the
/// market; avoid when the budget cannot cover it; otherwise wait.
pub fn verdict(estimated_price: f64, market_price: f64, budget_remaining: f64) -> Verdict {
    if budget_remaining >= estimated_price
        && estimated_price <= market_price * FAIR_PRICE_TOLERANCE
    {
        Verdict::Buy
    } else if budget_remaining < estimated_price {
        Verdict::Avoid
    } else {
        Verdict::Wait
    }
}

/// Advise on buying the product shown in `image`
///
/// Fails with `IdentificationFailed` when the product cannot be identified;
/// every later phase falls back to deterministic values.
pub async fn analyze_procurement(
    orchestrator: &Orchestrator,
    image: MediaPayload,
    budgets: &[Budget],
) -> Result<ProcurementRecommendation> {
    let product = identify(orchestrator, image)
        .await
        .map_err(|e| Error::IdentificationFailed(e.to_string()))?;
    info!(
        product = %product.product_name,
        category = %product.category,
        "Identified product"
    );

    let market_price = market_price(orchestrator, &product).await;

    let budget_remaining = find_relevant_budget(budgets, &product.category)
        .map(|b| BudgetStatus::assumed(b).remaining())
        .unwrap_or(0.0);

    let verdict = verdict(product.estimated_price, market_price, budget_remaining);

    let reasoning = match advise(orchestrator, &product, market_price, budget_remaining).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Recommendation failed, using summary reasoning");
            summary_reasoning(&product, market_price, budget_remaining, verdict)
        }
    };

    Ok(ProcurementRecommendation {
        item_name: product.product_name,
        identified_price: product.estimated_price,
        market_price,
        budget_category: product.category,
        budget_remaining,
        verdict,
        reasoning,
    })
}

async fn identify(orchestrator: &Orchestrator, image: MediaPayload) -> Result<IdentifiedProduct> {
    let prompt = render_prompt(orchestrator, PromptId::IdentifyProduct, &HashMap::new())?;
    let task = TaskDescriptor::multimodal(prompt.user, image).with_system(prompt.system);
    let result = orchestrator.orchestrate(task).await?;

    let product: IdentifiedProduct = parse_json(&result.content)?;
    if product.product_name.trim().is_empty() {
        return Err(Error::InvalidData("No product name in identification".to_string()));
    }
    if !product.estimated_price.is_finite() || product.estimated_price < 0.0 {
        return Err(Error::InvalidData(format!(
            "Invalid estimated price: {}",
            product.estimated_price
        )));
    }
    Ok(product)
}

/// First dollar amount in a grounded search answer, else the estimate
async fn market_price(orchestrator: &Orchestrator, product: &IdentifiedProduct) -> f64 {
    let query = format!("What is the current market price for: {}", product.product_name);
    match orchestrator.orchestrate(TaskDescriptor::search(query)).await {
        Ok(result) => extract_dollar_amount(&result.content).unwrap_or(product.estimated_price),
        Err(e) => {
            warn!(error = %e, "Market price search failed, using estimated price");
            product.estimated_price
        }
    }
}

async fn advise(
    orchestrator: &Orchestrator,
    product: &IdentifiedProduct,
    market_price: f64,
    budget_remaining: f64,
) -> Result<String> {
    let price = format!("{:.2}", product.estimated_price);
    let market = format!("{:.2}", market_price);
    let remaining = format!("{:.2}", budget_remaining);
    let vars = HashMap::from([
        ("product", product.product_name.as_str()),
        ("price", price.as_str()),
        ("market_price", market.as_str()),
        ("category", product.category.as_str()),
        ("budget_remaining", remaining.as_str()),
    ]);
    let prompt = render_prompt(orchestrator, PromptId::PurchaseAdvice, &vars)?;

    let task = TaskDescriptor::conversation(prompt.user).with_system(prompt.system);
    Ok(orchestrator.orchestrate(task).await?.content)
}

fn summary_reasoning(
    product: &IdentifiedProduct,
    market_price: f64,
    budget_remaining: f64,
    verdict: Verdict,
) -> String {
    format!(
        "Recommendation: {}. Estimated price ${:.2} against a market price of ${:.2}, with ${:.2} remaining in the {} budget.",
        verdict, product.estimated_price, market_price, budget_remaining, product.category
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::{Capability, MockProvider, MockReply, ProviderId, ProviderRegistry};
    use crate::config::NexusConfig;
    use crate::models::{BudgetPeriod, Provenance};

    fn budget(category: &str, amount: f64) -> Budget {
        Budget {
            id: format!("budget-{}", category),
            category: category.to_string(),
            amount,
            period: BudgetPeriod::Monthly,
            rollover: true,
            provenance: Provenance::Personalized,
            historical_average: None,
            seasonality_factor: None,
            reasoning: None,
        }
    }

    fn image() -> MediaPayload {
        MediaPayload::image(vec![0xFF, 0xD8, 0xFF])
    }

    struct Providers {
        reasoning: MockProvider,
        conversational: MockProvider,
        multimodal: MockProvider,
    }

    impl Providers {
        fn new() -> Self {
            Self {
                reasoning: MockProvider::new(ProviderId::Reasoning),
                conversational: MockProvider::new(ProviderId::Conversational),
                multimodal: MockProvider::new(ProviderId::Multimodal),
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            let registry = Arc::new(ProviderRegistry::new(NexusConfig::default()));
            registry.install(ProviderId::Reasoning, self.reasoning.clone());
            registry.install(ProviderId::Conversational, self.conversational.clone());
            registry.install(ProviderId::Multimodal, self.multimodal.clone());
            Orchestrator::new(registry)
        }
    }

    const HEADPHONES: &str =
        r#"{"productName": "Sony WH-1000XM5", "estimatedPrice": 100, "category": "Electronics"}"#;

    #[test]
    fn test_verdict_table() {
        assert_eq!(verdict(100.0, 100.0, 150.0), Verdict::Buy);
        assert_eq!(verdict(100.0, 100.0, 50.0), Verdict::Avoid);
        assert_eq!(verdict(100.0, 50.0, 150.0), Verdict::Wait);
        // Exactly 10% over market is still fair
        assert_eq!(verdict(110.0, 100.0, 110.0), Verdict::Buy);
    }

    #[test]
    fn test_find_relevant_budget_first_substring_match() {
        let budgets = vec![
            budget("Groceries", 400.0),
            budget("Consumer Electronics", 300.0),
            budget("Electronics", 500.0),
        ];
        let found = find_relevant_budget(&budgets, "electronics").unwrap();
        assert_eq!(found.category, "Consumer Electronics");
        assert!(find_relevant_budget(&budgets, "Travel").is_none());
        assert!(find_relevant_budget(&budgets, "  ").is_none());
    }

    #[test]
    fn test_budget_status_assumes_half_spent() {
        let status = BudgetStatus::assumed(&budget("Electronics", 300.0));
        assert_eq!(status.spent, 150.0);
        assert_eq!(status.remaining(), 150.0);
    }

    #[tokio::test]
    async fn test_full_procurement_flow() {
        let providers = Providers::new();
        providers
            .multimodal
            .clone()
            .with_text(Capability::UnderstandMedia, HEADPHONES)
            .with_text(Capability::GroundedSearch, "Currently selling for $1,299.99 at most retailers.");
        providers
            .conversational
            .clone()
            .with_text(Capability::GenerateText, "Good price, go for it.");

        let rec = analyze_procurement(
            &providers.orchestrator(),
            image(),
            &[budget("Electronics", 300.0)],
        )
        .await
        .unwrap();

        assert_eq!(rec.item_name, "Sony WH-1000XM5");
        assert_eq!(rec.identified_price, 100.0);
        assert_eq!(rec.market_price, 1299.99);
        assert_eq!(rec.budget_remaining, 150.0);
        assert_eq!(rec.verdict, Verdict::Buy);
        assert_eq!(rec.reasoning, "Good price, go for it.");

        let search = &providers.multimodal.calls()[1];
        assert_eq!(search.capability, Capability::GroundedSearch);
        assert_eq!(search.prompt, "What is the current market price for: Sony WH-1000XM5");
        let advice = &providers.conversational.calls()[0].prompt;
        assert!(advice.contains("Budget Remaining: $150.00"));
    }

    #[tokio::test]
    async fn test_identification_tolerates_bracketed_aside() {
        let providers = Providers::new();
        providers.multimodal.clone().with_text(
            Capability::UnderstandMedia,
            "Product [high confidence]:\n{\"productName\": \"Kettle\", \"estimatedPrice\": 40, \"category\": \"Home\"}",
        );

        let rec = analyze_procurement(&providers.orchestrator(), image(), &[budget("Home", 200.0)])
            .await
            .unwrap();
        assert_eq!(rec.item_name, "Kettle");
        assert_eq!(rec.identified_price, 40.0);
        assert_eq!(rec.budget_remaining, 100.0);
    }

    #[tokio::test]
    async fn test_identification_failure_propagates() {
        let providers = Providers::new();
        providers
            .multimodal
            .clone()
            .with_text(Capability::UnderstandMedia, "It looks like a pair of headphones!");

        let err = analyze_procurement(&providers.orchestrator(), image(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdentificationFailed(_)));
        assert!(providers.conversational.calls().is_empty());
    }

    #[tokio::test]
    async fn test_later_phases_degrade() {
        let providers = Providers::new();
        providers
            .multimodal
            .clone()
            .with_text(Capability::UnderstandMedia, HEADPHONES)
            .with_reply(Capability::GroundedSearch, MockReply::fail("search down"));
        providers
            .reasoning
            .clone()
            .with_reply(Capability::GenerateText, MockReply::fail("also down"));
        providers
            .conversational
            .clone()
            .with_reply(Capability::GenerateText, MockReply::fail("rate limited"));
        providers
            .multimodal
            .clone()
            .with_reply(Capability::GenerateText, MockReply::fail("quota"));

        let rec = analyze_procurement(&providers.orchestrator(), image(), &[])
            .await
            .unwrap();

        // Search failed on both providers: estimated price stands in
        assert_eq!(rec.market_price, 100.0);
        // No matching budget
        assert_eq!(rec.budget_remaining, 0.0);
        assert_eq!(rec.verdict, Verdict::Avoid);
        assert!(rec.reasoning.starts_with("Recommendation: avoid."));
    }

    #[tokio::test]
    async fn test_search_without_price_uses_estimate() {
        let providers = Providers::new();
        providers
            .multimodal
            .clone()
            .with_text(Capability::UnderstandMedia, HEADPHONES)
            .with_text(Capability::GroundedSearch, "Prices vary by retailer.");

        let rec = analyze_procurement(&providers.orchestrator(), image(), &[])
            .await
            .unwrap();
        assert_eq!(rec.market_price, 100.0);
    }
}
