//! Nexus Core Library
//!
//! AI task orchestration for the Nexus personal finance assistant:
//! - Provider adapters behind one capability trait (OpenAI-compatible, Gemini)
//! - Table-driven task router with per-task fallback and timeouts
//! - Structured output coercion with a single JSON repair attempt
//! - Budget, forecast, procurement and narrative pipelines with
//!   deterministic fallbacks
//! - Deterministic spending analytics (burn rate, phantom spend, subscriptions)
//! - Prompt library for customizable AI prompts
//! - Layered provider and routing configuration

pub mod ai;
pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod pipelines;
pub mod prompts;

/// Test utilities including mock provider HTTP servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIProvider, AIResult, Capability, ChunkCallback, GeminiProvider, MediaKind, MediaPayload,
    MockProvider, MockReply, OpenAICompatibleProvider, Orchestrator, ProviderClient, ProviderId,
    ProviderInfo, ProviderRegistry, RoutingTable, TaskDescriptor, TaskKind,
};
pub use config::{NexusConfig, ProviderApi, ProviderSettings};
pub use error::{Error, Result};
pub use models::{
    Budget, BudgetPeriod, BurnRate, BurnRateStatus, CashFlowForecast, CategoryTotal,
    ForecastHorizon, ForecastPoint, NarrativePeriod, PhantomSpend, ProcurementRecommendation,
    Provenance, SavingsTrend, SavingsVelocity, Subscription, SubscriptionFrequency, Transaction,
    TransactionKind, Verdict,
};
pub use pipelines::{
    analyze_procurement, extract_statement_text, generate_budgets, generate_forecast,
    generate_narrative, generate_quick_win, NarrativeInput,
};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
