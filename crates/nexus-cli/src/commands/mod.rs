//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (orchestrator setup, CSV/JSON loading, streaming)
//! - `planning` - Budget and forecast commands
//! - `procure` - Purchase advice from a product photo
//! - `narrative` - Spending summary, quick win and subscriptions
//! - `assistant` - Ask, search and provider status
//! - `prompts` - Prompt library management commands

pub mod assistant;
pub mod core;
pub mod narrative;
pub mod planning;
pub mod procure;
pub mod prompts;

// Re-export command functions for main.rs
pub use assistant::*;
pub use self::core::*;
pub use narrative::*;
pub use planning::*;
pub use procure::*;
pub use prompts::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
