//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Nexus - AI financial assistant
#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "AI task orchestrator for personal finance", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Provider/routing config file (defaults to the data dir override, then built-in)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate category budgets from transaction history
    Budget {
        /// Transaction CSV (date,payee,description,category,amount,type)
        #[arg(short, long)]
        file: PathBuf,

        /// Budget period: weekly, monthly, yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// Print budgets as JSON (usable with `procure --budgets`)
        #[arg(long)]
        json: bool,
    },

    /// Forecast month-end balances
    Forecast {
        /// Transaction CSV
        #[arg(short, long)]
        file: PathBuf,

        /// Current account balance
        #[arg(short, long, allow_hyphen_values = true)]
        balance: f64,

        /// Horizon in months: 3, 6 or 12
        #[arg(short, long, default_value = "3")]
        months: u32,
    },

    /// Get purchase advice for a product photo
    Procure {
        /// Product photo (jpg, png, webp, ...)
        #[arg(short, long)]
        image: PathBuf,

        /// Budgets JSON file (array of budgets, e.g. from `budget --json`)
        #[arg(short, long)]
        budgets: PathBuf,
    },

    /// Write a plain-language spending summary
    Narrative {
        /// Transaction CSV
        #[arg(short, long)]
        file: PathBuf,

        /// Summary period: daily, weekly, monthly
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// Stream the summary as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Ask the assistant a question
    Ask {
        /// The question
        question: String,

        /// Stream the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Search for current information (prices, rates, news)
    Search {
        /// The query
        query: String,
    },

    /// Show configured providers and check that they respond
    Providers,

    /// Manage AI prompts (list, show, customize)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., budget_analysis, purchase_advice)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
