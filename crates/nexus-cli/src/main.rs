//! Nexus CLI - AI financial assistant
//!
//! Usage:
//!   nexus budget --file tx.csv              Generate category budgets
//!   nexus forecast --file tx.csv -b 2500    Forecast month-end balances
//!   nexus procure --image p.jpg --budgets b.json
//!   nexus ask "Can I afford a vacation?"    Ask the assistant

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Budget { file, period, json } => {
            let period = period.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            commands::cmd_budget(config, &file, period, json).await
        }
        Commands::Forecast {
            file,
            balance,
            months,
        } => {
            let horizon = months.try_into().map_err(|e: String| anyhow::anyhow!(e))?;
            commands::cmd_forecast(config, &file, balance, horizon).await
        }
        Commands::Procure { image, budgets } => {
            commands::cmd_procure(config, &image, &budgets).await
        }
        Commands::Narrative {
            file,
            period,
            stream,
        } => {
            let period = period.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            commands::cmd_narrative(config, &file, period, stream).await
        }
        Commands::Ask { question, stream } => commands::cmd_ask(config, &question, stream).await,
        Commands::Search { query } => commands::cmd_search(config, &query).await,
        Commands::Providers => commands::cmd_providers(config).await,
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
