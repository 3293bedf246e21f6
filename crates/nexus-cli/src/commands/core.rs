//! Shared command utilities
//!
//! This module contains:
//! - `build_orchestrator` - Load config, configure providers from the environment
//! - `load_transactions` / `parse_transactions` - Transaction CSV loading
//! - `load_budgets` / `parse_budgets` - Budget JSON loading
//! - `stdout_sink` - Chunk callback that streams to stdout

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use nexus_core::analytics::{clean_payee_names, deduplicate_transactions};
use nexus_core::{
    Budget, ChunkCallback, NexusConfig, Orchestrator, PromptLibrary, ProviderRegistry, Transaction,
    TransactionKind,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Build an orchestrator from config plus API keys in the environment
///
/// Prompt overrides in the data dir are honored.
pub fn build_orchestrator(config_path: Option<&Path>) -> Result<Orchestrator> {
    let config = match config_path {
        Some(path) => NexusConfig::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => NexusConfig::load().context("Failed to load config")?,
    };

    let registry = Arc::new(ProviderRegistry::from_env(config));
    if registry.infos().is_empty() {
        warn!("No AI providers configured; results will use deterministic fallbacks");
    }

    Ok(Orchestrator::new(registry).with_prompts(PromptLibrary::new()))
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// One row of the transaction CSV
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    payee: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    amount: f64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Read, clean and deduplicate a transaction CSV file
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let raw = parse_transactions(file)
        .with_context(|| format!("Failed to parse transactions: {}", path.display()))?;

    let cleaned = deduplicate_transactions(&clean_payee_names(&raw));
    if cleaned.len() < raw.len() {
        debug!(removed = raw.len() - cleaned.len(), "Dropped duplicate transactions");
    }
    info!(count = cleaned.len(), file = %path.display(), "Loaded transactions");
    Ok(cleaned)
}

/// Parse `date,payee,description,category,amount,type` rows
///
/// `type` may be omitted, in which case the sign of `amount` decides.
/// Dates are `YYYY-MM-DD` or `MM/DD/YYYY`.
pub fn parse_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut transactions = Vec::new();
    for (i, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("Invalid row on line {}", line))?;

        let date = parse_date(&row.date)
            .with_context(|| format!("Invalid date '{}' on line {}", row.date, line))?;
        let kind = match row.kind.as_deref().filter(|k| !k.is_empty()) {
            Some(kind) => kind
                .parse::<TransactionKind>()
                .map_err(|e| anyhow::anyhow!("{} on line {}", e, line))?,
            None if row.amount >= 0.0 => TransactionKind::Income,
            None => TransactionKind::Expense,
        };

        transactions.push(Transaction {
            id: format!("row-{}", line),
            date,
            amount: row.amount,
            payee: row.payee,
            description: row.description,
            category: row.category,
            kind,
            is_recurring: false,
        });
    }

    Ok(transactions)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(Into::into)
}

/// Budgets file: a bare array or `{"budgets": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum BudgetFile {
    List(Vec<Budget>),
    Wrapped { budgets: Vec<Budget> },
}

/// Read a budgets JSON file
pub fn load_budgets(path: &Path) -> Result<Vec<Budget>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read budgets: {}", path.display()))?;
    parse_budgets(&content).with_context(|| format!("Invalid budgets file: {}", path.display()))
}

pub fn parse_budgets(content: &str) -> Result<Vec<Budget>> {
    let budgets = match serde_json::from_str::<BudgetFile>(content)? {
        BudgetFile::List(budgets) | BudgetFile::Wrapped { budgets } => budgets,
    };
    Ok(budgets)
}

/// Chunk callback that writes each fragment to stdout as it arrives
pub fn stdout_sink() -> ChunkCallback {
    Arc::new(|chunk: &str| {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    })
}
