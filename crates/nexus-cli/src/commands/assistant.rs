//! Free-form assistant commands (ask, search) and provider status

use std::path::Path;

use anyhow::Result;
use nexus_core::{AIProvider, AIResult, Orchestrator, ProviderId, TaskDescriptor};
use tracing::debug;

use super::{build_orchestrator, stdout_sink};

pub async fn cmd_ask(config: Option<&Path>, question: &str, stream: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let result = ask(&orchestrator, question, stream).await?;

    if stream {
        println!();
    } else {
        println!("{}", result.content);
    }
    report_provider(&result);
    Ok(())
}

/// Run a conversation task, streaming to stdout when asked
pub async fn ask(orchestrator: &Orchestrator, question: &str, stream: bool) -> Result<AIResult> {
    let mut task = TaskDescriptor::conversation(question);
    if stream {
        task = task.streaming(stdout_sink());
    }
    Ok(orchestrator.orchestrate(task).await?)
}

pub async fn cmd_search(config: Option<&Path>, query: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let result = orchestrator.orchestrate(TaskDescriptor::search(query)).await?;

    println!("{}", result.content);
    report_provider(&result);
    Ok(())
}

fn report_provider(result: &AIResult) {
    debug!(
        provider = %result.provider_used,
        fallback = result.was_fallback,
        "Answered"
    );
    if result.was_fallback {
        eprintln!("(answered by fallback provider: {})", result.provider_used);
    }
}

pub async fn cmd_providers(config: Option<&Path>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    for line in provider_status(&orchestrator).await {
        println!("{}", line);
    }
    Ok(())
}

/// One status line per provider slot, with a live health check for configured ones
pub async fn provider_status(orchestrator: &Orchestrator) -> Vec<String> {
    let registry = orchestrator.registry();
    let mut lines = vec![
        format!("{:<15} {:<28} {:<8} {}", "PROVIDER", "MODEL", "STATUS", "HOST"),
        "-".repeat(80),
    ];

    for &id in ProviderId::all() {
        let settings = registry.config().provider(id);
        let line = match registry.get(id) {
            Ok(client) => {
                let status = if client.health_check().await {
                    "✓ ok"
                } else {
                    "✗ down"
                };
                format!(
                    "{:<15} {:<28} {:<8} {}",
                    id.as_str(),
                    client.model(),
                    status,
                    client.host()
                )
            }
            Err(_) => format!(
                "{:<15} {:<28} {:<8} set {} to enable",
                id.as_str(),
                settings.model,
                "-",
                settings.api_key_env
            ),
        };
        lines.push(line);
    }

    lines
}
