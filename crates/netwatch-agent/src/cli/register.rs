//! The `register` command: one directory reconciliation pass.

use anyhow::{Context, Result};
use console::style;

use crate::state::AppState;

pub async fn register(state: &AppState, addresses: &[String], json: bool) -> Result<()> {
    let local = state.local_addresses(addresses)?;
    let report = state
        .registry
        .register(&local)
        .await
        .context("registration failed")?;

    if json {
        let out = serde_json::json!({
            "agent": state.registry.agent_name(),
            "created": report.created,
            "unchanged": report.unchanged,
            "deleted": report.deleted,
            "failed": report.failed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  Registered {} for agent {}",
        style(format!("{} address(es)", report.registered_count())).bold(),
        style(state.registry.agent_name()).cyan()
    );
    for ip in &report.created {
        println!("  {} {ip}", style("+").green());
    }
    for ip in &report.unchanged {
        println!("  {} {ip}", style("=").dim());
    }
    for ip in &report.deleted {
        println!("  {} {ip}", style("-").red());
    }
    for ip in &report.failed {
        println!("  {} {ip} {}", style("!").yellow(), style("(not registered)").dim());
    }
    println!();
    Ok(())
}
