//! The `topology` command: print the fleet directory.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub async fn topology(state: &AppState, json: bool) -> Result<()> {
    state
        .registry
        .refresh()
        .await
        .context("failed to fetch the directory")?;
    let snapshot = state.registry.snapshot().await;
    let me = state.registry.agent_name();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = snapshot
            .sorted_entries()
            .into_iter()
            .map(|(ip, name)| (ip.to_string(), serde_json::Value::from(name)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!();
        println!("  {}", style("The directory is empty.").dim());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Address").fg(Color::White),
        Cell::new("Agent").fg(Color::White),
    ]);

    for (ip, name) in snapshot.sorted_entries() {
        let agent = if name == me {
            Cell::new(format!("{name} (this agent)")).fg(Color::Cyan)
        } else {
            Cell::new(name)
        };
        table.add_row(vec![Cell::new(ip), agent]);
    }

    println!("{table}");
    println!("  {} entries", style(snapshot.len()).bold());
    Ok(())
}
