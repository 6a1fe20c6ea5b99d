//! Logs command - inspect the event log

use anyhow::{Context, Result};
use pinwheel_core::services::{EntryPoint, LoggingService};

use super::get_pinwheel_dir;
use crate::output;

pub fn run(errors_only: bool, limit: usize, json: bool) -> Result<()> {
    let pinwheel_dir = get_pinwheel_dir();
    let logger = LoggingService::new(&pinwheel_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .context("Failed to open the event log")?;

    let entries = if errors_only {
        logger.get_errors(limit)?
    } else {
        logger.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::info("No events recorded.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Source", "Event", "Detail"]);
    for entry in &entries {
        let time = chrono::DateTime::from_timestamp_millis(entry.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.timestamp.to_string());
        let detail = entry
            .error_message
            .clone()
            .or_else(|| entry.window_date.clone())
            .or_else(|| entry.command.clone())
            .unwrap_or_default();
        table.add_row(vec![
            time,
            entry.entry_point.clone(),
            entry.event.clone(),
            detail,
        ]);
    }
    println!("{}", table);
    Ok(())
}
