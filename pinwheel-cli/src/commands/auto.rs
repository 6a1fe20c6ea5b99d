//! Auto-entry commands - opt in/out and run the scheduled batch

use anyhow::{bail, Result};
use pinwheel_core::services::{BatchStatus, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn set(identifier: &str, enabled: bool) -> Result<()> {
    let ctx = get_context()?;

    // Opt-ins are stored under the canonical account, never the raw handle
    let account = match ctx.identity_service.resolve(identifier, None)? {
        Some(account) => account,
        None => bail!("No GRIT account found for '{}'", identifier),
    };

    ctx.auto_entry_service
        .set_auto_entry(&account.account_id, enabled)?;

    if enabled {
        output::success(&format!(
            "Auto-entry on for {}. Each day's entry costs {} GRIT.",
            account.account_id,
            ctx.entry_service.entry_cost()
        ));
    } else {
        output::success(&format!("Auto-entry off for {}.", account.account_id));
    }
    Ok(())
}

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let report = ctx.auto_entry_service.run_batch()?;
    log_event(
        &logger,
        LogEvent::new("auto_entry_batch").with_command("auto run"),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Processed {} account(s): {} entered, {} skipped, {} failed",
        report.processed, report.succeeded, report.skipped, report.failed
    );

    if !report.results.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Account", "Status", "Detail"]);
        for result in &report.results {
            let status = match result.status {
                BatchStatus::Succeeded => "entered",
                BatchStatus::Skipped => "skipped",
                BatchStatus::Failed => "failed",
            };
            table.add_row(vec![
                result.account_ref.clone(),
                status.to_string(),
                result.reason.clone(),
            ]);
        }
        println!("{}", table);
    }

    if report.failed > 0 {
        output::warning("Some accounts failed; they will be retried on the next run.");
    }
    Ok(())
}
