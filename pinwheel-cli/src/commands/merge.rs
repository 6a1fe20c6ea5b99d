//! Merge commands - fold duplicate users into one record

use anyhow::{bail, Result};
use dialoguer::Confirm;
use uuid::Uuid;

use pinwheel_core::services::{LogEvent, MergeReport};
use pinwheel_core::PinwheelContext;

use super::{get_context, get_logger, log_event};
use crate::output;

fn check_authorized(ctx: &PinwheelContext, principal: Option<&str>) -> Result<()> {
    if ctx.admin_policy.is_open() {
        return Ok(());
    }
    match principal {
        Some(p) if ctx.admin_policy.is_authorized(p) => Ok(()),
        Some(p) => bail!("'{}' is not authorized to merge users", p),
        None => bail!("This install restricts merges; pass --as <principal>"),
    }
}

fn print_report(report: &MergeReport) {
    output::success(&format!(
        "Merged {} into {}",
        report.deleted_user_id, report.kept_user_id
    ));
    for line in &report.log {
        println!("  - {}", line);
    }
}

pub fn run(
    keep_id: &str,
    delete_id: &str,
    force: bool,
    principal: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    check_authorized(&ctx, principal.as_deref())?;

    let keep = Uuid::parse_str(keep_id)
        .map_err(|_| anyhow::anyhow!("Invalid keep id '{}', expected a UUID", keep_id))?;
    let delete = Uuid::parse_str(delete_id)
        .map_err(|_| anyhow::anyhow!("Invalid delete id '{}', expected a UUID", delete_id))?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Merge user {} into {} and delete it? This cannot be undone",
                delete, keep
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Merge cancelled.");
            return Ok(());
        }
    }

    let report = ctx.reconcile_service.merge(&keep, &delete)?;
    log_event(&logger, LogEvent::new("users_merged").with_command("merge"));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

pub fn run_all(force: bool, principal: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    check_authorized(&ctx, principal.as_deref())?;

    let groups = ctx.reconcile_service.find_duplicates()?;
    if groups.is_empty() {
        output::success("No duplicate accounts found.");
        return Ok(());
    }

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Auto-merge {} duplicate group(s), keeping the highest-ranked user in each?",
                groups.len()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Merge cancelled.");
            return Ok(());
        }
    }

    let reports = ctx.reconcile_service.merge_all()?;
    log_event(&logger, LogEvent::new("users_merged").with_command("merge --all"));

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        print_report(report);
    }
    output::success(&format!("{} merge(s) completed.", reports.len()));
    Ok(())
}
