//! Draw commands - run the daily draw, show past results

use anyhow::{bail, Result};
use chrono::NaiveDate;
use pinwheel_core::services::{DrawOutcome, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

fn parse_window(window: Option<&str>) -> Result<NaiveDate> {
    match window {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("Invalid window date '{}', expected YYYY-MM-DD", s)),
        None => Ok(pinwheel_core::domain::window::for_timestamp(
            chrono::Utc::now(),
        )),
    }
}

pub fn run(window: Option<String>, principal: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    // Manual triggers are privileged; the scheduler passes its own
    // principal through the same gate
    if !ctx.admin_policy.is_open() {
        match principal {
            Some(p) if ctx.admin_policy.is_authorized(&p) => {}
            Some(p) => bail!("'{}' is not authorized to run draws", p),
            None => bail!("This install restricts draws; pass --as <principal>"),
        }
    }

    let window = parse_window(window.as_deref())?;
    let outcome = ctx.draw_service.run_draw(window)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        DrawOutcome::Drawn(winner) => {
            output::success(&format!(
                "Winner for {}: {} ({})",
                winner.window_date, winner.account_ref, winner.prize_name
            ));
            if winner.shipping_address.is_none() {
                output::warning("No shipping address on file for the winner yet.");
            }
            log_event(
                &logger,
                LogEvent::new("draw_completed")
                    .with_command("draw run")
                    .with_window(winner.window_date.to_string())
                    .with_account(winner.account_ref.clone()),
            );
        }
        DrawOutcome::NoEntries => {
            output::warning(&format!("No entries for {}; nothing drawn.", window));
        }
        DrawOutcome::AlreadyDrawn => {
            output::warning(&format!(
                "A result already exists for {}. Use 'pw draw show' to see it.",
                window
            ));
        }
    }

    Ok(())
}

pub fn show(window: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if let Some(window) = window {
        let window = parse_window(Some(&window))?;
        let winner = ctx.draw_service.winner_for(window)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&winner)?);
            return Ok(());
        }

        match winner {
            Some(winner) => print_winners(&[winner]),
            None => output::info(&format!("No result recorded for {}.", window)),
        }
        return Ok(());
    }

    let winners = ctx.draw_service.winners()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&winners)?);
        return Ok(());
    }

    if winners.is_empty() {
        output::info("No draws recorded yet.");
    } else {
        print_winners(&winners);
    }
    Ok(())
}

pub fn ship(window: &str) -> Result<()> {
    let ctx = get_context()?;
    let window = parse_window(Some(window))?;

    match ctx.draw_service.winner_for(window)? {
        Some(winner) if winner.shipped => {
            output::info(&format!("{} was already marked shipped.", window));
        }
        Some(_) => {
            ctx.repository.mark_shipped(window)?;
            output::success(&format!("Marked {} as shipped.", window));
        }
        None => bail!("No result recorded for {}", window),
    }
    Ok(())
}

fn print_winners(winners: &[pinwheel_core::Winner]) {
    let mut table = output::create_table();
    table.set_header(vec!["Window", "Winner", "Prize", "Shipped"]);
    for winner in winners {
        table.add_row(vec![
            winner.window_date.to_string(),
            winner.account_ref.clone(),
            winner.prize_name.clone(),
            if winner.shipped { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{}", table);
}
