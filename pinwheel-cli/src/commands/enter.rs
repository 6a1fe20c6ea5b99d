//! Enter command - spend GRIT on a Pin Wheel entry

use anyhow::Result;
use pinwheel_core::services::{EnterOutcome, IdentifierHint, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(identifier: &str, wallet: bool, account: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let hint = if wallet {
        Some(IdentifierHint::Wallet)
    } else if account {
        Some(IdentifierHint::AccountId)
    } else {
        None
    };

    let outcome = ctx.entry_service.enter(identifier, hint)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        EnterOutcome::Entered { new_balance } => {
            output::success("You're in! Good luck at the next spin.");
            println!("  GRIT balance: {}", new_balance);
            log_event(&logger, LogEvent::new("entry_recorded").with_command("enter"));
        }
        EnterOutcome::AlreadyEntered => {
            output::warning("Already entered for this window. One entry per day.");
        }
        EnterOutcome::AccountNotFound => {
            output::error("No GRIT account found for that identifier.");
            output::info("Earn GRIT first, or link a credential with 'pw link'.");
        }
        EnterOutcome::InsufficientBalance => {
            output::error(&format!(
                "Not enough GRIT. An entry costs {}.",
                ctx.entry_service.entry_cost()
            ));
        }
        EnterOutcome::TransientFailure { detail } => {
            output::error("The points ledger is unavailable. Your GRIT was not charged.");
            output::info(&format!("Try again in a moment. ({})", detail));
            log_event(
                &logger,
                LogEvent::new("entry_failed")
                    .with_command("enter")
                    .with_error(detail.clone()),
            );
        }
    }

    Ok(())
}
