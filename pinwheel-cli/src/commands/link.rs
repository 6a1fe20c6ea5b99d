//! Link command - attach a credential to a local user

use anyhow::{bail, Result};
use uuid::Uuid;

use pinwheel_core::services::LinkOutcome;
use pinwheel_core::CredentialKind;

use super::get_context;
use crate::output;

pub fn run(user_id: &str, kind: &str, value: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let user_id = Uuid::parse_str(user_id)
        .map_err(|_| anyhow::anyhow!("Invalid user id '{}', expected a UUID", user_id))?;
    let Some(kind) = CredentialKind::parse(kind) else {
        bail!("Unknown credential kind '{}'. Use wallet, email, or discord.", kind);
    };

    let outcome = ctx.reconcile_service.link_credential(&user_id, kind, value)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        LinkOutcome::Linked { adopted_account } => {
            output::success(&format!("Linked {} {} to {}", kind, value, user_id));
            if let Some(account) = adopted_account {
                output::info(&format!(
                    "Adopted ledger account {} (it had GRIT waiting).",
                    account
                ));
            }
        }
        LinkOutcome::AlreadyLinkedToSelf => {
            output::info("That credential is already linked to this user.");
        }
        LinkOutcome::AlreadyLinkedToOther => {
            output::error("That credential belongs to another user.");
            output::info("If both records are the same person, use 'pw duplicates' and 'pw merge'.");
        }
    }

    Ok(())
}
