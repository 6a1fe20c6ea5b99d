//! Duplicates command - list LocalUsers sharing one ledger account

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let groups = ctx.reconcile_service.find_duplicates()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        output::success("No duplicate accounts found.");
        return Ok(());
    }

    output::warning(&format!("{} account(s) with duplicate users:", groups.len()));
    for group in &groups {
        println!();
        println!("Account {}", group.account_ref);

        let mut table = output::create_table();
        table.set_header(vec!["User ID", "Display name", "Email", "Created"]);
        for user in &group.users {
            table.add_row(vec![
                user.user_id.to_string(),
                user.display_name.clone().unwrap_or_default(),
                user.primary_email.clone().unwrap_or_default(),
                user.created_at.format("%Y-%m-%d").to_string(),
            ]);
        }
        println!("{}", table);
    }

    output::info("Resolve with 'pw merge <keep-id> <delete-id>' or 'pw merge --all'.");
    Ok(())
}
