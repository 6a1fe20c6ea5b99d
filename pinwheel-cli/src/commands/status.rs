//! Status command - current window and participation

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(identifier: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.entry_service.status(identifier.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Draw window:    {}", status.window_date);
    println!("Entries so far: {}", status.window_entry_count);
    println!(
        "Next spin in:   {}",
        output::format_countdown(status.ms_until_next_window)
    );

    match status.has_entered {
        Some(true) => output::success("You're in this window."),
        Some(false) => output::info("You haven't entered yet. 'pw enter <identifier>' to play."),
        None => {}
    }

    Ok(())
}
