//! Setup command - configure the ledger endpoint and portal settings

use anyhow::Result;
use pinwheel_core::config::Config;

use super::get_pinwheel_dir;
use crate::output;

pub fn run(
    ledger_url: Option<String>,
    api_key: Option<String>,
    webhook_url: Option<String>,
    entry_cost: Option<i64>,
    admins: Vec<String>,
) -> Result<()> {
    let pinwheel_dir = get_pinwheel_dir();
    std::fs::create_dir_all(&pinwheel_dir)?;

    let mut config = Config::load(&pinwheel_dir)?;

    if let Some(url) = ledger_url {
        config.ledger_base_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(key) = api_key {
        config.ledger_api_key = key;
    }
    if let Some(url) = webhook_url {
        config.webhook_url = Some(url);
    }
    if let Some(cost) = entry_cost {
        if cost <= 0 {
            anyhow::bail!("Entry cost must be a positive number of GRIT");
        }
        config.entry_cost = cost;
    }
    if !admins.is_empty() {
        config.admin_principals = admins;
    }

    config.save(&pinwheel_dir)?;

    output::success("Settings saved.");
    match &config.ledger_base_url {
        Some(url) => println!("  Ledger:     {}", url),
        None => output::warning("  Ledger:     not configured (most commands need it)"),
    }
    println!(
        "  Webhook:    {}",
        config.webhook_url.as_deref().unwrap_or("none")
    );
    println!("  Entry cost: {} GRIT", config.entry_cost);
    if config.admin_principals.is_empty() {
        println!("  Admins:     unrestricted (single-operator install)");
    } else {
        println!("  Admins:     {}", config.admin_principals.join(", "));
    }
    Ok(())
}
