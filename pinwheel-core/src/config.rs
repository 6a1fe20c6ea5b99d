//! Configuration management
//!
//! settings.json in the pinwheel directory:
//! ```json
//! {
//!   "ledger": { "baseUrl": "https://grit.example.com", "apiKey": "..." },
//!   "webhookUrl": "https://discord.com/api/webhooks/...",
//!   "entryCost": 10,
//!   "adminPrincipals": ["ops@example.com"],
//!   "prizes": [{ "id": "tee", "name": "Pin Wheel Tee" }]
//! }
//! ```
//! Environment variables override the ledger endpoint for CI and staging.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::prize;
use crate::domain::Prize;

/// Cost of one Pin Wheel entry, in GRIT
pub const DEFAULT_ENTRY_COST: i64 = 10;

/// Env override for the ledger endpoint (CI, staging, mock servers)
pub const LEDGER_URL_ENV: &str = "PINWHEEL_LEDGER_URL";
/// Env override for the ledger API key
pub const LEDGER_KEY_ENV: &str = "PINWHEEL_LEDGER_KEY";
/// Env override for the announcement webhook
pub const WEBHOOK_URL_ENV: &str = "PINWHEEL_WEBHOOK_URL";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    entry_cost: Option<i64>,
    #[serde(default)]
    admin_principals: Vec<String>,
    #[serde(default)]
    prizes: Option<Vec<Prize>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

/// Pinwheel configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_base_url: Option<String>,
    pub ledger_api_key: String,
    pub webhook_url: Option<String>,
    pub entry_cost: i64,
    pub admin_principals: Vec<String>,
    pub prizes: Vec<Prize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_base_url: None,
            ledger_api_key: String::new(),
            webhook_url: None,
            entry_cost: DEFAULT_ENTRY_COST,
            admin_principals: Vec::new(),
            prizes: prize::default_catalog(),
        }
    }
}

impl Config {
    /// Load config from the pinwheel directory, applying env overrides.
    pub fn load(pinwheel_dir: &Path) -> Result<Self> {
        let settings_path = pinwheel_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let ledger_base_url = std::env::var(LEDGER_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.ledger.base_url);
        let ledger_api_key = std::env::var(LEDGER_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.ledger.api_key)
            .unwrap_or_default();
        let webhook_url = std::env::var(WEBHOOK_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.webhook_url);

        Ok(Self {
            ledger_base_url,
            ledger_api_key,
            webhook_url,
            entry_cost: raw.entry_cost.unwrap_or(DEFAULT_ENTRY_COST),
            admin_principals: raw.admin_principals,
            prizes: raw.prizes.unwrap_or_else(prize::default_catalog),
        })
    }

    /// Save config to the pinwheel directory.
    pub fn save(&self, pinwheel_dir: &Path) -> Result<()> {
        let settings_path = pinwheel_dir.join("settings.json");

        let settings = SettingsFile {
            ledger: LedgerSettings {
                base_url: self.ledger_base_url.clone(),
                api_key: if self.ledger_api_key.is_empty() {
                    None
                } else {
                    Some(self.ledger_api_key.clone())
                },
            },
            webhook_url: self.webhook_url.clone(),
            entry_cost: Some(self.entry_cost),
            admin_principals: self.admin_principals.clone(),
            prizes: Some(self.prizes.clone()),
        };

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
