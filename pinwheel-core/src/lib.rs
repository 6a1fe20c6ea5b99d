//! Pinwheel Core - business logic for the Pin Wheel rewards portal
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (LedgerAccount, LocalUser, Entry, Winner)
//! - **ports**: Trait definitions for external dependencies (PointsLedger, Notifier)
//! - **services**: Business logic orchestration (entries, draws, reconciliation)
//! - **adapters**: Concrete implementations (DuckDB, gritd HTTP client, webhook)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::gritd::GritdLedger;
use adapters::webhook::WebhookNotifier;
use config::Config;
use domain::window::{Clock, SystemClock};
use ports::{Notifier, NullNotifier, PointsLedger};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{Credential, CredentialKind, Entry, LedgerAccount, LocalUser, Prize, Winner};

/// Main context for Pinwheel operations
///
/// This is the primary entry point for all business logic. It holds the
/// database connection, configuration, and all services wired against the
/// configured ledger and webhook.
pub struct PinwheelContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub admin_policy: AdminPolicy,
    pub identity_service: IdentityService,
    pub entry_service: EntryService,
    pub draw_service: DrawService,
    pub auto_entry_service: AutoEntryService,
    pub reconcile_service: ReconcileService,
}

impl PinwheelContext {
    /// Create a context against the configured gritd deployment.
    ///
    /// Fails if the ledger endpoint is not configured yet — `pw setup`
    /// writes it without needing a context.
    pub fn new(pinwheel_dir: &Path) -> Result<Self> {
        let config = Config::load(pinwheel_dir)?;

        let base_url = config.ledger_base_url.clone().context(
            "Points ledger not configured. Run 'pw setup --ledger-url <URL>' first.",
        )?;
        let ledger: Arc<dyn PointsLedger> =
            Arc::new(GritdLedger::new(&config.ledger_api_key, &base_url)?);

        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
            None => Arc::new(NullNotifier),
        };

        Self::with_collaborators(pinwheel_dir, config, ledger, notifier, Arc::new(SystemClock))
    }

    /// Wire a context from explicit collaborators. Tests use this to pin
    /// the clock or inject a mock ledger directly.
    pub fn with_collaborators(
        pinwheel_dir: &Path,
        config: Config,
        ledger: Arc<dyn PointsLedger>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let db_path = pinwheel_dir.join("pinwheel.duckdb");
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        let admin_policy = AdminPolicy::new(&config.admin_principals);
        let identity_service = IdentityService::new(ledger.clone());
        let entry_service = EntryService::new(
            repository.clone(),
            ledger.clone(),
            clock.clone(),
            config.entry_cost,
        );
        let draw_service = DrawService::new(repository.clone(), notifier, config.prizes.clone());
        let auto_entry_service = AutoEntryService::new(
            repository.clone(),
            ledger.clone(),
            clock,
            config.entry_cost,
        );
        let reconcile_service = ReconcileService::new(repository.clone(), ledger);

        Ok(Self {
            config,
            repository,
            admin_policy,
            identity_service,
            entry_service,
            draw_service,
            auto_entry_service,
            reconcile_service,
        })
    }
}
