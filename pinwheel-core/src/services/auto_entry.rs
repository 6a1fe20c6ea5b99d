//! Auto-entry service - the scheduled batch variant of the entry flow
//!
//! Runs the same reserve -> charge -> rollback sequence as a manual entry
//! for every opted-in account. Each account is attempted independently so
//! one failure never aborts the batch, and a re-run simply skips accounts
//! that already hold an entry.

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::window::Clock;
use crate::ports::PointsLedger;
use crate::services::entries::{EnterOutcome, EntryService};

/// How one account fared in a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Succeeded,
    /// Expected non-entry: already in, unknown account, or not enough GRIT
    Skipped,
    Failed,
}

/// Per-account outcome in the batch report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntryResult {
    pub account_ref: String,
    pub status: BatchStatus,
    pub reason: String,
}

/// Report for one batch run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<BatchEntryResult>,
}

/// Scheduled auto-entry runner
pub struct AutoEntryService {
    repository: Arc<DuckDbRepository>,
    ledger: Arc<dyn PointsLedger>,
    entries: EntryService,
}

impl AutoEntryService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        ledger: Arc<dyn PointsLedger>,
        clock: Arc<dyn Clock>,
        entry_cost: i64,
    ) -> Self {
        let entries = EntryService::new(
            repository.clone(),
            ledger.clone(),
            clock,
            entry_cost,
        );
        Self {
            repository,
            ledger,
            entries,
        }
    }

    /// Toggle auto-entry for an account ref
    pub fn set_auto_entry(&self, account_ref: &str, enabled: bool) -> Result<()> {
        Ok(self.repository.set_auto_entry(account_ref, enabled)?)
    }

    /// Enter every opted-in account into the current window.
    pub fn run_batch(&self) -> Result<BatchReport> {
        let accounts = self.repository.auto_entry_accounts()?;

        let mut results = Vec::with_capacity(accounts.len());
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for account_ref in &accounts {
            let result = self.attempt(account_ref);
            match result.status {
                BatchStatus::Succeeded => succeeded += 1,
                BatchStatus::Skipped => skipped += 1,
                BatchStatus::Failed => failed += 1,
            }
            results.push(result);
        }

        Ok(BatchReport {
            processed: accounts.len(),
            succeeded,
            failed,
            skipped,
            results,
        })
    }

    /// One account's attempt, with every failure contained to this account
    fn attempt(&self, account_ref: &str) -> BatchEntryResult {
        let account = match self.ledger.find_account_by_id(account_ref) {
            Ok(Some(account)) => account,
            Ok(None) => {
                return BatchEntryResult {
                    account_ref: account_ref.to_string(),
                    status: BatchStatus::Skipped,
                    reason: "account not found in ledger".to_string(),
                };
            }
            Err(e) => {
                return BatchEntryResult {
                    account_ref: account_ref.to_string(),
                    status: BatchStatus::Failed,
                    reason: e.to_string(),
                };
            }
        };

        match self.entries.enter_account(&account, None) {
            Ok(EnterOutcome::Entered { new_balance }) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Succeeded,
                reason: format!("entered, balance now {}", new_balance),
            },
            Ok(EnterOutcome::AlreadyEntered) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Skipped,
                reason: "already entered this window".to_string(),
            },
            // Not enough GRIT is an expected outcome, not an error
            Ok(EnterOutcome::InsufficientBalance) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Skipped,
                reason: "insufficient balance".to_string(),
            },
            Ok(EnterOutcome::AccountNotFound) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Skipped,
                reason: "account not found in ledger".to_string(),
            },
            Ok(EnterOutcome::TransientFailure { detail }) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Failed,
                reason: detail,
            },
            Err(e) => BatchEntryResult {
                account_ref: account_ref.to_string(),
                status: BatchStatus::Failed,
                reason: e.to_string(),
            },
        }
    }
}
