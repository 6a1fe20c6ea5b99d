//! Entry service - orchestrates raffle entry attempts
//!
//! The ordered algorithm is the correctness mechanism and must not be
//! reordered: resolve -> window -> fast-path check -> balance pre-check ->
//! reserve -> charge -> release on charge failure. Reserving the entry
//! slot BEFORE charging closes the race where two concurrent attempts for
//! the same account both pass the pre-checks; the slot's primary key makes
//! exactly one of them the payer.

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::{DuckDbRepository, ReserveOutcome};
use crate::domain::result::Result;
use crate::domain::window::{self, Clock};
use crate::domain::LedgerAccount;
use crate::ports::PointsLedger;
use crate::services::identity::{IdentifierHint, IdentityService};

/// Outcome of one entry attempt.
///
/// Everything except `TransientFailure` is a terminal answer; a transient
/// failure may be retried because the failed reservation was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum EnterOutcome {
    #[serde(rename_all = "camelCase")]
    Entered { new_balance: i64 },
    AlreadyEntered,
    AccountNotFound,
    InsufficientBalance,
    TransientFailure { detail: String },
}

/// Snapshot of the current window for status displays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStatus {
    pub window_date: String,
    pub window_entry_count: i64,
    /// None when no identifier was supplied
    pub has_entered: Option<bool>,
    pub ms_until_next_window: i64,
}

/// Entry service for the daily Pin Wheel
pub struct EntryService {
    repository: Arc<DuckDbRepository>,
    identity: IdentityService,
    ledger: Arc<dyn PointsLedger>,
    clock: Arc<dyn Clock>,
    entry_cost: i64,
}

impl EntryService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        ledger: Arc<dyn PointsLedger>,
        clock: Arc<dyn Clock>,
        entry_cost: i64,
    ) -> Self {
        Self {
            repository,
            identity: IdentityService::new(ledger.clone()),
            ledger,
            clock,
            entry_cost,
        }
    }

    pub fn entry_cost(&self) -> i64 {
        self.entry_cost
    }

    /// Attempt to enter the current draw window.
    pub fn enter(&self, identifier: &str, hint: Option<IdentifierHint>) -> Result<EnterOutcome> {
        let account = match self.identity.resolve(identifier, hint)? {
            Some(account) => account,
            None => return Ok(EnterOutcome::AccountNotFound),
        };

        self.enter_account(&account, Some(identifier))
    }

    /// The reserve -> charge -> rollback core, shared with the auto-entry
    /// batch (which has already resolved its accounts).
    ///
    /// `raw_identifier` widens the fast-path duplicate check to cover
    /// historical rows recorded before canonicalization; new rows are
    /// always written under the canonical account id.
    pub fn enter_account(
        &self,
        account: &LedgerAccount,
        raw_identifier: Option<&str>,
    ) -> Result<EnterOutcome> {
        let window = window::for_timestamp(self.clock.now());

        // Fast-path rejection. Not load-bearing: the reserve below is what
        // actually guarantees uniqueness.
        let mut refs: Vec<&str> = vec![account.account_id.as_str()];
        if let Some(raw) = raw_identifier {
            if raw != account.account_id {
                refs.push(raw);
            }
        }
        if self.repository.has_entry(&refs, window)? {
            return Ok(EnterOutcome::AlreadyEntered);
        }

        // Balance pre-check. No mutation yet, so failing here is free.
        if !account.can_afford(self.entry_cost) {
            return Ok(EnterOutcome::InsufficientBalance);
        }

        // Claim the slot first. A conflict here is the concurrent attempt
        // the fast-path missed.
        match self.repository.reserve_entry(&account.account_id, window)? {
            ReserveOutcome::AlreadyReserved => return Ok(EnterOutcome::AlreadyEntered),
            ReserveOutcome::Reserved => {}
        }

        // Charge. On any failure (including timeout) undo the reservation
        // so no entry survives without a confirmed charge.
        let memo = format!("Pin Wheel entry {}", window.format("%Y-%m-%d"));
        match self
            .ledger
            .adjust_balance(&account.account_id, -self.entry_cost, &memo)
        {
            Ok(adjustment) => Ok(EnterOutcome::Entered {
                new_balance: adjustment.new_balance,
            }),
            Err(charge_err) => {
                self.repository.release_entry(&account.account_id, window)?;
                Ok(EnterOutcome::TransientFailure {
                    detail: charge_err.to_string(),
                })
            }
        }
    }

    /// Current-window status, optionally for one identifier.
    pub fn status(&self, identifier: Option<&str>) -> Result<EntryStatus> {
        let now = self.clock.now();
        let window = window::for_timestamp(now);
        let window_entry_count = self.repository.count_entries_in_window(window)?;

        let has_entered = match identifier {
            None => None,
            Some(identifier) => match self.identity.resolve(identifier, None)? {
                None => Some(false),
                Some(account) => {
                    let mut refs: Vec<&str> = vec![account.account_id.as_str()];
                    if identifier != account.account_id {
                        refs.push(identifier);
                    }
                    Some(self.repository.has_entry(&refs, window)?)
                }
            },
        };

        Ok(EntryStatus {
            window_date: window.format("%Y-%m-%d").to_string(),
            window_entry_count,
            has_entered,
            ms_until_next_window: window::ms_until_next_boundary(now),
        })
    }
}
