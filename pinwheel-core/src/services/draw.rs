//! Draw service - executes the daily Pin Wheel draw
//!
//! One result per window, ever. The pre-check catches the common case of a
//! duplicate trigger; the winners table primary key catches the rare one
//! where a scheduled and a manual trigger land at the same moment.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::adapters::duckdb::{DuckDbRepository, RecordDrawOutcome};
use crate::domain::result::{Error, Result};
use crate::domain::{Prize, Winner};
use crate::ports::Notifier;

/// Outcome of a draw invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DrawOutcome {
    Drawn(Winner),
    /// Nobody entered this window; nothing was written
    NoEntries,
    /// A result already exists for this window
    AlreadyDrawn,
}

/// Draw service for the daily prize wheel
pub struct DrawService {
    repository: Arc<DuckDbRepository>,
    notifier: Arc<dyn Notifier>,
    prizes: Vec<Prize>,
}

impl DrawService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        notifier: Arc<dyn Notifier>,
        prizes: Vec<Prize>,
    ) -> Self {
        Self {
            repository,
            notifier,
            prizes,
        }
    }

    /// Run the draw for a window with the thread RNG
    pub fn run_draw(&self, window: NaiveDate) -> Result<DrawOutcome> {
        self.run_draw_with_rng(window, &mut rand::thread_rng())
    }

    /// Run the draw with an injected RNG so tests can be deterministic.
    ///
    /// Winner and prize are independent uniform picks. The winner is drawn
    /// over entry ROWS, not distinct accounts: if storage was bypassed and
    /// holds duplicate rows for one account, each row still counts as one
    /// slot.
    pub fn run_draw_with_rng<R: Rng>(&self, window: NaiveDate, rng: &mut R) -> Result<DrawOutcome> {
        if self.prizes.is_empty() {
            return Err(Error::Config("prize catalog is empty".to_string()));
        }

        // Idempotency guard against duplicate scheduler firings
        if self.repository.get_winner(window)?.is_some() {
            return Ok(DrawOutcome::AlreadyDrawn);
        }

        let entries = self.repository.entries_for_window(window)?;
        if entries.is_empty() {
            return Ok(DrawOutcome::NoEntries);
        }

        let winning_entry = &entries[rng.gen_range(0..entries.len())];
        let prize = &self.prizes[rng.gen_range(0..self.prizes.len())];

        let mut winner = Winner::new(window, &winning_entry.account_ref, &prize.id, &prize.name);
        winner.shipping_address = self.resolve_shipping_address(&winning_entry.account_ref)?;

        // The window_date primary key is the real guard: if another trigger
        // won the race between our pre-check and this insert, report
        // AlreadyDrawn and leave its result alone.
        match self.repository.record_winner(&winner)? {
            RecordDrawOutcome::AlreadyDrawn => return Ok(DrawOutcome::AlreadyDrawn),
            RecordDrawOutcome::Recorded => {}
        }

        // Best-effort announcement; a dead webhook never fails the draw
        let message = format!(
            "The Pin Wheel has spoken! {} wins a {} for {}",
            winner.account_ref,
            winner.prize_name,
            window.format("%Y-%m-%d"),
        );
        if let Err(e) = self.notifier.announce(&message) {
            eprintln!("[pinwheel] winner announcement failed: {}", e);
        }

        Ok(DrawOutcome::Drawn(winner))
    }

    /// Shipping address from whichever LocalUser holds the winning account
    fn resolve_shipping_address(&self, account_ref: &str) -> Result<Option<String>> {
        let users = self.repository.users_by_account_ref(account_ref)?;
        Ok(users.into_iter().find_map(|u| u.shipping_address))
    }

    /// Look up an existing result
    pub fn winner_for(&self, window: NaiveDate) -> Result<Option<Winner>> {
        Ok(self.repository.get_winner(window)?)
    }

    /// All recorded results, newest first
    pub fn winners(&self) -> Result<Vec<Winner>> {
        Ok(self.repository.get_winners()?)
    }
}
