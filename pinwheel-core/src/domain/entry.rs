//! Raffle entry domain model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A claim on a slot in one draw window.
///
/// Keyed by (account_ref, window_date) — the canonical external account,
/// never the LocalUser id. Entries are written once and never mutated; the
/// only deletion path is the entry service rolling back a reservation whose
/// charge failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub account_ref: String,
    pub window_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(account_ref: impl Into<String>, window_date: NaiveDate) -> Self {
        Self {
            account_ref: account_ref.into(),
            window_date,
            created_at: Utc::now(),
        }
    }
}
