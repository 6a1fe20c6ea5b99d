//! External ledger account snapshot
//!
//! GRIT balances live in the external points ledger (gritd), not in local
//! storage. This type is the read-only snapshot the ledger returns; it is
//! never persisted locally and never mutated in place. Balance changes go
//! through `PointsLedger::adjust_balance` exclusively.

use serde::{Deserialize, Serialize};

/// A canonical account in the external points ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Opaque account reference, e.g. "acct_9f2c"
    pub account_id: String,
    /// Current GRIT balance. Whole points only.
    pub points: i64,
    /// Opaque handle required by the ledger to mutate the balance
    pub currency_ref: Option<String>,
}

impl LedgerAccount {
    pub fn new(account_id: impl Into<String>, points: i64) -> Self {
        Self {
            account_id: account_id.into(),
            points,
            currency_ref: None,
        }
    }

    /// True if the account can afford a deduction of `cost` points
    pub fn can_afford(&self, cost: i64) -> bool {
        self.points >= cost
    }
}
