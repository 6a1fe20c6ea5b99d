//! LocalUser domain model
//!
//! The application's own identity record, distinct from the external ledger
//! account. In steady state at most one LocalUser holds a given account_ref;
//! violations are "duplicates" and the reconcile service exists to detect
//! and merge them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A portal user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub primary_email: Option<String>,
    /// Link to the external ledger account, if claimed
    pub account_ref: Option<String>,
    pub shipping_name: Option<String>,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUser {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            display_name: None,
            primary_email: None,
            account_ref: None,
            shipping_name: None,
            shipping_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ranking score for auto-merge: a user with an email is worth keeping
    /// over one with merely more credentials.
    ///
    /// score = credential_count + (has_email ? 10 : 0) + (has_display_name ? 1 : 0)
    pub fn merge_score(&self, credential_count: i64) -> i64 {
        let mut score = credential_count;
        if self.primary_email.is_some() {
            score += 10;
        }
        if self.display_name.is_some() {
            score += 1;
        }
        score
    }
}
