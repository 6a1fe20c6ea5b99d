//! Draw result domain model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of one draw window. At most one row per window_date.
///
/// Prize id and name are snapshotted here so the record survives catalog
/// changes. `shipped` is toggled later by the fulfillment workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub window_date: NaiveDate,
    pub account_ref: String,
    pub prize_id: String,
    pub prize_name: String,
    pub shipped: bool,
    /// Resolved from the LocalUser holding the winning account_ref, if any
    pub shipping_address: Option<String>,
    pub drawn_at: DateTime<Utc>,
}

impl Winner {
    pub fn new(
        window_date: NaiveDate,
        account_ref: impl Into<String>,
        prize_id: impl Into<String>,
        prize_name: impl Into<String>,
    ) -> Self {
        Self {
            window_date,
            account_ref: account_ref.into(),
            prize_id: prize_id.into(),
            prize_name: prize_name.into(),
            shipped: false,
            shipping_address: None,
            drawn_at: Utc::now(),
        }
    }
}
