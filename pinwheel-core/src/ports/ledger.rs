//! Points ledger port
//!
//! The GRIT balance service is external; this trait is everything the core
//! needs from it. Lookups are side-effect free. `adjust_balance` is the
//! ONLY way a balance changes — the core never computes balances by
//! reading-then-writing locally, so the ledger's own atomicity is the
//! source of truth.

use crate::domain::result::Result;
use crate::domain::{CredentialKind, LedgerAccount};

/// Confirmed balance change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub new_balance: i64,
}

/// External points ledger abstraction
///
/// Implementations must surface transient transport failures as
/// `Error::Ledger` so callers can run their rollback paths and report
/// retryable outcomes.
pub trait PointsLedger: Send + Sync {
    /// Look up the account that owns a credential. `Ok(None)` means the
    /// credential is not onboarded — not an error.
    fn find_account_by_credential(
        &self,
        kind: CredentialKind,
        value: &str,
    ) -> Result<Option<LedgerAccount>>;

    /// Look up an account by its opaque reference
    fn find_account_by_id(&self, account_ref: &str) -> Result<Option<LedgerAccount>>;

    /// Atomically adjust a balance by `delta` (negative = charge).
    /// The memo lands in the ledger's own audit trail.
    fn adjust_balance(
        &self,
        account_ref: &str,
        delta: i64,
        memo: &str,
    ) -> Result<BalanceAdjustment>;

    /// Tell the ledger a credential now belongs to an account, so points
    /// accrued under the bare credential fold into it. Best-effort at the
    /// call site: callers log failures and keep going.
    fn link_credential_to_account(
        &self,
        kind: CredentialKind,
        value: &str,
        account_ref: &str,
    ) -> Result<()>;
}
