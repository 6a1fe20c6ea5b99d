//! Identity service - resolves user-supplied identifiers to ledger accounts
//!
//! Every operation that touches points or entries goes through here first,
//! so the rest of the core only ever sees canonical account references.
//! Resolution is side-effect free: it never creates accounts or
//! credentials, and `Ok(None)` means "not onboarded", not an error.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::result::Result;
use crate::domain::{CredentialKind, LedgerAccount};
use crate::ports::PointsLedger;

/// Caller-supplied hint that skips identifier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierHint {
    Wallet,
    AccountId,
}

/// Wallet addresses are base58, 32-44 characters (no 0, O, I, l)
fn wallet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap())
}

/// True if the identifier is shaped like a chain address
pub fn looks_like_wallet(identifier: &str) -> bool {
    wallet_regex().is_match(identifier.trim())
}

/// Identity resolver over the external points ledger
pub struct IdentityService {
    ledger: Arc<dyn PointsLedger>,
}

impl IdentityService {
    pub fn new(ledger: Arc<dyn PointsLedger>) -> Self {
        Self { ledger }
    }

    /// Resolve an identifier to a canonical ledger account.
    ///
    /// Without a hint, a wallet-shaped identifier is looked up as a wallet
    /// credential; anything else is treated as an opaque account reference.
    pub fn resolve(
        &self,
        identifier: &str,
        hint: Option<IdentifierHint>,
    ) -> Result<Option<LedgerAccount>> {
        let identifier = identifier.trim();

        let as_wallet = match hint {
            Some(IdentifierHint::Wallet) => true,
            Some(IdentifierHint::AccountId) => false,
            None => looks_like_wallet(identifier),
        };

        if as_wallet {
            self.ledger
                .find_account_by_credential(CredentialKind::Wallet, identifier)
        } else {
            self.ledger.find_account_by_id(identifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;
    use std::sync::Mutex;

    /// Ledger stub that records which lookup path was taken
    struct RecordingLedger {
        calls: Mutex<Vec<String>>,
        account: Option<LedgerAccount>,
    }

    impl RecordingLedger {
        fn returning(account: Option<LedgerAccount>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                account,
            }
        }
    }

    impl PointsLedger for RecordingLedger {
        fn find_account_by_credential(
            &self,
            kind: CredentialKind,
            value: &str,
        ) -> Result<Option<LedgerAccount>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("credential:{}:{}", kind, value));
            Ok(self.account.clone())
        }

        fn find_account_by_id(&self, account_ref: &str) -> Result<Option<LedgerAccount>> {
            self.calls.lock().unwrap().push(format!("id:{}", account_ref));
            Ok(self.account.clone())
        }

        fn adjust_balance(
            &self,
            _account_ref: &str,
            _delta: i64,
            _memo: &str,
        ) -> Result<crate::ports::BalanceAdjustment> {
            Err(Error::Other("not used".to_string()))
        }

        fn link_credential_to_account(
            &self,
            _kind: CredentialKind,
            _value: &str,
            _account_ref: &str,
        ) -> Result<()> {
            Ok(())
        }
    }

    const WALLET: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    #[test]
    fn test_wallet_shape_detection() {
        assert!(looks_like_wallet(WALLET));
        assert!(!looks_like_wallet("acct_1"));
        assert!(!looks_like_wallet("a@b.com"));
        // Base58 forbids 0, O, I, l
        assert!(!looks_like_wallet("0xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
        // Too short
        assert!(!looks_like_wallet("9xQeWvG816bUx9EPjHmaT"));
    }

    #[test]
    fn test_wallet_shaped_identifier_takes_credential_path() {
        let ledger = Arc::new(RecordingLedger::returning(Some(LedgerAccount::new(
            "acct_1", 50,
        ))));
        let service = IdentityService::new(ledger.clone());

        let resolved = service.resolve(WALLET, None).unwrap().unwrap();
        assert_eq!(resolved.account_id, "acct_1");

        let calls = ledger.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("credential:wallet:"));
    }

    #[test]
    fn test_opaque_identifier_takes_id_path() {
        let ledger = Arc::new(RecordingLedger::returning(Some(LedgerAccount::new(
            "acct_1", 50,
        ))));
        let service = IdentityService::new(ledger.clone());

        service.resolve("acct_1", None).unwrap();

        let calls = ledger.calls.lock().unwrap();
        assert_eq!(calls[0], "id:acct_1");
    }

    #[test]
    fn test_hint_overrides_classification() {
        let ledger = Arc::new(RecordingLedger::returning(None));
        let service = IdentityService::new(ledger.clone());

        // An identifier that is not wallet-shaped, forced down the wallet path
        service
            .resolve("short-handle", Some(IdentifierHint::Wallet))
            .unwrap();

        let calls = ledger.calls.lock().unwrap();
        assert!(calls[0].starts_with("credential:wallet:"));
    }

    #[test]
    fn test_unresolved_is_none_not_error() {
        let ledger = Arc::new(RecordingLedger::returning(None));
        let service = IdentityService::new(ledger);

        let resolved = service.resolve("acct_unknown", None).unwrap();
        assert!(resolved.is_none());
    }
}
