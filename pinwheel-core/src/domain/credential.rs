//! Credential domain model
//!
//! A credential is a (kind, identifier) pair proving a user controls an
//! external handle. The pair is owned by at most one LocalUser at a time;
//! the credentials table primary key enforces it, and the reconcile service
//! checks ownership before every insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of external handles a user can prove ownership of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Wallet,
    Email,
    Discord,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Wallet => "wallet",
            CredentialKind::Email => "email",
            CredentialKind::Discord => "discord",
        }
    }

    /// Parse from the storage / CLI representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wallet" => Some(CredentialKind::Wallet),
            "email" => Some(CredentialKind::Email),
            "discord" => Some(CredentialKind::Discord),
            _ => None,
        }
    }

    /// Normalize an identifier for storage and comparison.
    ///
    /// Emails and Discord handles compare case-insensitively. Wallet
    /// addresses are base58 and case-sensitive, so only whitespace is
    /// trimmed.
    pub fn normalize(&self, identifier: &str) -> String {
        let trimmed = identifier.trim();
        match self {
            CredentialKind::Wallet => trimmed.to_string(),
            CredentialKind::Email | CredentialKind::Discord => trimmed.to_lowercase(),
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proven link between a LocalUser and an external handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub kind: CredentialKind,
    /// Normalized identifier (see [`CredentialKind::normalize`])
    pub identifier: String,
    pub owner_user_id: Uuid,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(kind: CredentialKind, identifier: &str, owner_user_id: Uuid) -> Self {
        Self {
            kind,
            identifier: kind.normalize(identifier),
            owner_user_id,
            verified: true,
            created_at: Utc::now(),
        }
    }
}
