//! Admin authorization policy
//!
//! The allow-list of principals (emails or wallet addresses) comes from
//! configuration, resolved once at startup. Capability checks happen at
//! the command surface; identity and entry logic never consult this.

use std::collections::HashSet;

/// Injected admin allow-list
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    principals: HashSet<String>,
}

impl AdminPolicy {
    /// Build from configured principal identifiers. Emails compare
    /// case-insensitively; wallet addresses are kept verbatim.
    pub fn new(principals: &[String]) -> Self {
        let principals = principals
            .iter()
            .map(|p| normalize_principal(p))
            .filter(|p| !p.is_empty())
            .collect();
        Self { principals }
    }

    /// Whether a principal may run privileged operations (manual draw,
    /// merge). An empty allow-list means a single-operator install where
    /// everything is permitted.
    pub fn is_authorized(&self, principal: &str) -> bool {
        if self.principals.is_empty() {
            return true;
        }
        self.principals.contains(&normalize_principal(principal))
    }

    pub fn is_open(&self) -> bool {
        self.principals.is_empty()
    }
}

fn normalize_principal(principal: &str) -> String {
    let trimmed = principal.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}
