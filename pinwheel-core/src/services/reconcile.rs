//! Reconcile service - credential linking, duplicate detection, and merge
//!
//! Identity resolution is imperfect: one person can reach the portal as a
//! wallet user and again as a Discord user, ending up with two LocalUsers
//! pointing at one ledger account. This service links credentials safely,
//! finds those duplicates, and folds them back into a single record.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::{CredentialInsert, DuckDbRepository};
use crate::domain::result::{Error, Result};
use crate::domain::{Credential, CredentialKind, LocalUser};
use crate::ports::PointsLedger;

/// Outcome of a credential link attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LinkOutcome {
    #[serde(rename_all = "camelCase")]
    Linked {
        /// Account adopted from the ledger when the user had none ("ghost
        /// adoption": the credential earned points before anyone claimed it)
        adopted_account: Option<String>,
    },
    /// The user already owns this credential; nothing to do
    AlreadyLinkedToSelf,
    /// Another user owns this credential; nothing was changed
    AlreadyLinkedToOther,
}

/// LocalUsers sharing one ledger account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub account_ref: String,
    /// Members in creation order
    pub users: Vec<LocalUser>,
}

/// Audit log of one merge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub kept_user_id: Uuid,
    pub deleted_user_id: Uuid,
    pub log: Vec<String>,
}

/// Credential reconciliation service
pub struct ReconcileService {
    repository: Arc<DuckDbRepository>,
    ledger: Arc<dyn PointsLedger>,
}

impl ReconcileService {
    pub fn new(repository: Arc<DuckDbRepository>, ledger: Arc<dyn PointsLedger>) -> Self {
        Self { repository, ledger }
    }

    /// Link a credential to a user.
    ///
    /// Ownership is checked before the insert; the credentials primary key
    /// backstops the check if two link attempts race. Propagation to the
    /// ledger is best-effort — a failure leaves the local link in place for
    /// a later reconciliation pass to repair.
    pub fn link_credential(
        &self,
        user_id: &Uuid,
        kind: CredentialKind,
        value: &str,
    ) -> Result<LinkOutcome> {
        let mut user = self
            .repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("no user {}", user_id)))?;

        let identifier = kind.normalize(value);

        if let Some(existing) = self.repository.get_credential(kind, &identifier)? {
            if existing.owner_user_id == *user_id {
                return Ok(LinkOutcome::AlreadyLinkedToSelf);
            }
            return Ok(LinkOutcome::AlreadyLinkedToOther);
        }

        let credential = Credential::new(kind, &identifier, *user_id);
        if self.repository.insert_credential(&credential)? == CredentialInsert::AlreadyExists {
            // Lost a race with another link attempt since the check above
            let owner = self
                .repository
                .get_credential(kind, &identifier)?
                .map(|c| c.owner_user_id);
            return Ok(if owner == Some(*user_id) {
                LinkOutcome::AlreadyLinkedToSelf
            } else {
                LinkOutcome::AlreadyLinkedToOther
            });
        }

        // Ghost adoption: the credential may already have an account (and
        // points) in the ledger that no LocalUser has claimed. The local
        // link above is already committed, so a ledger outage here only
        // defers adoption to a later pass.
        let mut adopted_account = None;
        if user.account_ref.is_none() {
            match self.ledger.find_account_by_credential(kind, &identifier) {
                Ok(Some(account)) => {
                    user.account_ref = Some(account.account_id.clone());
                    self.repository.update_user(&user)?;
                    adopted_account = Some(account.account_id);
                }
                Ok(None) => {}
                Err(e) => {
                    eprintln!(
                        "[pinwheel] ghost adoption lookup failed for {} {}: {}",
                        kind, identifier, e
                    );
                }
            }
        }

        // Best-effort: fold any balance accrued under the bare credential
        // into the linked account
        if let Some(account_ref) = &user.account_ref {
            if let Err(e) = self
                .ledger
                .link_credential_to_account(kind, &identifier, account_ref)
            {
                eprintln!(
                    "[pinwheel] credential link propagation failed for {} {}: {}",
                    kind, identifier, e
                );
            }
        }

        Ok(LinkOutcome::Linked { adopted_account })
    }

    /// Groups of LocalUsers sharing one account_ref. Size-1 groups are
    /// healthy and excluded.
    pub fn find_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let groups = self.repository.find_duplicate_groups()?;
        Ok(groups
            .into_iter()
            .map(|(account_ref, users)| DuplicateGroup { account_ref, users })
            .collect())
    }

    /// Merge `delete_user_id` into `keep_user_id`, migrating everything the
    /// losing record owns. The losing record is deleted LAST so a failure
    /// partway through leaves it intact rather than orphaning data.
    pub fn merge(&self, keep_user_id: &Uuid, delete_user_id: &Uuid) -> Result<MergeReport> {
        if keep_user_id == delete_user_id {
            return Err(Error::conflict("cannot merge a user into itself"));
        }

        let mut keep = self
            .repository
            .get_user(keep_user_id)?
            .ok_or_else(|| Error::not_found(format!("no user {}", keep_user_id)))?;
        let delete = self
            .repository
            .get_user(delete_user_id)?
            .ok_or_else(|| Error::not_found(format!("no user {}", delete_user_id)))?;

        let mut log = Vec::new();

        // Credentials: move unless the keeper already owns the same pair.
        // A conflicting pair can only exist in data predating the unique
        // key; the losing copy is discarded outright, the keeper's kept.
        let keeper_pairs: HashSet<(CredentialKind, String)> = self
            .repository
            .credentials_for_user(keep_user_id)?
            .into_iter()
            .map(|c| (c.kind, c.identifier))
            .collect();

        for credential in self.repository.credentials_for_user(delete_user_id)? {
            let pair = (credential.kind, credential.identifier.clone());
            if keeper_pairs.contains(&pair) {
                self.repository.delete_credential_owned_by(
                    credential.kind,
                    &credential.identifier,
                    delete_user_id,
                )?;
                log.push(format!(
                    "discarded duplicate credential {} {}",
                    credential.kind, credential.identifier
                ));
            } else {
                self.repository.reassign_credential(
                    credential.kind,
                    &credential.identifier,
                    delete_user_id,
                    keep_user_id,
                )?;
                log.push(format!(
                    "moved credential {} {}",
                    credential.kind, credential.identifier
                ));
            }
        }

        // Owned records with a user foreign key
        let moved = self
            .repository
            .reassign_submissions(delete_user_id, keep_user_id)?;
        if moved > 0 {
            log.push(format!("moved {} submission(s)", moved));
        }
        let moved = self
            .repository
            .reassign_pending_verifications(delete_user_id, keep_user_id)?;
        if moved > 0 {
            log.push(format!("moved {} pending verification(s)", moved));
        }

        // Scalar fields: fill empty slots only. The keeper's existing
        // values always win.
        let adopted = fill_missing_fields(&mut keep, &delete);
        if !adopted.is_empty() {
            self.repository.update_user(&keep)?;
            for field in adopted {
                log.push(format!("adopted {} from deleted user", field));
            }
        }

        self.repository.delete_user(delete_user_id)?;
        log.push(format!("deleted user {}", delete_user_id));

        Ok(MergeReport {
            kept_user_id: *keep_user_id,
            deleted_user_id: *delete_user_id,
            log,
        })
    }

    /// Merge every duplicate group down to its highest-ranked member.
    ///
    /// Ranking: credential count + 10 for an email + 1 for a display name.
    /// Ties keep creation order (stable sort) — deliberately so; no further
    /// tiebreak exists.
    pub fn merge_all(&self) -> Result<Vec<MergeReport>> {
        let mut reports = Vec::new();

        for group in self.find_duplicates()? {
            let mut ranked = Vec::with_capacity(group.users.len());
            for user in group.users {
                let credentials = self.repository.count_credentials_for_user(&user.user_id)?;
                let score = user.merge_score(credentials);
                ranked.push((score, user));
            }
            ranked.sort_by(|a, b| b.0.cmp(&a.0));

            let mut members = ranked.into_iter().map(|(_, u)| u);
            let keep = match members.next() {
                Some(u) => u,
                None => continue,
            };

            for loser in members {
                reports.push(self.merge(&keep.user_id, &loser.user_id)?);
            }
        }

        Ok(reports)
    }
}

/// Copy scalar fields from `from` into empty slots on `into`; returns the
/// names of the fields that were filled.
fn fill_missing_fields(into: &mut LocalUser, from: &LocalUser) -> Vec<&'static str> {
    let mut adopted = Vec::new();

    if into.primary_email.is_none() && from.primary_email.is_some() {
        into.primary_email = from.primary_email.clone();
        adopted.push("primary_email");
    }
    if into.display_name.is_none() && from.display_name.is_some() {
        into.display_name = from.display_name.clone();
        adopted.push("display_name");
    }
    if into.account_ref.is_none() && from.account_ref.is_some() {
        into.account_ref = from.account_ref.clone();
        adopted.push("account_ref");
    }
    if into.shipping_name.is_none() && from.shipping_name.is_some() {
        into.shipping_name = from.shipping_name.clone();
        adopted.push("shipping_name");
    }
    if into.shipping_address.is_none() && from.shipping_address.is_some() {
        into.shipping_address = from.shipping_address.clone();
        adopted.push("shipping_address");
    }

    adopted
}
