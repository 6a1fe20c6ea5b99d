//! DuckDB repository implementation
//!
//! Local source of truth for users, credentials, raffle entries, and draw
//! results. Uniqueness invariants (one entry per account per window, one
//! winner per window, one owner per credential) are enforced by primary
//! keys; the insert paths surface conflicts as tagged outcomes instead of
//! string-matching constraint errors.

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::domain::{Credential, CredentialKind, Entry, LocalUser, Winner};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Outcome of attempting to reserve an entry slot.
///
/// `AlreadyReserved` is the expected signal for two concurrent entry
/// attempts on the same account and window — not an exceptional failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    AlreadyReserved,
}

/// Outcome of attempting to record a draw result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDrawOutcome {
    Recorded,
    AlreadyDrawn,
}

/// Outcome of attempting to insert a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialInsert {
    Inserted,
    AlreadyExists,
}

/// A user-submitted content link, migrated on merge
#[derive(Debug, Clone)]
pub struct Submission {
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(user_id: Uuid, url: impl Into<String>) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            user_id,
            url: url.into(),
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// An in-flight credential verification, migrated on merge.
/// Stores a fingerprint of the emailed token, never the token itself.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub verification_id: Uuid,
    pub user_id: Uuid,
    pub kind: CredentialKind,
    pub identifier: String,
    pub token_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl PendingVerification {
    /// Create a pending verification with a fresh random token.
    /// Returns the record and the cleartext token to hand to the sender.
    pub fn issue(user_id: Uuid, kind: CredentialKind, identifier: &str) -> (Self, String) {
        use rand::RngCore;
        use sha2::{Digest, Sha256};

        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let fingerprint = hex::encode(Sha256::digest(token.as_bytes()));

        let record = Self {
            verification_id: Uuid::new_v4(),
            user_id,
            kind,
            identifier: kind.normalize(identifier),
            token_fingerprint: fingerprint,
            created_at: Utc::now(),
        };
        (record, token)
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) the portal database.
    ///
    /// Includes retry logic with exponential backoff for file locking
    /// errors, which can occur when a CLI command races the scheduler
    /// against the same database file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[pinwheel] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: avoids loading cached extensions with
        // mismatched signatures from ~/.duckdb
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.conn.lock().unwrap();
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Local users ===

    pub fn insert_user(&self, user: &LocalUser) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO local_users (user_id, display_name, primary_email, account_ref,
                                      shipping_name, shipping_address, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user.user_id.to_string(),
                user.display_name,
                user.primary_email,
                user.account_ref,
                user.shipping_name,
                user.shipping_address,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &Uuid) -> Result<Option<LocalUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, display_name, primary_email, account_ref,
                    shipping_name, shipping_address, created_at, updated_at
             FROM local_users WHERE user_id = ?",
        )?;

        let user = stmt
            .query_row([user_id.to_string()], |row| Ok(row_to_user(row)))
            .ok();

        Ok(user)
    }

    pub fn update_user(&self, user: &LocalUser) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE local_users SET display_name = ?, primary_email = ?, account_ref = ?,
                                    shipping_name = ?, shipping_address = ?, updated_at = ?
             WHERE user_id = ?",
            params![
                user.display_name,
                user.primary_email,
                user.account_ref,
                user.shipping_name,
                user.shipping_address,
                Utc::now().to_rfc3339(),
                user.user_id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_user(&self, user_id: &Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM local_users WHERE user_id = ?",
            [user_id.to_string()],
        )?;
        Ok(())
    }

    /// Users currently holding an account_ref, in creation order
    pub fn users_by_account_ref(&self, account_ref: &str) -> Result<Vec<LocalUser>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, display_name, primary_email, account_ref,
                    shipping_name, shipping_address, created_at, updated_at
             FROM local_users WHERE account_ref = ? ORDER BY created_at",
        )?;

        let users = stmt
            .query_map([account_ref], |row| Ok(row_to_user(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(users)
    }

    /// Users sharing a non-null account_ref, grouped. Groups of one are not
    /// duplicates and are excluded. Members come back in creation order so
    /// the merge ranking tiebreak is stable.
    pub fn find_duplicate_groups(&self) -> Result<Vec<(String, Vec<LocalUser>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT u.user_id, u.display_name, u.primary_email, u.account_ref,
                    u.shipping_name, u.shipping_address, u.created_at, u.updated_at
             FROM local_users u
             WHERE u.account_ref IN (
                 SELECT account_ref FROM local_users
                 WHERE account_ref IS NOT NULL
                 GROUP BY account_ref HAVING COUNT(*) > 1
             )
             ORDER BY u.account_ref, u.created_at",
        )?;

        let users: Vec<LocalUser> = stmt
            .query_map([], |row| Ok(row_to_user(row)))?
            .filter_map(|r| r.ok())
            .collect();

        let mut groups: Vec<(String, Vec<LocalUser>)> = Vec::new();
        for user in users {
            let account_ref = match &user.account_ref {
                Some(r) => r.clone(),
                None => continue,
            };
            match groups.last_mut() {
                Some((current, members)) if *current == account_ref => members.push(user),
                _ => groups.push((account_ref, vec![user])),
            }
        }

        Ok(groups)
    }

    // === Credentials ===

    /// Insert a credential; the (kind, identifier) primary key is the
    /// backstop if two link attempts race past the ownership pre-check.
    pub fn insert_credential(&self, credential: &Credential) -> Result<CredentialInsert> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT INTO credentials (kind, identifier, owner_user_id, verified, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (kind, identifier) DO NOTHING",
            params![
                credential.kind.as_str(),
                credential.identifier,
                credential.owner_user_id.to_string(),
                credential.verified,
                credential.created_at.to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(CredentialInsert::AlreadyExists)
        } else {
            Ok(CredentialInsert::Inserted)
        }
    }

    pub fn get_credential(
        &self,
        kind: CredentialKind,
        identifier: &str,
    ) -> Result<Option<Credential>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT kind, identifier, owner_user_id, verified, created_at
             FROM credentials WHERE kind = ? AND identifier = ?",
        )?;

        let credential = stmt
            .query_row(params![kind.as_str(), kind.normalize(identifier)], |row| {
                Ok(row_to_credential(row))
            })
            .ok();

        Ok(credential)
    }

    pub fn credentials_for_user(&self, user_id: &Uuid) -> Result<Vec<Credential>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT kind, identifier, owner_user_id, verified, created_at
             FROM credentials WHERE owner_user_id = ? ORDER BY created_at",
        )?;

        let credentials = stmt
            .query_map([user_id.to_string()], |row| Ok(row_to_credential(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(credentials)
    }

    pub fn count_credentials_for_user(&self, user_id: &Uuid) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM credentials WHERE owner_user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Move one owner's credential row to a new owner. Scoped to the old
    /// owner so legacy tables holding duplicate pairs are never re-owned
    /// wholesale.
    pub fn reassign_credential(
        &self,
        kind: CredentialKind,
        identifier: &str,
        from: &Uuid,
        to: &Uuid,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE credentials SET owner_user_id = ?
             WHERE kind = ? AND identifier = ? AND owner_user_id = ?",
            params![
                to.to_string(),
                kind.as_str(),
                kind.normalize(identifier),
                from.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Delete one owner's credential row, leaving any other owner's row
    /// for the same pair alone.
    pub fn delete_credential_owned_by(
        &self,
        kind: CredentialKind,
        identifier: &str,
        owner: &Uuid,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM credentials
             WHERE kind = ? AND identifier = ? AND owner_user_id = ?",
            params![kind.as_str(), kind.normalize(identifier), owner.to_string()],
        )?;
        Ok(())
    }

    // === Raffle entries ===

    /// Claim the (account_ref, window) slot. Insert-first: the primary key
    /// conflict, not a pre-check, is what closes the race between two
    /// concurrent entry attempts.
    pub fn reserve_entry(&self, account_ref: &str, window: NaiveDate) -> Result<ReserveOutcome> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT INTO entries (account_ref, window_date, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT (account_ref, window_date) DO NOTHING",
            params![
                account_ref,
                window.format("%Y-%m-%d").to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(ReserveOutcome::AlreadyReserved)
        } else {
            Ok(ReserveOutcome::Reserved)
        }
    }

    /// Delete a reservation. Rollback path only, for a failed charge.
    pub fn release_entry(&self, account_ref: &str, window: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM entries WHERE account_ref = ? AND window_date = ?",
            params![account_ref, window.format("%Y-%m-%d").to_string()],
        )?;
        Ok(())
    }

    /// True if any of the candidate refs has an entry for the window.
    /// Takes a slice so the legacy raw-identifier lookup is one query.
    pub fn has_entry(&self, account_refs: &[&str], window: NaiveDate) -> Result<bool> {
        if account_refs.is_empty() {
            return Ok(false);
        }

        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; account_refs.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM entries WHERE window_date = ? AND account_ref IN ({})",
            placeholders
        );

        let mut values: Vec<String> = vec![window.format("%Y-%m-%d").to_string()];
        values.extend(account_refs.iter().map(|r| r.to_string()));

        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn count_entries_in_window(&self, window: NaiveDate) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE window_date = ?",
            [window.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn entries_for_window(&self, window: NaiveDate) -> Result<Vec<Entry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT account_ref, window_date, created_at
             FROM entries WHERE window_date = ? ORDER BY created_at",
        )?;

        let entries = stmt
            .query_map([window.format("%Y-%m-%d").to_string()], |row| {
                let account_ref: String = row.get(0)?;
                let window_str: String = row.get(1)?;
                let created_str: String = row.get(2)?;
                Ok(Entry {
                    account_ref,
                    window_date: parse_date(&window_str),
                    created_at: parse_timestamp(&created_str),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    // === Draw results ===

    /// Record a draw result. The window_date primary key is the safety net
    /// when a scheduled and a manual trigger race: the loser sees
    /// `AlreadyDrawn` and writes nothing.
    pub fn record_winner(&self, winner: &Winner) -> Result<RecordDrawOutcome> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT INTO winners (window_date, account_ref, prize_id, prize_name,
                                  shipped, shipping_address, drawn_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (window_date) DO NOTHING",
            params![
                winner.window_date.format("%Y-%m-%d").to_string(),
                winner.account_ref,
                winner.prize_id,
                winner.prize_name,
                winner.shipped,
                winner.shipping_address,
                winner.drawn_at.to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(RecordDrawOutcome::AlreadyDrawn)
        } else {
            Ok(RecordDrawOutcome::Recorded)
        }
    }

    pub fn get_winner(&self, window: NaiveDate) -> Result<Option<Winner>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT window_date, account_ref, prize_id, prize_name,
                    shipped, shipping_address, drawn_at
             FROM winners WHERE window_date = ?",
        )?;

        let winner = stmt
            .query_row([window.format("%Y-%m-%d").to_string()], |row| {
                Ok(row_to_winner(row))
            })
            .ok();

        Ok(winner)
    }

    pub fn get_winners(&self) -> Result<Vec<Winner>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT window_date, account_ref, prize_id, prize_name,
                    shipped, shipping_address, drawn_at
             FROM winners ORDER BY window_date DESC",
        )?;

        let winners = stmt
            .query_map([], |row| Ok(row_to_winner(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(winners)
    }

    /// Fulfillment workflow hook
    pub fn mark_shipped(&self, window: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE winners SET shipped = true WHERE window_date = ?",
            [window.format("%Y-%m-%d").to_string()],
        )?;
        Ok(())
    }

    // === Auto-entry opt-ins ===

    pub fn set_auto_entry(&self, account_ref: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auto_entries (account_ref, enabled, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT (account_ref) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                updated_at = EXCLUDED.updated_at",
            params![account_ref, enabled, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn auto_entry_accounts(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT account_ref FROM auto_entries WHERE enabled ORDER BY account_ref",
        )?;

        let accounts = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(accounts)
    }

    // === Submissions ===

    pub fn add_submission(&self, submission: &Submission) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO submissions (submission_id, user_id, url, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                submission.submission_id.to_string(),
                submission.user_id.to_string(),
                submission.url,
                submission.status,
                submission.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn count_submissions_for_user(&self, user_id: &Uuid) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn reassign_submissions(&self, from: &Uuid, to: &Uuid) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let moved = conn.execute(
            "UPDATE submissions SET user_id = ? WHERE user_id = ?",
            params![to.to_string(), from.to_string()],
        )?;
        Ok(moved)
    }

    // === Pending verifications ===

    pub fn add_pending_verification(&self, verification: &PendingVerification) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO pending_verifications (verification_id, user_id, kind, identifier,
                                                token, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                verification.verification_id.to_string(),
                verification.user_id.to_string(),
                verification.kind.as_str(),
                verification.identifier,
                verification.token_fingerprint,
                verification.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn reassign_pending_verifications(&self, from: &Uuid, to: &Uuid) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let moved = conn.execute(
            "UPDATE pending_verifications SET user_id = ? WHERE user_id = ?",
            params![to.to_string(), from.to_string()],
        )?;
        Ok(moved)
    }
}

// === Row mappers ===

fn row_to_user(row: &duckdb::Row) -> LocalUser {
    let id_str: String = row.get(0).unwrap_or_default();
    let created_str: String = row.get(6).unwrap_or_default();
    let updated_str: String = row.get(7).unwrap_or_default();

    LocalUser {
        user_id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        display_name: row.get::<_, Option<String>>(1).ok().flatten(),
        primary_email: row.get::<_, Option<String>>(2).ok().flatten(),
        account_ref: row.get::<_, Option<String>>(3).ok().flatten(),
        shipping_name: row.get::<_, Option<String>>(4).ok().flatten(),
        shipping_address: row.get::<_, Option<String>>(5).ok().flatten(),
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    }
}

fn row_to_credential(row: &duckdb::Row) -> Credential {
    let kind_str: String = row.get(0).unwrap_or_default();
    let owner_str: String = row.get(2).unwrap_or_default();
    let created_str: String = row.get(4).unwrap_or_default();

    Credential {
        kind: CredentialKind::parse(&kind_str).unwrap_or(CredentialKind::Email),
        identifier: row.get(1).unwrap_or_default(),
        owner_user_id: Uuid::parse_str(&owner_str).unwrap_or_else(|_| Uuid::new_v4()),
        verified: row.get(3).unwrap_or(true),
        created_at: parse_timestamp(&created_str),
    }
}

fn row_to_winner(row: &duckdb::Row) -> Winner {
    let window_str: String = row.get(0).unwrap_or_default();
    let drawn_str: String = row.get(6).unwrap_or_default();

    Winner {
        window_date: parse_date(&window_str),
        account_ref: row.get(1).unwrap_or_default(),
        prize_id: row.get(2).unwrap_or_default(),
        prize_name: row.get(3).unwrap_or_default(),
        shipped: row.get(4).unwrap_or(false),
        shipping_address: row.get::<_, Option<String>>(5).ok().flatten(),
        drawn_at: parse_timestamp(&drawn_str),
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}
