//! Integration tests for pinwheel-core services
//!
//! These tests run the real service stack end to end: a real DuckDB file in
//! a tempdir and a mock gritd server speaking actual HTTP. Only the clock
//! is pinned, so every test sees a stable draw window.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use pinwheel_core::adapters::gritd::GritdLedger;
use pinwheel_core::adapters::gritd_mock::{MockConfig, MockGritdServer};
use pinwheel_core::config::Config;
use pinwheel_core::domain::window::Clock;
use pinwheel_core::domain::{CredentialKind, LocalUser};
use pinwheel_core::ports::{Notifier, NullNotifier};
use pinwheel_core::services::{BatchStatus, DrawOutcome, EnterOutcome, LinkOutcome};
use pinwheel_core::{Error, PinwheelContext};

// ============================================================================
// Test Helpers
// ============================================================================

/// Noon UTC on 2024-06-01: comfortably before the 20:00 rollover, so the
/// window is 2024-06-01 itself.
fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn test_window() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Notifier that remembers everything it was asked to announce
#[derive(Default)]
struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for CollectingNotifier {
    fn announce(&self, message: &str) -> Result<(), Error> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Notifier that always fails
struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn announce(&self, _message: &str) -> Result<(), Error> {
        Err(Error::Other("webhook is down".to_string()))
    }
}

/// Context wired against a mock gritd server over real HTTP
fn create_context(dir: &TempDir, server: &MockGritdServer) -> PinwheelContext {
    create_context_with_notifier(dir, server, Arc::new(NullNotifier))
}

fn create_context_with_notifier(
    dir: &TempDir,
    server: &MockGritdServer,
    notifier: Arc<dyn Notifier>,
) -> PinwheelContext {
    let config = Config::default();
    let ledger = Arc::new(GritdLedger::new("test_key", &server.base_url()).unwrap());
    PinwheelContext::with_collaborators(
        dir.path(),
        config,
        ledger,
        notifier,
        Arc::new(FixedClock(test_now())),
    )
    .unwrap()
}

fn create_user(ctx: &PinwheelContext) -> LocalUser {
    let user = LocalUser::new(Uuid::new_v4());
    ctx.repository.insert_user(&user).unwrap();
    user
}

// ============================================================================
// Entry Service
// ============================================================================

/// 15 points, entry cost 10: the first entry succeeds leaving 5, and a
/// repeat in the same window is rejected with the balance untouched.
#[test]
fn test_enter_charges_once_then_rejects_repeat() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 15);
    let ctx = create_context(&dir, &server);

    let first = ctx.entry_service.enter("acct_1", None).unwrap();
    assert_eq!(first, EnterOutcome::Entered { new_balance: 5 });

    let second = ctx.entry_service.enter("acct_1", None).unwrap();
    assert_eq!(second, EnterOutcome::AlreadyEntered);

    assert_eq!(server.balance_of("acct_1"), Some(5));
    assert_eq!(server.adjustment_count_for("acct_1"), 1);
    assert_eq!(
        ctx.repository.count_entries_in_window(test_window()).unwrap(),
        1
    );
}

#[test]
fn test_enter_unknown_account() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let outcome = ctx.entry_service.enter("acct_ghost", None).unwrap();
    assert_eq!(outcome, EnterOutcome::AccountNotFound);
}

#[test]
fn test_enter_insufficient_balance_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_poor", 9);
    let ctx = create_context(&dir, &server);

    let outcome = ctx.entry_service.enter("acct_poor", None).unwrap();
    assert_eq!(outcome, EnterOutcome::InsufficientBalance);

    assert_eq!(server.balance_of("acct_poor"), Some(9));
    assert_eq!(server.adjustment_count_for("acct_poor"), 0);
    assert_eq!(
        ctx.repository.count_entries_in_window(test_window()).unwrap(),
        0
    );
}

#[test]
fn test_enter_via_wallet_resolves_to_canonical_account() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let wallet = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    server.seed_account("acct_7", 30);
    server.seed_credential("wallet", wallet, "acct_7");
    let ctx = create_context(&dir, &server);

    let outcome = ctx.entry_service.enter(wallet, None).unwrap();
    assert_eq!(outcome, EnterOutcome::Entered { new_balance: 20 });

    // The entry row carries the canonical account ref, not the raw wallet
    assert!(ctx
        .repository
        .has_entry(&["acct_7"], test_window())
        .unwrap());
    assert!(!ctx.repository.has_entry(&[wallet], test_window()).unwrap());
}

/// A failed charge must release the reservation, so a later retry can
/// succeed rather than being told "already entered" for an entry that was
/// never paid for.
#[test]
fn test_failed_charge_releases_reservation() {
    let dir = TempDir::new().unwrap();

    // First attempt against a ledger that refuses all adjustments
    {
        let server = MockGritdServer::start(MockConfig {
            fail_adjustments: true,
            ..Default::default()
        })
        .unwrap();
        server.seed_account("acct_1", 50);
        let ctx = create_context(&dir, &server);

        let outcome = ctx.entry_service.enter("acct_1", None).unwrap();
        assert!(matches!(outcome, EnterOutcome::TransientFailure { .. }));

        assert!(!ctx
            .repository
            .has_entry(&["acct_1"], test_window())
            .unwrap());
        assert_eq!(server.balance_of("acct_1"), Some(50));
    }

    // Retry against the same database with a healthy ledger
    {
        let server = MockGritdServer::start(MockConfig::default()).unwrap();
        server.seed_account("acct_1", 50);
        let ctx = create_context(&dir, &server);

        let outcome = ctx.entry_service.enter("acct_1", None).unwrap();
        assert_eq!(outcome, EnterOutcome::Entered { new_balance: 40 });
    }
}

#[test]
fn test_status_reports_window_and_participation() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 100);
    server.seed_account("acct_2", 100);
    let ctx = create_context(&dir, &server);

    ctx.entry_service.enter("acct_1", None).unwrap();
    ctx.entry_service.enter("acct_2", None).unwrap();

    let status = ctx.entry_service.status(Some("acct_1")).unwrap();
    assert_eq!(status.window_date, "2024-06-01");
    assert_eq!(status.window_entry_count, 2);
    assert_eq!(status.has_entered, Some(true));
    // Noon to 20:00 is eight hours
    assert_eq!(status.ms_until_next_window, 8 * 60 * 60 * 1000);

    let anonymous = ctx.entry_service.status(None).unwrap();
    assert_eq!(anonymous.has_entered, None);

    let unknown = ctx.entry_service.status(Some("acct_ghost")).unwrap();
    assert_eq!(unknown.has_entered, Some(false));
}

// ============================================================================
// Draw Service
// ============================================================================

/// An empty window yields NoEntries and writes nothing
#[test]
fn test_draw_with_no_entries_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let outcome = ctx.draw_service.run_draw(test_window()).unwrap();
    assert_eq!(outcome, DrawOutcome::NoEntries);
    assert!(ctx.draw_service.winner_for(test_window()).unwrap().is_none());
}

/// The second invocation is a no-op reporting AlreadyDrawn
#[test]
fn test_draw_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 20);
    let ctx = create_context(&dir, &server);

    ctx.entry_service.enter("acct_1", None).unwrap();

    let first = ctx.draw_service.run_draw(test_window()).unwrap();
    let winner = match first {
        DrawOutcome::Drawn(winner) => winner,
        other => panic!("expected Drawn, got {:?}", other),
    };
    assert_eq!(winner.account_ref, "acct_1");

    let second = ctx.draw_service.run_draw(test_window()).unwrap();
    assert_eq!(second, DrawOutcome::AlreadyDrawn);

    let stored = ctx.draw_service.winner_for(test_window()).unwrap().unwrap();
    assert_eq!(stored.account_ref, winner.account_ref);
    assert_eq!(stored.prize_id, winner.prize_id);
}

#[test]
fn test_draw_picks_from_entry_rows_and_announces() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let notifier = Arc::new(CollectingNotifier::default());
    for account in ["acct_1", "acct_2", "acct_3"] {
        server.seed_account(account, 20);
    }
    let ctx = create_context_with_notifier(&dir, &server, notifier.clone());

    ctx.entry_service.enter("acct_1", None).unwrap();
    ctx.entry_service.enter("acct_2", None).unwrap();
    ctx.entry_service.enter("acct_3", None).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let outcome = ctx
        .draw_service
        .run_draw_with_rng(test_window(), &mut rng)
        .unwrap();

    let winner = match outcome {
        DrawOutcome::Drawn(winner) => winner,
        other => panic!("expected Drawn, got {:?}", other),
    };
    assert!(["acct_1", "acct_2", "acct_3"].contains(&winner.account_ref.as_str()));
    assert!(!winner.prize_name.is_empty());

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains(&winner.account_ref));
    assert!(messages[0].contains(&winner.prize_name));
}

#[test]
fn test_draw_survives_notifier_failure() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 20);
    let ctx = create_context_with_notifier(&dir, &server, Arc::new(FailingNotifier));

    ctx.entry_service.enter("acct_1", None).unwrap();

    let outcome = ctx.draw_service.run_draw(test_window()).unwrap();
    assert!(matches!(outcome, DrawOutcome::Drawn(_)));
    assert!(ctx.draw_service.winner_for(test_window()).unwrap().is_some());
}

#[test]
fn test_draw_resolves_winner_shipping_address() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 20);
    let ctx = create_context(&dir, &server);

    let mut user = LocalUser::new(Uuid::new_v4());
    user.account_ref = Some("acct_1".to_string());
    user.shipping_address = Some("1 Main St, Springfield".to_string());
    ctx.repository.insert_user(&user).unwrap();

    ctx.entry_service.enter("acct_1", None).unwrap();

    let outcome = ctx.draw_service.run_draw(test_window()).unwrap();
    let winner = match outcome {
        DrawOutcome::Drawn(winner) => winner,
        other => panic!("expected Drawn, got {:?}", other),
    };
    assert_eq!(
        winner.shipping_address.as_deref(),
        Some("1 Main St, Springfield")
    );
}

// ============================================================================
// Auto-Entry Batch
// ============================================================================

#[test]
fn test_auto_entry_batch_isolates_each_account() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_rich", 100);
    server.seed_account("acct_poor", 3);
    // acct_gone is opted in but unknown to the ledger
    let ctx = create_context(&dir, &server);

    for account in ["acct_rich", "acct_poor", "acct_gone"] {
        ctx.auto_entry_service.set_auto_entry(account, true).unwrap();
    }

    let report = ctx.auto_entry_service.run_batch().unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);

    let rich = report
        .results
        .iter()
        .find(|r| r.account_ref == "acct_rich")
        .unwrap();
    assert_eq!(rich.status, BatchStatus::Succeeded);

    // A re-run skips everyone: no double charges from a duplicate firing
    let rerun = ctx.auto_entry_service.run_batch().unwrap();
    assert_eq!(rerun.succeeded, 0);
    assert_eq!(rerun.skipped, 3);
    assert_eq!(server.adjustment_count_for("acct_rich"), 1);
    assert_eq!(server.balance_of("acct_rich"), Some(90));
}

#[test]
fn test_auto_entry_disabled_accounts_are_not_processed() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    server.seed_account("acct_1", 100);
    let ctx = create_context(&dir, &server);

    ctx.auto_entry_service.set_auto_entry("acct_1", true).unwrap();
    ctx.auto_entry_service.set_auto_entry("acct_1", false).unwrap();

    let report = ctx.auto_entry_service.run_batch().unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(server.adjustment_count_for("acct_1"), 0);
}

// ============================================================================
// Reconciliation
// ============================================================================

/// A credential owned by one user can never be claimed by another
#[test]
fn test_link_credential_ownership_is_exclusive() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let alice = create_user(&ctx);
    let bob = create_user(&ctx);

    let outcome = ctx
        .reconcile_service
        .link_credential(&alice.user_id, CredentialKind::Email, "Shared@Example.com")
        .unwrap();
    assert!(matches!(outcome, LinkOutcome::Linked { .. }));

    // Same identifier, different case, different user: rejected, no change
    let stolen = ctx
        .reconcile_service
        .link_credential(&bob.user_id, CredentialKind::Email, "shared@example.COM")
        .unwrap();
    assert_eq!(stolen, LinkOutcome::AlreadyLinkedToOther);

    let owner = ctx
        .repository
        .get_credential(CredentialKind::Email, "shared@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(owner.owner_user_id, alice.user_id);

    // Re-linking your own credential is a harmless no-op
    let again = ctx
        .reconcile_service
        .link_credential(&alice.user_id, CredentialKind::Email, "shared@example.com")
        .unwrap();
    assert_eq!(again, LinkOutcome::AlreadyLinkedToSelf);
}

#[test]
fn test_link_adopts_ghost_account_and_propagates() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    // The discord handle earned points before anyone signed in with it
    server.seed_account("acct_ghost", 75);
    server.seed_credential("discord", "grinder#0042", "acct_ghost");
    let ctx = create_context(&dir, &server);

    let user = create_user(&ctx);
    assert!(user.account_ref.is_none());

    let outcome = ctx
        .reconcile_service
        .link_credential(&user.user_id, CredentialKind::Discord, "Grinder#0042")
        .unwrap();
    assert_eq!(
        outcome,
        LinkOutcome::Linked {
            adopted_account: Some("acct_ghost".to_string())
        }
    );

    let reloaded = ctx.repository.get_user(&user.user_id).unwrap().unwrap();
    assert_eq!(reloaded.account_ref.as_deref(), Some("acct_ghost"));

    // Best-effort propagation reached the ledger
    let links = server.links();
    assert!(links.iter().any(|(kind, value, account)| {
        kind == "discord" && value == "grinder#0042" && account == "acct_ghost"
    }));
}

#[test]
fn test_merge_rejects_self_and_unknown_users() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let user = create_user(&ctx);

    let self_merge = ctx.reconcile_service.merge(&user.user_id, &user.user_id);
    assert!(matches!(self_merge, Err(Error::Conflict(_))));

    let unknown = ctx.reconcile_service.merge(&user.user_id, &Uuid::new_v4());
    assert!(matches!(unknown, Err(Error::NotFound(_))));
}

/// Merging migrates credentials and owned rows, fills only empty
/// fields, and deletes the loser last.
#[test]
fn test_merge_migrates_and_preserves_keeper_fields() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let mut keep = LocalUser::new(Uuid::new_v4());
    keep.primary_email = Some("keeper@example.com".to_string());
    keep.account_ref = Some("acct_9".to_string());
    ctx.repository.insert_user(&keep).unwrap();

    let mut lose = LocalUser::new(Uuid::new_v4());
    lose.primary_email = Some("loser@example.com".to_string());
    lose.display_name = Some("Grinder".to_string());
    lose.account_ref = Some("acct_9".to_string());
    ctx.repository.insert_user(&lose).unwrap();

    ctx.reconcile_service
        .link_credential(&lose.user_id, CredentialKind::Discord, "grinder#0042")
        .unwrap();
    let wallet = "4Nd1mYbNccCzZ3XjUKb2M7PYzL9VsGCKvbtGJcUhkzaa";
    ctx.reconcile_service
        .link_credential(&lose.user_id, CredentialKind::Wallet, wallet)
        .unwrap();

    let submission =
        pinwheel_core::adapters::duckdb::Submission::new(lose.user_id, "https://youtu.be/x");
    ctx.repository.add_submission(&submission).unwrap();

    let report = ctx
        .reconcile_service
        .merge(&keep.user_id, &lose.user_id)
        .unwrap();

    // Keeper's own email survives; only empty fields were filled
    let merged = ctx.repository.get_user(&keep.user_id).unwrap().unwrap();
    assert_eq!(merged.primary_email.as_deref(), Some("keeper@example.com"));
    assert_eq!(merged.display_name.as_deref(), Some("Grinder"));

    // Non-conflicting credentials now belong to the keeper
    let discord = ctx
        .repository
        .get_credential(CredentialKind::Discord, "grinder#0042")
        .unwrap()
        .unwrap();
    assert_eq!(discord.owner_user_id, keep.user_id);
    let moved_wallet = ctx
        .repository
        .get_credential(CredentialKind::Wallet, wallet)
        .unwrap()
        .unwrap();
    assert_eq!(moved_wallet.owner_user_id, keep.user_id);

    // Owned rows moved, loser gone
    assert_eq!(
        ctx.repository
            .count_submissions_for_user(&keep.user_id)
            .unwrap(),
        1
    );
    assert!(ctx.repository.get_user(&lose.user_id).unwrap().is_none());

    // The log names what happened
    assert!(report.log.iter().any(|l| l.contains("discord")));
    assert!(report.log.iter().any(|l| l.contains("submission")));
    assert!(report.log.iter().any(|l| l.contains("deleted user")));
}

/// A credential pair owned by both sides is possible only in data
/// predating the unique key. The loser's copy is discarded, the keeper's
/// survives, nothing is double-moved.
#[test]
fn test_merge_discards_conflicting_credentials() {
    let dir = TempDir::new().unwrap();
    let keep_id = Uuid::new_v4();
    let lose_id = Uuid::new_v4();

    // Seed a legacy credentials table (no unique key) holding the same
    // (kind, identifier) pair for two owners. The schema migration's
    // CREATE TABLE IF NOT EXISTS leaves this table as-is.
    {
        let conn = duckdb::Connection::open(dir.path().join("pinwheel.duckdb")).unwrap();
        conn.execute_batch(
            "CREATE TABLE credentials (
                kind VARCHAR NOT NULL,
                identifier VARCHAR NOT NULL,
                owner_user_id VARCHAR NOT NULL,
                verified BOOLEAN NOT NULL DEFAULT true,
                created_at VARCHAR NOT NULL
            );",
        )
        .unwrap();
        for owner in [&keep_id, &lose_id] {
            conn.execute(
                "INSERT INTO credentials VALUES ('email', 'dup@example.com', ?, true, '2023-01-01T00:00:00+00:00')",
                [owner.to_string()],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO credentials VALUES ('discord', 'solo#1', ?, true, '2023-01-02T00:00:00+00:00')",
            [lose_id.to_string()],
        )
        .unwrap();
    }

    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let keep = LocalUser::new(keep_id);
    let lose = LocalUser::new(lose_id);
    ctx.repository.insert_user(&keep).unwrap();
    ctx.repository.insert_user(&lose).unwrap();

    let report = ctx.reconcile_service.merge(&keep_id, &lose_id).unwrap();

    // The conflicting pair: loser's copy gone, keeper's copy intact
    let keeper_credentials = ctx.repository.credentials_for_user(&keep_id).unwrap();
    let email_rows: Vec<_> = keeper_credentials
        .iter()
        .filter(|c| c.kind == CredentialKind::Email && c.identifier == "dup@example.com")
        .collect();
    assert_eq!(email_rows.len(), 1);

    // The non-conflicting credential moved over
    assert!(keeper_credentials
        .iter()
        .any(|c| c.kind == CredentialKind::Discord && c.identifier == "solo#1"));
    assert_eq!(keeper_credentials.len(), 2);

    assert!(ctx
        .repository
        .credentials_for_user(&lose_id)
        .unwrap()
        .is_empty());
    assert!(report
        .log
        .iter()
        .any(|l| l.contains("discarded duplicate credential email dup@example.com")));
}

/// Ranking: U1 has 2 credentials and no email (score 2), U2 has 1
/// credential and an email (score 11). Auto-merge keeps U2.
#[test]
fn test_merge_all_ranks_by_score() {
    let dir = TempDir::new().unwrap();
    let server = MockGritdServer::start(MockConfig::default()).unwrap();
    let ctx = create_context(&dir, &server);

    let mut u1 = LocalUser::new(Uuid::new_v4());
    u1.account_ref = Some("acct_9".to_string());
    ctx.repository.insert_user(&u1).unwrap();
    let wallet_a = "4Nd1mYbNccCzZ3XjUKb2M7PYzL9VsGCKvbtGJcUhkzaa";
    let wallet_b = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    ctx.reconcile_service
        .link_credential(&u1.user_id, CredentialKind::Wallet, wallet_a)
        .unwrap();
    ctx.reconcile_service
        .link_credential(&u1.user_id, CredentialKind::Wallet, wallet_b)
        .unwrap();

    let mut u2 = LocalUser::new(Uuid::new_v4());
    u2.account_ref = Some("acct_9".to_string());
    u2.primary_email = Some("a@b.com".to_string());
    ctx.repository.insert_user(&u2).unwrap();
    ctx.reconcile_service
        .link_credential(&u2.user_id, CredentialKind::Email, "a@b.com")
        .unwrap();

    let groups = ctx.reconcile_service.find_duplicates().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].users.len(), 2);

    let reports = ctx.reconcile_service.merge_all().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kept_user_id, u2.user_id);
    assert_eq!(reports[0].deleted_user_id, u1.user_id);

    // U2 survives holding all three credentials
    assert_eq!(
        ctx.repository
            .count_credentials_for_user(&u2.user_id)
            .unwrap(),
        3
    );
    assert!(ctx.repository.get_user(&u1.user_id).unwrap().is_none());
    assert!(ctx.reconcile_service.find_duplicates().unwrap().is_empty());
}
