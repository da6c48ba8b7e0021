//! Save-status banner behavior through the impersonation registry.
//!
//! Timers run on tokio's paused clock, so these tests are deterministic and
//! take no wall-clock time.

use std::time::Duration;

use tokio::task::yield_now;
use tokio::time::advance;

use heartwood_admin::impersonation::{ImpersonationRegistry, SaveStatus};
use heartwood_core::{AdminUserId, CustomerId};

fn registry_with_session() -> (ImpersonationRegistry, AdminUserId) {
    let registry = ImpersonationRegistry::new();
    let admin = AdminUserId::new(1);
    registry.start(admin, CustomerId::new(42));
    (registry, admin)
}

#[tokio::test(start_paused = true)]
async fn test_successful_edit_shows_saved_then_idles() {
    let (registry, admin) = registry_with_session();
    let session = registry.session_for(admin).expect("active session");

    session.tracker.mark_as_unsaved();
    session.tracker.mark_as_saving();
    assert_eq!(session.tracker.status(), SaveStatus::Saving);

    session.tracker.mark_as_saved();
    let snapshot = session.tracker.snapshot();
    assert_eq!(snapshot.save_status, SaveStatus::Saved);
    assert!(!snapshot.cart_has_unsaved_changes);

    yield_now().await;
    advance(Duration::from_millis(2_900)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Saved);

    advance(Duration::from_millis(200)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failed_edit_shows_error_for_five_seconds() {
    let (registry, admin) = registry_with_session();
    let session = registry.session_for(admin).expect("active session");

    session.tracker.mark_as_saving();
    session.tracker.mark_as_error();
    assert_eq!(session.tracker.status(), SaveStatus::Error);

    yield_now().await;
    advance(Duration::from_millis(4_900)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Error);

    advance(Duration::from_millis(200)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_saves_never_revert_early() {
    let (registry, admin) = registry_with_session();
    let session = registry.session_for(admin).expect("active session");

    session.tracker.mark_as_saved();
    yield_now().await;

    // A second edit lands just before the first reset would fire
    advance(Duration::from_millis(2_900)).await;
    session.tracker.mark_as_saving();
    session.tracker.mark_as_saved();
    yield_now().await;

    advance(Duration::from_millis(200)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Saved);

    advance(Duration::from_millis(2_900)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_impersonation_cancels_pending_reset() {
    let (registry, admin) = registry_with_session();
    let session = registry.session_for(admin).expect("active session");

    session.tracker.mark_as_error();
    yield_now().await;

    assert!(registry.stop(admin));
    let snapshot = session.tracker.snapshot();
    assert_eq!(snapshot.save_status, SaveStatus::Idle);
    assert!(!snapshot.is_impersonating);

    // The cancelled error timer must not fire later
    advance(Duration::from_secs(6)).await;
    yield_now().await;
    assert_eq!(session.tracker.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_serializes_for_the_banner() {
    let (registry, admin) = registry_with_session();
    let session = registry.session_for(admin).expect("active session");
    session.tracker.mark_as_saved();

    let json =
        serde_json::to_value(session.tracker.snapshot()).expect("snapshot serializes");
    assert_eq!(
        json,
        serde_json::json!({
            "save_status": "saved",
            "cart_has_unsaved_changes": false,
            "is_impersonating": true,
        })
    );
}
