//! End-to-end cart consolidation tests over the in-memory store.

use heartwood_core::cart::ConsolidationAction;
use heartwood_core::{CartSessionId, CustomerId};
use heartwood_integration_tests::{
    build_trigger, cabinet, seed_customer_session, sessions_of, test_user,
};
use heartwood_storefront::services::carts::{CartStore, InMemoryCartStore};
use heartwood_storefront::services::consolidation::TriggerOutcome;
use heartwood_storefront::services::notify::NoticeLevel;

#[tokio::test]
async fn test_two_sessions_merge_into_one() {
    let store = InMemoryCartStore::new();
    let user = test_user(1);

    let first = seed_customer_session(
        &store,
        user.id,
        &[
            (101, cabinet("natural oak", "sand", "matte black"), 1),
            (102, cabinet("walnut stain", "espresso", "brass"), 2),
        ],
    )
    .await;
    seed_customer_session(
        &store,
        user.id,
        &[(103, cabinet("painted", "sage", "nickel"), 1)],
    )
    .await;

    let (trigger, notifier) = build_trigger(&store);
    let outcome = trigger.request_consolidation(Some(&user)).await;

    let TriggerOutcome::Completed(result) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert!(
        result
            .actions
            .iter()
            .any(|action| matches!(action, ConsolidationAction::MergedSessions { .. })),
        "expected at least one merge action: {result:?}"
    );

    // The oldest session survives and holds the union of lines
    let sessions = sessions_of(&store, user.id).await;
    assert_eq!(sessions.len(), 1);
    let survivor = sessions.first().expect("one session");
    assert_eq!(survivor.id, first);
    assert_eq!(survivor.lines.len(), 3);
    assert_eq!(survivor.total_quantity(), 4);

    let notices = notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices.first().map(|notice| notice.level),
        Some(NoticeLevel::Success)
    );
}

#[tokio::test]
async fn test_consolidation_is_idempotent() {
    let store = InMemoryCartStore::new();
    let user = test_user(2);

    seed_customer_session(
        &store,
        user.id,
        &[(101, cabinet("natural oak", "sand", "matte black"), 1)],
    )
    .await;
    seed_customer_session(
        &store,
        user.id,
        &[(102, cabinet("walnut stain", "espresso", "brass"), 1)],
    )
    .await;

    let (trigger, _notifier) = build_trigger(&store);

    let first = trigger.request_consolidation(Some(&user)).await;
    assert!(matches!(first, TriggerOutcome::Completed(result) if !result.is_noop()));

    // Second run finds a consistent cart and reports nothing to do
    let second = trigger.request_consolidation(Some(&user)).await;
    assert!(matches!(second, TriggerOutcome::Completed(result) if result.is_noop()));
    assert_eq!(sessions_of(&store, user.id).await.len(), 1);
}

#[tokio::test]
async fn test_anonymous_request_is_silent() {
    let store = InMemoryCartStore::new();
    let (trigger, notifier) = build_trigger(&store);

    let outcome = trigger.request_consolidation(None).await;
    assert_eq!(outcome, TriggerOutcome::SkippedAnonymous);
    assert!(notifier.is_empty());
    assert!(!trigger.is_consolidating(CustomerId::new(1)));
}

#[tokio::test]
async fn test_duplicate_lines_collapse_across_sessions() {
    let store = InMemoryCartStore::new();
    let user = test_user(3);
    let options = cabinet("natural oak", "sand", "matte black");

    seed_customer_session(&store, user.id, &[(101, options.clone(), 2)]).await;
    seed_customer_session(&store, user.id, &[(101, options, 3)]).await;

    let (trigger, _notifier) = build_trigger(&store);
    let outcome = trigger.request_consolidation(Some(&user)).await;
    assert!(matches!(outcome, TriggerOutcome::Completed(_)));

    let sessions = sessions_of(&store, user.id).await;
    assert_eq!(sessions.len(), 1);
    let survivor = sessions.first().expect("one session");
    assert_eq!(survivor.lines.len(), 1);
    assert_eq!(survivor.total_quantity(), 5);
}

#[tokio::test]
async fn test_empty_extra_session_is_removed() {
    let store = InMemoryCartStore::new();
    let user = test_user(4);

    let first = seed_customer_session(
        &store,
        user.id,
        &[(101, cabinet("painted", "sage", "nickel"), 1)],
    )
    .await;
    let empty: CartSessionId = seed_customer_session(&store, user.id, &[]).await;

    let (trigger, _notifier) = build_trigger(&store);
    let outcome = trigger.request_consolidation(Some(&user)).await;

    let TriggerOutcome::Completed(result) = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert!(
        result
            .actions
            .iter()
            .any(|action| matches!(
                action,
                ConsolidationAction::RemovedEmptySession { id } if *id == empty
            )),
        "expected the empty session to be reported removed: {result:?}"
    );

    let sessions = sessions_of(&store, user.id).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions.first().map(|session| session.id), Some(first));
}

#[tokio::test]
async fn test_login_reconciliation_after_claiming_anonymous_cart() {
    let store = InMemoryCartStore::new();
    let user = test_user(5);

    // Customer already had a cart from a previous visit
    seed_customer_session(
        &store,
        user.id,
        &[(101, cabinet("natural oak", "sand", "matte black"), 1)],
    )
    .await;

    // They shopped anonymously, then logged in; the anonymous session is
    // claimed for them before reconciliation runs
    let anon_scope = heartwood_core::cart::CartScope::Anonymous(uuid_for_test());
    let anon = store
        .create_session(anon_scope)
        .await
        .expect("create anonymous session");
    store
        .add_line(
            anon.id,
            heartwood_storefront::services::carts::NewLineItem {
                product_type: heartwood_core::ProductTypeId::new(102),
                options: cabinet("walnut stain", "espresso", "brass"),
                quantity: 1,
                unit_price: rust_decimal::Decimal::new(735_00, 2),
            },
        )
        .await
        .expect("add line");
    store
        .claim_session(anon.id, user.id)
        .await
        .expect("claim session");

    let (trigger, notifier) = build_trigger(&store);
    let outcome = trigger.reconcile_after_login(&user).await;
    assert!(matches!(outcome, TriggerOutcome::Completed(result) if !result.is_noop()));

    let sessions = sessions_of(&store, user.id).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        sessions.first().map(|session| session.lines.len()),
        Some(2)
    );

    // Reconciliation repaired something, so the customer is told
    assert_eq!(notifier.len(), 1);
}

fn uuid_for_test() -> uuid::Uuid {
    uuid::Uuid::from_u128(0x5eed_cafe)
}
