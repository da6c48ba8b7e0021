//! Integration tests for Heartwood.
//!
//! These tests exercise the storefront and admin library crates together,
//! in process, over the in-memory cart store. No database or running server
//! is required.
//!
//! Run with: `cargo test -p heartwood-integration-tests`

use std::sync::Arc;

use rust_decimal::Decimal;

use heartwood_core::cart::{CabinetOptions, CartScope, CartSession};
use heartwood_core::{CartSessionId, CustomerId, Email, ProductTypeId};
use heartwood_storefront::cache::CartViewCache;
use heartwood_storefront::config::CartCacheConfig;
use heartwood_storefront::models::CurrentUser;
use heartwood_storefront::services::carts::{CartStore, InMemoryCartStore, NewLineItem};
use heartwood_storefront::services::consolidation::{CartConsolidator, ConsolidationTrigger};
use heartwood_storefront::services::notify::RecordingNotifier;

/// A customer with a deterministic email, for tests that need an identity.
///
/// # Panics
///
/// Panics if the fixed test email fails to parse.
#[must_use]
pub fn test_user(id: i32) -> CurrentUser {
    CurrentUser {
        id: CustomerId::new(id),
        email: Email::parse("tester@example.com").expect("valid test email"),
    }
}

/// Shorthand for a cabinet configuration.
#[must_use]
pub fn cabinet(finish: &str, color: &str, hardware: &str) -> CabinetOptions {
    CabinetOptions {
        finish: finish.to_string(),
        color: color.to_string(),
        hardware: hardware.to_string(),
    }
}

/// Seed a session for a customer with the given lines.
///
/// Each line is `(product_type_id, options, quantity)`; unit price is fixed
/// since pricing is irrelevant to consolidation.
///
/// # Panics
///
/// Panics if the in-memory store rejects a seed operation.
pub async fn seed_customer_session(
    store: &InMemoryCartStore,
    customer: CustomerId,
    lines: &[(i32, CabinetOptions, u32)],
) -> CartSessionId {
    let session = store
        .create_session(CartScope::Customer(customer))
        .await
        .expect("create session");

    for (product, options, quantity) in lines {
        store
            .add_line(
                session.id,
                NewLineItem {
                    product_type: ProductTypeId::new(*product),
                    options: options.clone(),
                    quantity: *quantity,
                    unit_price: Decimal::new(640_00, 2),
                },
            )
            .await
            .expect("add line");
    }

    session.id
}

/// A trigger wired to the given store, with a recording notifier.
#[must_use]
pub fn build_trigger(
    store: &InMemoryCartStore,
) -> (Arc<ConsolidationTrigger>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let executor = Arc::new(CartConsolidator::new(Arc::new(store.clone())));
    let trigger = Arc::new(ConsolidationTrigger::new(
        executor,
        CartViewCache::new(CartCacheConfig::default()),
        notifier.clone(),
    ));
    (trigger, notifier)
}

/// The customer's sessions, oldest first.
///
/// # Panics
///
/// Panics if the in-memory store fails.
pub async fn sessions_of(store: &InMemoryCartStore, customer: CustomerId) -> Vec<CartSession> {
    store
        .sessions_for_customer(customer)
        .await
        .expect("list sessions")
}
