//! The `CartStore` trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use heartwood_core::cart::{CabinetOptions, CartLineItem, CartScope, CartSession};
use heartwood_core::{CartSessionId, CustomerId, LineItemId, ProductTypeId};

/// Errors from cart storage operations.
///
/// `Clone` so cached loader failures can be handed back out of a shared
/// cache entry.
#[derive(Debug, Clone, Error)]
pub enum CartStoreError {
    /// The referenced cart session does not exist.
    #[error("cart session not found: {0}")]
    SessionNotFound(CartSessionId),

    /// The referenced line item does not exist.
    #[error("line item not found: {0}")]
    LineNotFound(LineItemId),

    /// The backing store failed.
    #[error("cart storage error: {0}")]
    Storage(String),
}

/// Data for a line item about to be added to a session.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub product_type: ProductTypeId,
    pub options: CabinetOptions,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Storage operations for cart sessions and their line items.
///
/// The mutating primitives `claim_session` and `merge_sessions` exist for
/// login-time adoption and the consolidation executor; ordinary shopping
/// activity only creates sessions and edits lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// All sessions owned by a customer, ordered by `created_at` then id.
    ///
    /// More than one element means the customer's carts need consolidation.
    async fn sessions_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<CartSession>, CartStoreError>;

    /// The active session for a scope, if any.
    ///
    /// For a customer scope with duplicate sessions this returns the oldest,
    /// which is also the session consolidation keeps.
    async fn find_session(&self, scope: &CartScope)
    -> Result<Option<CartSession>, CartStoreError>;

    /// Create an empty session for a scope.
    async fn create_session(&self, scope: CartScope) -> Result<CartSession, CartStoreError>;

    /// Append a line item to a session.
    async fn add_line(
        &self,
        session: CartSessionId,
        line: NewLineItem,
    ) -> Result<CartLineItem, CartStoreError>;

    /// Set the quantity of an existing line item.
    async fn update_line_quantity(
        &self,
        line: LineItemId,
        quantity: u32,
    ) -> Result<(), CartStoreError>;

    /// Delete a line item.
    async fn remove_line(&self, line: LineItemId) -> Result<(), CartStoreError>;

    /// Rescope an anonymous session to a customer (login-time adoption).
    async fn claim_session(
        &self,
        session: CartSessionId,
        customer: CustomerId,
    ) -> Result<(), CartStoreError>;

    /// Apply the outcome of a consolidation run in one atomic step.
    ///
    /// Replaces the canonical session's lines wholesale when `lines` is
    /// `Some` (`None` leaves them untouched) and deletes the extra sessions
    /// together with their lines. Either every part applies or none does,
    /// so a failed run leaves the cart exactly as it was.
    async fn merge_sessions(
        &self,
        canonical: CartSessionId,
        lines: Option<Vec<CartLineItem>>,
        extras: Vec<CartSessionId>,
    ) -> Result<(), CartStoreError>;
}
