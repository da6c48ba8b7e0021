//! Cart domain model.
//!
//! A cart is scoped to either an anonymous browser session or an
//! authenticated customer. Line items describe one configured cabinet each:
//! the product type plus the customer's finish/color/hardware choices.
//!
//! Before consolidation a customer may own several sessions (the anonymous
//! pre-login cart claimed at login, plus an authenticated one). After a
//! successful consolidation at most one session per customer remains; see
//! [`consolidation`] for the repair record types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CartSessionId, CustomerId, LineItemId, ProductTypeId};

pub mod consolidation;

pub use consolidation::{ConsolidationAction, ConsolidationResult};

/// The scope a cart session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartScope {
    /// A pre-login browser session, keyed by an opaque token.
    Anonymous(Uuid),
    /// An authenticated customer.
    Customer(CustomerId),
}

impl CartScope {
    /// The customer this scope belongs to, if authenticated.
    #[must_use]
    pub const fn customer(&self) -> Option<CustomerId> {
        match self {
            Self::Anonymous(_) => None,
            Self::Customer(id) => Some(*id),
        }
    }

    /// True for anonymous (pre-login) scopes.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }
}

/// Configuration choices for one made-to-order cabinet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CabinetOptions {
    /// Wood finish (e.g. "natural oak", "walnut stain").
    pub finish: String,
    /// Paint or stain color name.
    pub color: String,
    /// Hardware line (pulls, hinges).
    pub hardware: String,
}

/// Identity of a line item for duplicate detection.
///
/// Two lines are duplicates when the product type and every configuration
/// choice match; quantity and price are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    product_type: ProductTypeId,
    options: CabinetOptions,
}

/// One configured product entry, owned by exactly one [`CartSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: LineItemId,
    pub product_type: ProductTypeId,
    pub options: CabinetOptions,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartLineItem {
    /// Duplicate-detection key for this line.
    #[must_use]
    pub fn dedup_key(&self) -> LineKey {
        LineKey {
            product_type: self.product_type,
            options: self.options.clone(),
        }
    }

    /// Price for the full quantity of this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// One shopping cart scope and its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSession {
    pub id: CartSessionId,
    pub scope: CartScope,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<CartLineItem>,
}

impl CartSession {
    /// True when the session holds no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Subtotal across all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLineItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    fn line(id: i32, product: i32, finish: &str, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: LineItemId::new(id),
            product_type: ProductTypeId::new(product),
            options: CabinetOptions {
                finish: finish.to_owned(),
                color: "slate".to_owned(),
                hardware: "brass".to_owned(),
            },
            quantity,
            unit_price: dec!(249.50),
        }
    }

    #[test]
    fn test_dedup_key_ignores_quantity_and_id() {
        let a = line(1, 10, "oak", 1);
        let b = line(2, 10, "oak", 3);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_dedup_key_distinguishes_options() {
        let a = line(1, 10, "oak", 1);
        let b = line(2, 10, "walnut", 1);
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_session_totals() {
        let session = CartSession {
            id: CartSessionId::new(1),
            scope: CartScope::Customer(CustomerId::new(7)),
            created_at: Utc::now(),
            lines: vec![line(1, 10, "oak", 2), line(2, 11, "walnut", 1)],
        };
        assert_eq!(session.total_quantity(), 3);
        assert_eq!(session.subtotal(), dec!(748.50));
        assert!(!session.is_empty());
    }

    #[test]
    fn test_scope_customer() {
        let anon = CartScope::Anonymous(Uuid::new_v4());
        assert!(anon.is_anonymous());
        assert_eq!(anon.customer(), None);

        let owned = CartScope::Customer(CustomerId::new(3));
        assert_eq!(owned.customer(), Some(CustomerId::new(3)));
    }
}
