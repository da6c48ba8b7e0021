//! Consolidation result types.
//!
//! Produced by the consolidation executor, consumed read-only by the
//! storefront trigger for display. The wire contract is the rendered form:
//! `{ "actions": ["Merged 2 cart sessions into one", ...] }`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::CartSessionId;

/// One repair performed during cart consolidation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConsolidationAction {
    /// Extra sessions had their lines folded into the surviving session.
    MergedSessions {
        /// Number of sessions folded in (not counting the survivor).
        merged: usize,
        /// The surviving session.
        into: CartSessionId,
    },
    /// A session with no line items was deleted.
    RemovedEmptySession { id: CartSessionId },
    /// Duplicate line items were combined, summing quantities.
    CollapsedDuplicateLines { removed: usize },
}

impl fmt::Display for ConsolidationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergedSessions { merged, .. } => {
                if *merged == 1 {
                    write!(f, "Merged a duplicate cart into your cart")
                } else {
                    write!(f, "Merged {merged} duplicate carts into your cart")
                }
            }
            Self::RemovedEmptySession { .. } => write!(f, "Removed an empty cart"),
            Self::CollapsedDuplicateLines { removed } => {
                if *removed == 1 {
                    write!(f, "Combined a duplicate item")
                } else {
                    write!(f, "Combined {removed} duplicate items")
                }
            }
        }
    }
}

/// Response envelope for one consolidation run.
///
/// An empty action list is a successful no-op: running consolidation on an
/// already-consistent cart is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationResult {
    /// Ordered list of repairs, in the order they were applied.
    pub actions: Vec<ConsolidationAction>,
}

impl ConsolidationResult {
    /// A successful run that found nothing to repair.
    #[must_use]
    pub const fn noop() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// True when no repairs were performed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    /// Human-readable action descriptions, one per action, in order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().map(ToString::to_string).collect()
    }

    /// All action descriptions joined as a single notification message.
    #[must_use]
    pub fn summary(&self) -> String {
        self.descriptions().join(". ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pluralization() {
        let one = ConsolidationAction::MergedSessions {
            merged: 1,
            into: CartSessionId::new(5),
        };
        assert_eq!(one.to_string(), "Merged a duplicate cart into your cart");

        let many = ConsolidationAction::CollapsedDuplicateLines { removed: 3 };
        assert_eq!(many.to_string(), "Combined 3 duplicate items");
    }

    #[test]
    fn test_summary_joins_in_order() {
        let result = ConsolidationResult {
            actions: vec![
                ConsolidationAction::MergedSessions {
                    merged: 2,
                    into: CartSessionId::new(1),
                },
                ConsolidationAction::RemovedEmptySession {
                    id: CartSessionId::new(9),
                },
            ],
        };
        assert_eq!(
            result.summary(),
            "Merged 2 duplicate carts into your cart. Removed an empty cart"
        );
        assert!(!result.is_noop());
    }

    #[test]
    fn test_noop() {
        assert!(ConsolidationResult::noop().is_noop());
        assert_eq!(ConsolidationResult::noop().summary(), "");
    }
}
