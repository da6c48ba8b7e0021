//! The consolidation executor.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use heartwood_core::CustomerId;
use heartwood_core::cart::{
    CartLineItem, ConsolidationAction, ConsolidationResult, LineKey,
};

use crate::services::carts::{CartStore, CartStoreError};

/// Errors from a consolidation run.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error(transparent)]
    Store(#[from] CartStoreError),
}

/// The consolidation contract the trigger depends on.
///
/// Implementations must be idempotent: running against an already-consistent
/// cart returns `Ok` with an empty action list, never an error, and repeated
/// runs converge to a single session per customer.
#[async_trait]
pub trait ConsolidationExecutor: Send + Sync {
    async fn consolidate(
        &self,
        customer: CustomerId,
    ) -> Result<ConsolidationResult, ConsolidationError>;
}

/// Production executor: merges a customer's cart sessions in the store.
///
/// The oldest session survives; every other session has its lines folded in
/// (duplicate lines collapse, summing quantities) and is then deleted.
/// Sessions that were already empty are deleted without a merge.
pub struct CartConsolidator {
    store: Arc<dyn CartStore>,
}

impl CartConsolidator {
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConsolidationExecutor for CartConsolidator {
    async fn consolidate(
        &self,
        customer: CustomerId,
    ) -> Result<ConsolidationResult, ConsolidationError> {
        let mut sessions = self.store.sessions_for_customer(customer).await?;
        if sessions.is_empty() {
            return Ok(ConsolidationResult::noop());
        }

        // Oldest session is canonical; find_session points readers at it too.
        let canonical = sessions.remove(0);
        let extras = sessions;

        let mut merged = 0usize;
        let mut removed_empty = Vec::new();
        let mut lines = canonical.lines.clone();
        for extra in &extras {
            if extra.is_empty() {
                removed_empty.push(extra.id);
            } else {
                merged += 1;
                lines.extend(extra.lines.iter().cloned());
            }
        }

        let (collapsed, duplicates) = collapse_duplicate_lines(lines);

        let mut actions = Vec::new();
        if merged > 0 {
            actions.push(ConsolidationAction::MergedSessions {
                merged,
                into: canonical.id,
            });
        }
        for id in removed_empty {
            actions.push(ConsolidationAction::RemovedEmptySession { id });
        }
        if duplicates > 0 {
            actions.push(ConsolidationAction::CollapsedDuplicateLines {
                removed: duplicates,
            });
        }

        if actions.is_empty() {
            return Ok(ConsolidationResult::noop());
        }

        // One atomic store call: a failure part-way must not leave the cart
        // half-merged, or a retry would double-count quantities.
        let lines = (merged > 0 || duplicates > 0).then_some(collapsed);
        let extra_ids = extras.iter().map(|extra| extra.id).collect();
        self.store.merge_sessions(canonical.id, lines, extra_ids).await?;

        tracing::info!(
            customer = %customer,
            survivor = %canonical.id,
            actions = actions.len(),
            "consolidated cart sessions"
        );

        Ok(ConsolidationResult { actions })
    }
}

/// Collapse duplicate lines in order, summing quantities into the first
/// occurrence. Returns the surviving lines and the number removed.
fn collapse_duplicate_lines(lines: Vec<CartLineItem>) -> (Vec<CartLineItem>, usize) {
    let mut surviving: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    let mut seen: HashMap<LineKey, usize> = HashMap::new();
    let mut removed = 0usize;

    for line in lines {
        match seen.entry(line.dedup_key()) {
            Entry::Occupied(slot) => {
                if let Some(existing) = surviving.get_mut(*slot.get()) {
                    existing.quantity += line.quantity;
                }
                removed += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(surviving.len());
                surviving.push(line);
            }
        }
    }

    (surviving, removed)
}
