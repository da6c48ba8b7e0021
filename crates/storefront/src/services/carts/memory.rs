//! In-memory cart store implementation for testing.
//!
//! Stores all sessions in memory behind an `RwLock` and provides the same
//! interface and ordering guarantees as the `PostgreSQL` implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use heartwood_core::cart::{CartLineItem, CartScope, CartSession};
use heartwood_core::{CartSessionId, CustomerId, LineItemId};

use super::{CartStore, CartStoreError, NewLineItem};

/// In-memory [`CartStore`] used by unit and integration tests.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    sessions: BTreeMap<CartSessionId, CartSession>,
    next_session_id: i32,
    next_line_id: i32,
}

impl InMemoryCartStore {
    /// Creates a new empty in-memory cart store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of sessions stored, across all scopes.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn sessions_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<CartSession>, CartStoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<CartSession> = inner
            .sessions
            .values()
            .filter(|session| session.scope.customer() == Some(customer))
            .cloned()
            .collect();
        sessions.sort_by_key(|session| (session.created_at, session.id));
        Ok(sessions)
    }

    async fn find_session(
        &self,
        scope: &CartScope,
    ) -> Result<Option<CartSession>, CartStoreError> {
        match scope {
            CartScope::Customer(customer) => Ok(self
                .sessions_for_customer(*customer)
                .await?
                .into_iter()
                .next()),
            CartScope::Anonymous(_) => {
                let inner = self.inner.read().await;
                Ok(inner
                    .sessions
                    .values()
                    .find(|session| &session.scope == scope)
                    .cloned())
            }
        }
    }

    async fn create_session(&self, scope: CartScope) -> Result<CartSession, CartStoreError> {
        let mut inner = self.inner.write().await;
        inner.next_session_id += 1;
        let session = CartSession {
            id: CartSessionId::new(inner.next_session_id),
            scope,
            created_at: Utc::now(),
            lines: Vec::new(),
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn add_line(
        &self,
        session: CartSessionId,
        line: NewLineItem,
    ) -> Result<CartLineItem, CartStoreError> {
        let mut inner = self.inner.write().await;
        inner.next_line_id += 1;
        let id = LineItemId::new(inner.next_line_id);
        let entry = inner
            .sessions
            .get_mut(&session)
            .ok_or(CartStoreError::SessionNotFound(session))?;
        let line = CartLineItem {
            id,
            product_type: line.product_type,
            options: line.options,
            quantity: line.quantity,
            unit_price: line.unit_price,
        };
        entry.lines.push(line.clone());
        Ok(line)
    }

    async fn update_line_quantity(
        &self,
        line: LineItemId,
        quantity: u32,
    ) -> Result<(), CartStoreError> {
        let mut inner = self.inner.write().await;
        for session in inner.sessions.values_mut() {
            if let Some(entry) = session.lines.iter_mut().find(|entry| entry.id == line) {
                entry.quantity = quantity;
                return Ok(());
            }
        }
        Err(CartStoreError::LineNotFound(line))
    }

    async fn remove_line(&self, line: LineItemId) -> Result<(), CartStoreError> {
        let mut inner = self.inner.write().await;
        for session in inner.sessions.values_mut() {
            if let Some(index) = session.lines.iter().position(|entry| entry.id == line) {
                session.lines.remove(index);
                return Ok(());
            }
        }
        Err(CartStoreError::LineNotFound(line))
    }

    async fn claim_session(
        &self,
        session: CartSessionId,
        customer: CustomerId,
    ) -> Result<(), CartStoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .get_mut(&session)
            .ok_or(CartStoreError::SessionNotFound(session))?;
        entry.scope = CartScope::Customer(customer);
        Ok(())
    }

    async fn merge_sessions(
        &self,
        canonical: CartSessionId,
        lines: Option<Vec<CartLineItem>>,
        extras: Vec<CartSessionId>,
    ) -> Result<(), CartStoreError> {
        let mut inner = self.inner.write().await;

        // Validate everything before mutating anything
        for extra in &extras {
            if !inner.sessions.contains_key(extra) {
                return Err(CartStoreError::SessionNotFound(*extra));
            }
        }
        let entry = inner
            .sessions
            .get_mut(&canonical)
            .ok_or(CartStoreError::SessionNotFound(canonical))?;

        if let Some(lines) = lines {
            entry.lines = lines;
        }
        for extra in extras {
            inner.sessions.remove(&extra);
        }
        Ok(())
    }
}
