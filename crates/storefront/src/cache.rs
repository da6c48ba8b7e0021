//! Cart view cache.
//!
//! Route handlers read the current cart through this cache so repeated
//! renders (page, count badge, fragments) don't hit storage every time.
//! Anything that mutates cart state must invalidate the scope's entry;
//! the consolidation trigger does so after every successful run.

use std::time::Duration;

use moka::future::Cache;

use heartwood_core::cart::{CartScope, CartSession};

use crate::config::CartCacheConfig;
use crate::services::carts::{CartStore, CartStoreError};

/// Cache key for cart data, one entry per cart scope.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    CartData(CartScope),
}

/// Moka-backed cache of the last-fetched cart session per scope.
#[derive(Clone)]
pub struct CartViewCache {
    inner: Cache<CacheKey, Option<CartSession>>,
}

impl CartViewCache {
    /// Create a cache with the configured capacity and TTL.
    #[must_use]
    pub fn new(config: CartCacheConfig) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(Duration::from_secs(config.ttl_secs))
                .build(),
        }
    }

    /// The cart session for a scope, from cache or loaded through `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the load fails; failures are not cached.
    pub async fn session_for(
        &self,
        scope: &CartScope,
        store: &dyn CartStore,
    ) -> Result<Option<CartSession>, CartStoreError> {
        self.inner
            .try_get_with(CacheKey::CartData(scope.clone()), store.find_session(scope))
            .await
            .map_err(|error| (*error).clone())
    }

    /// Drop the cached entry for a scope so the next read refetches.
    pub async fn invalidate(&self, scope: &CartScope) {
        self.inner
            .invalidate(&CacheKey::CartData(scope.clone()))
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use heartwood_core::CustomerId;

    use super::*;
    use crate::services::carts::InMemoryCartStore;

    #[tokio::test]
    async fn test_serves_stale_until_invalidated() {
        let store = InMemoryCartStore::new();
        let cache = CartViewCache::new(CartCacheConfig::default());
        let scope = CartScope::Customer(CustomerId::new(1));

        // Cache the empty result
        assert!(cache.session_for(&scope, &store).await.unwrap().is_none());

        store.create_session(scope.clone()).await.unwrap();

        // Still cached
        assert!(cache.session_for(&scope, &store).await.unwrap().is_none());

        cache.invalidate(&scope).await;
        assert!(cache.session_for(&scope, &store).await.unwrap().is_some());
    }
}
