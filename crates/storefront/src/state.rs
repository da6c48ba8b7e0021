//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CartViewCache;
use crate::config::StorefrontConfig;
use crate::db::PgCartStore;
use crate::services::carts::CartStore;
use crate::services::consolidation::{CartConsolidator, ConsolidationTrigger};
use crate::services::notify::{Notifier, TracingNotifier};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the cart store, cache and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carts: Arc<dyn CartStore>,
    cache: CartViewCache,
    trigger: Arc<ConsolidationTrigger>,
}

impl AppState {
    /// Create the production application state over the `PostgreSQL` store.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let carts: Arc<dyn CartStore> = Arc::new(PgCartStore::new(pool.clone()));
        Self::with_store(config, pool, carts, Arc::new(TracingNotifier))
    }

    /// Create application state over an explicit store and notifier.
    ///
    /// Lets tests swap in the in-memory store and a recording notifier
    /// without touching the wiring below.
    #[must_use]
    pub fn with_store(
        config: StorefrontConfig,
        pool: PgPool,
        carts: Arc<dyn CartStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cache = CartViewCache::new(config.cart_cache);
        let executor = Arc::new(CartConsolidator::new(carts.clone()));
        let trigger = Arc::new(ConsolidationTrigger::new(
            executor,
            cache.clone(),
            notifier,
        ));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts,
                cache,
                trigger,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &dyn CartStore {
        self.inner.carts.as_ref()
    }

    /// Get a reference to the cart view cache.
    #[must_use]
    pub fn cart_cache(&self) -> &CartViewCache {
        &self.inner.cache
    }

    /// Get a reference to the consolidation trigger.
    #[must_use]
    pub fn trigger(&self) -> &ConsolidationTrigger {
        &self.inner.trigger
    }
}
