//! Shared application state for the admin portal.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::impersonation::ImpersonationRegistry;

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    impersonation: ImpersonationRegistry,
}

/// Cloneable handle to shared state, passed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                impersonation: ImpersonationRegistry::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn impersonation(&self) -> &ImpersonationRegistry {
        &self.inner.impersonation
    }
}
