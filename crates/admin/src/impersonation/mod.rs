//! Customer impersonation for admin support work.
//!
//! An admin "becomes" a customer to inspect and fix their cart. Each admin
//! gets at most one active impersonation at a time, tracked here together
//! with the save-status banner state for that session.

pub mod save_status;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use heartwood_core::{AdminUserId, CustomerId};

pub use save_status::{SaveStatus, SaveStatusSnapshot, SaveStatusTracker};

/// One admin's active impersonation.
#[derive(Debug, Clone)]
pub struct ImpersonationSession {
    pub customer: CustomerId,
    pub tracker: SaveStatusTracker,
}

/// Registry of active impersonations, keyed by admin user.
#[derive(Debug, Default)]
pub struct ImpersonationRegistry {
    sessions: Mutex<HashMap<AdminUserId, ImpersonationSession>>,
}

impl ImpersonationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AdminUserId, ImpersonationSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start impersonating `customer` as `admin`.
    ///
    /// Replaces any existing impersonation for the same admin; the replaced
    /// session's tracker is dropped, which aborts its pending timer.
    pub fn start(&self, admin: AdminUserId, customer: CustomerId) -> SaveStatusTracker {
        let tracker = SaveStatusTracker::new();
        tracker.begin_impersonation();

        let session = ImpersonationSession {
            customer,
            tracker: tracker.clone(),
        };
        if let Some(previous) = self.lock().insert(admin, session) {
            previous.tracker.end_impersonation();
            tracing::info!(
                admin = admin.as_i32(),
                previous_customer = previous.customer.as_i32(),
                customer = customer.as_i32(),
                "Replaced active impersonation"
            );
        }
        tracker
    }

    /// Stop the admin's active impersonation, if any.
    ///
    /// Returns `true` if there was one to stop.
    pub fn stop(&self, admin: AdminUserId) -> bool {
        match self.lock().remove(&admin) {
            Some(session) => {
                session.tracker.end_impersonation();
                true
            }
            None => false,
        }
    }

    /// Look up the admin's active impersonation.
    #[must_use]
    pub fn session_for(&self, admin: AdminUserId) -> Option<ImpersonationSession> {
        self.lock().get(&admin).cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_stop_lifecycle() {
        let registry = ImpersonationRegistry::new();
        let admin = AdminUserId::new(1);
        let customer = CustomerId::new(42);

        assert!(registry.session_for(admin).is_none());

        registry.start(admin, customer);
        let session = registry.session_for(admin).unwrap();
        assert_eq!(session.customer, customer);
        assert!(session.tracker.snapshot().is_impersonating);

        assert!(registry.stop(admin));
        assert!(registry.session_for(admin).is_none());
        assert!(!registry.stop(admin));
    }

    #[tokio::test]
    async fn test_restart_replaces_customer() {
        let registry = ImpersonationRegistry::new();
        let admin = AdminUserId::new(1);

        let first = registry.start(admin, CustomerId::new(7));
        first.mark_as_unsaved();

        registry.start(admin, CustomerId::new(8));
        let session = registry.session_for(admin).unwrap();
        assert_eq!(session.customer, CustomerId::new(8));

        // Fresh tracker, no carried-over unsaved flag
        assert!(!session.tracker.snapshot().cart_has_unsaved_changes);
        // The replaced tracker left impersonation mode
        assert!(!first.snapshot().is_impersonating);
    }

    #[tokio::test]
    async fn test_admins_are_independent() {
        let registry = ImpersonationRegistry::new();
        registry.start(AdminUserId::new(1), CustomerId::new(10));
        registry.start(AdminUserId::new(2), CustomerId::new(20));

        assert!(registry.stop(AdminUserId::new(1)));
        assert!(registry.session_for(AdminUserId::new(2)).is_some());
    }
}
