//! Save-status tracking for impersonated cart edits.
//!
//! While an admin impersonates a customer, every cart edit walks the
//! `Saving -> Saved` (or `Saving -> Error`) path and the banner polls the
//! tracker for the current state. `Saved` and `Error` are transient: a
//! background timer reverts them to `Idle` after a short window.
//!
//! Timer discipline: every transition cancels the pending timer and bumps a
//! generation counter. A timer that already fired but has not yet run
//! re-checks the generation before touching the state, so a stale timer can
//! never revert a newer status.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

/// How long `Saved` stays visible before reverting to `Idle`.
const SAVED_RESET: Duration = Duration::from_secs(3);

/// How long `Error` stays visible before reverting to `Idle`.
const ERROR_RESET: Duration = Duration::from_secs(5);

/// Current state of the impersonation save banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

/// Point-in-time view of the tracker, serialized for the banner endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveStatusSnapshot {
    pub save_status: SaveStatus,
    pub cart_has_unsaved_changes: bool,
    pub is_impersonating: bool,
}

#[derive(Debug)]
struct Inner {
    status: SaveStatus,
    unsaved_changes: bool,
    impersonating: bool,
    /// Bumped on every transition; guards against stale reset timers.
    generation: u64,
    reset: Option<JoinHandle<()>>,
}

impl Inner {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }
    }
}

/// Shared save-status handle. Cheap to clone; all clones observe the same
/// state.
#[derive(Debug, Clone)]
pub struct SaveStatusTracker {
    inner: Arc<Mutex<Inner>>,
}

impl Default for SaveStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveStatusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: SaveStatus::Idle,
                unsaved_changes: false,
                impersonating: false,
                generation: 0,
                reset: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter impersonation mode with a clean slate.
    pub fn begin_impersonation(&self) {
        let mut inner = self.lock();
        inner.cancel_pending();
        inner.status = SaveStatus::Idle;
        inner.unsaved_changes = false;
        inner.impersonating = true;
    }

    /// Leave impersonation mode and reset all transient state.
    pub fn end_impersonation(&self) {
        let mut inner = self.lock();
        inner.cancel_pending();
        inner.status = SaveStatus::Idle;
        inner.unsaved_changes = false;
        inner.impersonating = false;
    }

    /// Record that the cart form has edits not yet persisted.
    ///
    /// No-op unless impersonating: unsaved-change tracking only matters while
    /// an admin is editing on a customer's behalf.
    pub fn mark_as_unsaved(&self) {
        let mut inner = self.lock();
        if !inner.impersonating {
            return;
        }
        inner.cancel_pending();
        inner.status = SaveStatus::Idle;
        inner.unsaved_changes = true;
    }

    /// A persistence call is in flight.
    pub fn mark_as_saving(&self) {
        let mut inner = self.lock();
        inner.cancel_pending();
        inner.status = SaveStatus::Saving;
    }

    /// The persistence call succeeded. Reverts to `Idle` after 3 seconds.
    pub fn mark_as_saved(&self) {
        let mut inner = self.lock();
        inner.cancel_pending();
        inner.status = SaveStatus::Saved;
        inner.unsaved_changes = false;
        self.schedule_reset(&mut inner, SAVED_RESET);
    }

    /// The persistence call failed. Reverts to `Idle` after 5 seconds.
    pub fn mark_as_error(&self) {
        let mut inner = self.lock();
        inner.cancel_pending();
        inner.status = SaveStatus::Error;
        self.schedule_reset(&mut inner, ERROR_RESET);
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.lock().status
    }

    #[must_use]
    pub fn snapshot(&self) -> SaveStatusSnapshot {
        let inner = self.lock();
        SaveStatusSnapshot {
            save_status: inner.status,
            cart_has_unsaved_changes: inner.unsaved_changes,
            is_impersonating: inner.impersonating,
        }
    }

    /// Schedule a reversion to `Idle` after `delay`.
    ///
    /// The task holds only a weak reference, so a pending timer does not keep
    /// a dropped tracker alive.
    fn schedule_reset(&self, inner: &mut Inner, delay: Duration) {
        let generation = inner.generation;
        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.generation == generation {
                inner.status = SaveStatus::Idle;
                inner.reset = None;
            }
        });
        inner.reset = Some(handle);
    }
}
