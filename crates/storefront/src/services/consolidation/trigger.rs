//! The consolidation trigger.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use heartwood_core::CustomerId;
use heartwood_core::cart::{CartScope, ConsolidationResult};

use crate::cache::CartViewCache;
use crate::models::CurrentUser;
use crate::services::notify::{Notice, Notifier};

use super::ConsolidationExecutor;

/// Outcome of one trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The executor ran; the result may be a no-op.
    Completed(ConsolidationResult),
    /// The executor failed. Already logged and notified; cache untouched.
    Failed,
    /// No resolvable identity; nothing was invoked.
    SkippedAnonymous,
    /// A run for this customer is already outstanding.
    AlreadyRunning,
}

/// Decides when consolidation runs and surfaces the outcome.
///
/// Holds no cart state. Exactly one run may be outstanding per customer;
/// concurrent requests while a run is in flight return
/// [`TriggerOutcome::AlreadyRunning`] without invoking the executor.
pub struct ConsolidationTrigger {
    executor: Arc<dyn ConsolidationExecutor>,
    cache: CartViewCache,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<HashSet<CustomerId>>,
}

/// Releases the customer's in-flight slot when the run ends, including when
/// the request future is dropped mid-await (client disconnect).
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<CustomerId>>,
    customer: CustomerId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.customer);
    }
}

impl ConsolidationTrigger {
    #[must_use]
    pub fn new(
        executor: Arc<dyn ConsolidationExecutor>,
        cache: CartViewCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            executor,
            cache,
            notifier,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// True strictly while a run for this customer is outstanding.
    pub fn is_consolidating(&self, customer: CustomerId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&customer)
    }

    /// User-invoked consolidation.
    ///
    /// Anonymous callers are a silent no-op (the control is hidden from
    /// them; reaching this without an identity is not an error). Notifies
    /// on every completed run, including "nothing to do".
    pub async fn request_consolidation(&self, user: Option<&CurrentUser>) -> TriggerOutcome {
        self.run(user, true).await
    }

    /// Login-time reconciliation hook.
    ///
    /// Invoked after an anonymous cart is claimed at login. Relies on
    /// executor idempotence instead of probing for dual-session state, and
    /// stays quiet when there was nothing to repair.
    pub async fn reconcile_after_login(&self, user: &CurrentUser) -> TriggerOutcome {
        self.run(Some(user), false).await
    }

    async fn run(&self, user: Option<&CurrentUser>, notify_noop: bool) -> TriggerOutcome {
        let Some(user) = user else {
            return TriggerOutcome::SkippedAnonymous;
        };

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(user.id) {
                return TriggerOutcome::AlreadyRunning;
            }
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            customer: user.id,
        };

        let outcome = self.executor.consolidate(user.id).await;

        match outcome {
            Ok(result) => {
                // Server state may have changed; refetch on next read.
                self.cache.invalidate(&CartScope::Customer(user.id)).await;

                if result.is_noop() {
                    if notify_noop {
                        self.notifier.notify(Notice::success(
                            "Cart checked",
                            "Your cart was already tidy.",
                        ));
                    }
                } else {
                    self.notifier
                        .notify(Notice::success("Cart cleaned up", result.summary()));
                }
                TriggerOutcome::Completed(result)
            }
            Err(error) => {
                tracing::error!(customer = %user.id, error = %error, "cart consolidation failed");
                self.notifier.notify(Notice::error(
                    "Cart cleanup failed",
                    "We couldn't tidy your cart. Your items are unchanged.",
                ));
                TriggerOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use heartwood_core::Email;

    use super::*;
    use crate::config::CartCacheConfig;
    use crate::services::carts::CartStoreError;
    use crate::services::consolidation::ConsolidationError;
    use crate::services::notify::{NoticeLevel, RecordingNotifier};

    fn user(id: i32) -> CurrentUser {
        CurrentUser {
            id: CustomerId::new(id),
            email: Email::parse("customer@example.com").unwrap(),
        }
    }

    /// Executor that counts calls and blocks until released.
    #[derive(Default)]
    struct GatedExecutor {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl ConsolidationExecutor for GatedExecutor {
        async fn consolidate(
            &self,
            _customer: CustomerId,
        ) -> Result<ConsolidationResult, ConsolidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(ConsolidationResult::noop())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl ConsolidationExecutor for FailingExecutor {
        async fn consolidate(
            &self,
            _customer: CustomerId,
        ) -> Result<ConsolidationResult, ConsolidationError> {
            Err(ConsolidationError::Store(CartStoreError::Storage(
                "connection reset".to_owned(),
            )))
        }
    }

    fn trigger_with(executor: Arc<dyn ConsolidationExecutor>) -> (Arc<ConsolidationTrigger>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let trigger = Arc::new(ConsolidationTrigger::new(
            executor,
            CartViewCache::new(CartCacheConfig::default()),
            notifier.clone(),
        ));
        (trigger, notifier)
    }

    #[tokio::test]
    async fn test_anonymous_is_silent_noop() {
        let executor = Arc::new(GatedExecutor::default());
        let (trigger, notifier) = trigger_with(executor.clone());

        let outcome = trigger.request_consolidation(None).await;
        assert_eq!(outcome, TriggerOutcome::SkippedAnonymous);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(notifier.is_empty());
        assert!(!trigger.is_consolidating(CustomerId::new(1)));
    }

    #[tokio::test]
    async fn test_reentrancy_guard_suppresses_second_call() {
        let executor = Arc::new(GatedExecutor::default());
        let (trigger, _notifier) = trigger_with(executor.clone());
        let customer = user(1);

        let first = tokio::spawn({
            let trigger = trigger.clone();
            let customer = customer.clone();
            async move { trigger.request_consolidation(Some(&customer)).await }
        });

        // Wait until the first call is inside the executor
        while executor.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(trigger.is_consolidating(customer.id));

        // Hammer the trigger while the first call is outstanding
        for _ in 0..3 {
            let outcome = trigger.request_consolidation(Some(&customer)).await;
            assert_eq!(outcome, TriggerOutcome::AlreadyRunning);
        }

        executor.gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert!(!trigger.is_consolidating(customer.id));
    }

    #[tokio::test]
    async fn test_guard_released_when_request_is_cancelled() {
        let executor = Arc::new(GatedExecutor::default());
        let (trigger, _notifier) = trigger_with(executor.clone());
        let customer = user(5);

        let request = tokio::spawn({
            let trigger = trigger.clone();
            let customer = customer.clone();
            async move { trigger.request_consolidation(Some(&customer)).await }
        });

        while executor.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(trigger.is_consolidating(customer.id));

        // The client disconnects mid-run; the request future is dropped
        request.abort();
        let _ = request.await;
        assert!(!trigger.is_consolidating(customer.id));

        // The slot is free again; a fresh request runs the executor
        executor.gate.notify_one();
        let outcome = trigger.request_consolidation(Some(&customer)).await;
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_contained_and_notified() {
        let (trigger, notifier) = trigger_with(Arc::new(FailingExecutor));
        let customer = user(2);

        let outcome = trigger.request_consolidation(Some(&customer)).await;
        assert_eq!(outcome, TriggerOutcome::Failed);
        assert!(!trigger.is_consolidating(customer.id));

        let notices = notifier.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices.first().map(|notice| notice.level),
            Some(NoticeLevel::Error)
        );

        // The guard is released after a failure; a retry is allowed
        let outcome = trigger.request_consolidation(Some(&customer)).await;
        assert_eq!(outcome, TriggerOutcome::Failed);
    }

    #[tokio::test]
    async fn test_login_hook_quiet_on_noop() {
        let executor = Arc::new(GatedExecutor::default());
        executor.gate.notify_one();
        let (trigger, notifier) = trigger_with(executor);

        let customer = user(3);
        let outcome = trigger.reconcile_after_login(&customer).await;
        assert!(matches!(outcome, TriggerOutcome::Completed(result) if result.is_noop()));
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_user_request_notifies_even_on_noop() {
        let executor = Arc::new(GatedExecutor::default());
        executor.gate.notify_one();
        let (trigger, notifier) = trigger_with(executor);

        let customer = user(4);
        let outcome = trigger.request_consolidation(Some(&customer)).await;
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert_eq!(notifier.len(), 1);
    }
}
