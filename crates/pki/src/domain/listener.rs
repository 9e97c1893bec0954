//! Update error notification channel of trust stores.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::error::TrustStoreError;
use super::types::{ResourceCategory, Severity};

/// Receives problems found while (re)loading trust material.
///
/// Called synchronously from the loading thread or refresh task. A panicking
/// implementation is contained and logged; it never reaches the store.
pub trait UpdateErrorListener: Send + Sync {
    fn on_update_error(
        &self,
        location: &str,
        category: ResourceCategory,
        severity: Severity,
        cause: &TrustStoreError,
    );
}

impl<F> UpdateErrorListener for F
where
    F: Fn(&str, ResourceCategory, Severity, &TrustStoreError) + Send + Sync,
{
    fn on_update_error(
        &self,
        location: &str,
        category: ResourceCategory,
        severity: Severity,
        cause: &TrustStoreError,
    ) {
        self(location, category, severity, cause)
    }
}

/// Copy-on-write set of listeners keyed by `Arc` identity.
///
/// Dispatch iterates an immutable list, so registration changes never race
/// with a notification in flight.
pub struct ListenerRegistry {
    listeners: ArcSwap<Vec<Arc<dyn UpdateErrorListener>>>,
}

impl ListenerRegistry {
    pub fn new<I>(initial: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
    {
        let registry = Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        };
        for l in initial {
            registry.add(l);
        }
        registry
    }

    /// Registers `listener`; adding an already registered listener is a no-op.
    pub fn add(&self, listener: Arc<dyn UpdateErrorListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            if !next.iter().any(|l| same_listener(l, &listener)) {
                next.push(Arc::clone(&listener));
            }
            next
        });
    }

    pub fn remove(&self, listener: &Arc<dyn UpdateErrorListener>) {
        self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|l| !same_listener(l, listener))
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    pub fn clear(&self) {
        self.listeners.store(Arc::new(Vec::new()));
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Calls every registered listener exactly once.
    pub fn notify(
        &self,
        location: &str,
        category: ResourceCategory,
        severity: Severity,
        cause: &TrustStoreError,
    ) {
        let listeners = self.listeners.load_full();
        for listener in listeners.iter() {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                listener.on_update_error(location, category, severity, cause)
            }));
            if delivered.is_err() {
                tracing::error!(
                    "update error listener panicked while handling {} problem at {}",
                    category,
                    location
                );
            }
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

// Data pointers only; vtable pointers of the same object may differ between
// codegen units.
fn same_listener(a: &Arc<dyn UpdateErrorListener>, b: &Arc<dyn UpdateErrorListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, Arc<dyn UpdateErrorListener>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let listener: Arc<dyn UpdateErrorListener> =
            Arc::new(move |_: &str, _: ResourceCategory, _: Severity, _: &TrustStoreError| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        (hits, listener)
    }

    fn cause() -> TrustStoreError {
        TrustStoreError::InvalidConfig("test".into())
    }

    #[test]
    fn adding_twice_registers_once() {
        let registry = ListenerRegistry::default();
        let (hits, l) = counting();
        registry.add(Arc::clone(&l));
        registry.add(Arc::clone(&l));
        assert_eq!(registry.len(), 1);

        registry.notify("x", ResourceCategory::CaCert, Severity::Error, &cause());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let registry = ListenerRegistry::default();
        let (hits_a, a) = counting();
        let (hits_b, b) = counting();
        registry.add(Arc::clone(&a));
        registry.add(Arc::clone(&b));
        registry.remove(&a);

        registry.notify("x", ResourceCategory::CaCert, Severity::Error, &cause());
        assert_eq!(hits_a.load(Ordering::SeqCst), 0);
        assert_eq!(hits_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_dispatch() {
        let registry = ListenerRegistry::default();
        let bad: Arc<dyn UpdateErrorListener> =
            Arc::new(|_: &str, _: ResourceCategory, _: Severity, _: &TrustStoreError| {
                panic!("listener failure");
            });
        let (hits, good) = counting();
        registry.add(bad);
        registry.add(good);

        registry.notify("x", ResourceCategory::CaCert, Severity::Error, &cause());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_releases_everything() {
        let (_, l) = counting();
        let registry = ListenerRegistry::new(vec![Arc::clone(&l)]);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(Arc::strong_count(&l), 1);
    }
}
