use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use openssl::x509::X509;

use crate::domain::error::TrustStoreError;
use crate::domain::listener::{ListenerRegistry, UpdateErrorListener};
use crate::domain::trust_store::{SourceLoad, TrustAnchorStore};
use crate::domain::types::{ResourceCategory, Severity, TrustAnchor, TrustSnapshot};

/// Trust anchor store over caller supplied certificates.
///
/// Holds the published snapshot and the listener set. It never reloads anything
/// by itself; [`crate::store::RefreshingTrustAnchorStore`] drives it from a source.
pub struct InMemoryTrustAnchorStore {
    location: String,
    snapshot: ArcSwap<TrustSnapshot>,
    listeners: ListenerRegistry,
    disposed: AtomicBool,
}

impl InMemoryTrustAnchorStore {
    /// An empty store; `location` names the material in notifications.
    pub fn new<I>(location: impl Into<String>, listeners: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
    {
        Self {
            location: location.into(),
            snapshot: ArcSwap::from_pointee(TrustSnapshot::empty()),
            listeners: ListenerRegistry::new(listeners),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn from_certificates<I>(
        location: impl Into<String>,
        certificates: Vec<X509>,
        listeners: I,
    ) -> Self
    where
        I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
    {
        let store = Self::new(location, listeners);
        store.update(certificates);
        store
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Replaces the whole snapshot with anchors built from `certificates`.
    ///
    /// Certificates that can not become anchors are skipped and reported
    /// together in one notification. After `dispose` the frozen snapshot is
    /// returned unchanged.
    pub fn update(&self, certificates: Vec<X509>) -> Arc<TrustSnapshot> {
        self.apply(SourceLoad {
            certificates,
            rejected: Vec::new(),
        })
    }

    /// Publishes the certificates of `load`. Its rejected entries, and any
    /// certificate that can not become an anchor, are reported once as a
    /// single [`TrustStoreError::Entries`].
    pub fn apply(&self, load: SourceLoad) -> Arc<TrustSnapshot> {
        if self.is_disposed() {
            tracing::debug!("ignoring update of disposed trust store {}", self.location);
            return self.snapshot.load_full();
        }

        let SourceLoad {
            certificates,
            mut rejected,
        } = load;
        let mut anchors = Vec::with_capacity(certificates.len());
        for (index, cert) in certificates.into_iter().enumerate() {
            match TrustAnchor::from_certificate(cert) {
                Ok(anchor) => anchors.push(anchor),
                Err(e) => rejected.push(TrustStoreError::Certificate {
                    path: self.location.clone().into(),
                    index,
                    reason: e.to_string(),
                }),
            }
        }
        if let Some(cause) = TrustStoreError::entries(&self.location, &rejected) {
            tracing::warn!("skipping trust store entries: {}", cause);
            self.report(&cause);
        }

        let mut installed = None;
        self.snapshot.rcu(|current| {
            let next = Arc::new(TrustSnapshot::new(anchors.clone(), current.generation() + 1));
            installed = Some(Arc::clone(&next));
            next
        });
        let published = installed.unwrap_or_else(|| self.snapshot.load_full());
        tracing::debug!(
            "published trust snapshot #{} for {} with {} anchors",
            published.generation(),
            self.location,
            published.len()
        );
        published
    }

    /// Sends an ERROR / CA certificate notification to every listener.
    pub fn report(&self, cause: &TrustStoreError) {
        self.notify(ResourceCategory::CaCert, Severity::Error, cause);
    }

    pub fn notify(&self, category: ResourceCategory, severity: Severity, cause: &TrustStoreError) {
        self.listeners.notify(&self.location, category, severity, cause);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl TrustAnchorStore for InMemoryTrustAnchorStore {
    fn snapshot(&self) -> Arc<TrustSnapshot> {
        self.snapshot.load_full()
    }

    fn add_update_error_listener(&self, listener: Arc<dyn UpdateErrorListener>) {
        self.listeners.add(listener);
    }

    fn remove_update_error_listener(&self, listener: &Arc<dyn UpdateErrorListener>) {
        self.listeners.remove(listener);
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.listeners.clear();
        }
    }
}

impl std::fmt::Debug for InMemoryTrustAnchorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTrustAnchorStore")
            .field("location", &self.location)
            .field("generation", &self.snapshot.load().generation())
            .field("anchors", &self.snapshot.load().len())
            .field("listeners", &self.listeners)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
