use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::keystore::KeystoreFileSource;
use crate::domain::error::{TrustStoreError, TrustStoreResult};
use crate::domain::listener::UpdateErrorListener;
use crate::domain::trust_store::{SnapshotSource, SourceLoad, TrustAnchorStore};
use crate::domain::types::{TrustSnapshot, TrustStoreConfig};

use super::memory::InMemoryTrustAnchorStore;

/// Trust anchor store that reloads itself from a [`SnapshotSource`] on a fixed period.
///
/// A failed reload, including one with unparsable entries, keeps the previous
/// snapshot and is only reported to the registered listeners. The background
/// task is owned by the store and is cancelled by [`TrustAnchorStore::dispose`]
/// or on drop.
pub struct RefreshingTrustAnchorStore<S: SnapshotSource> {
    inner: Arc<InMemoryTrustAnchorStore>,
    source: Arc<S>,
    refresh_interval: Option<Duration>,
    task: Mutex<Option<RefreshTask>>,
}

/// Trust anchor store backed by a key-store file.
pub type FilesystemTrustAnchorStore = RefreshingTrustAnchorStore<KeystoreFileSource>;

impl<S: SnapshotSource> RefreshingTrustAnchorStore<S> {
    /// Loads `source` once, synchronously, then schedules reloads every
    /// `refresh_interval` (never, when `None`).
    ///
    /// Structural problems of the first load are returned; I/O and integrity
    /// failures are reported to `listeners` and the store starts empty.
    /// Unparsable entries are skipped here and reported once; on later reloads
    /// they fail the whole tick.
    /// Scheduling needs a tokio runtime on the calling thread.
    pub fn new<I>(source: S, refresh_interval: Option<Duration>, listeners: I) -> TrustStoreResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
    {
        if refresh_interval == Some(Duration::ZERO) {
            return Err(TrustStoreError::InvalidConfig(
                "refresh interval must be positive".into(),
            ));
        }

        let inner = Arc::new(InMemoryTrustAnchorStore::new(source.location(), listeners));
        let source = Arc::new(source);

        match source.load() {
            Ok(load) => {
                inner.apply(load);
            }
            Err(e) if e.is_structural() => return Err(e),
            Err(e) => {
                tracing::warn!("initial load of trust store {} failed: {}", inner.location(), e);
                inner.report(&e);
            }
        }

        let task = match refresh_interval {
            Some(period) => Some(RefreshTask::spawn(Arc::clone(&inner), Arc::clone(&source), period)?),
            None => None,
        };

        tracing::info!(
            "trust store {} ready with {} anchors, refresh interval {:?}",
            inner.location(),
            inner.snapshot().len(),
            refresh_interval
        );

        Ok(Self {
            inner,
            source,
            refresh_interval,
            task: Mutex::new(task),
        })
    }

    /// Runs one refresh tick on the calling thread. Returns whether a new
    /// snapshot was published.
    pub fn reload(&self) -> bool {
        apply_reload(&self.inner, self.source.load())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn cancel_task(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.cancel();
        }
    }
}

impl FilesystemTrustAnchorStore {
    /// Opens the key-store described by `config`.
    pub fn open<I>(config: &TrustStoreConfig, listeners: I) -> TrustStoreResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
    {
        config.validate()?;
        Self::new(
            KeystoreFileSource::from_config(config),
            config.refresh_interval,
            listeners,
        )
    }

    pub fn truststore_path(&self) -> &Path {
        self.source.path()
    }
}

impl<S: SnapshotSource> TrustAnchorStore for RefreshingTrustAnchorStore<S> {
    fn snapshot(&self) -> Arc<TrustSnapshot> {
        self.inner.snapshot()
    }

    fn add_update_error_listener(&self, listener: Arc<dyn UpdateErrorListener>) {
        self.inner.add_update_error_listener(listener);
    }

    fn remove_update_error_listener(&self, listener: &Arc<dyn UpdateErrorListener>) {
        self.inner.remove_update_error_listener(listener);
    }

    fn dispose(&self) {
        self.cancel_task();
        if !self.inner.is_disposed() {
            tracing::info!("disposing trust store {}", self.inner.location());
        }
        self.inner.dispose();
    }
}

impl<S: SnapshotSource> Drop for RefreshingTrustAnchorStore<S> {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

impl<S: SnapshotSource> std::fmt::Debug for RefreshingTrustAnchorStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshingTrustAnchorStore")
            .field("inner", &self.inner)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

/// One refresh tick. A load with unusable entries counts as failed: the
/// previous snapshot stays and the entries are reported once. Returns whether
/// a new snapshot was published.
fn apply_reload(inner: &InMemoryTrustAnchorStore, result: TrustStoreResult<SourceLoad>) -> bool {
    if inner.is_disposed() {
        return false;
    }
    let failure = match result {
        Ok(load) => match TrustStoreError::entries(inner.location(), &load.rejected) {
            None => {
                inner.apply(load);
                return true;
            }
            Some(cause) => cause,
        },
        Err(e) => e,
    };
    tracing::warn!(
        "reloading trust store {} failed, keeping previous snapshot: {}",
        inner.location(),
        failure
    );
    inner.report(&failure);
    false
}

/// Handle of the periodic reload task; one per store.
struct RefreshTask {
    #[cfg(feature = "refresh")]
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshTask {
    #[cfg(feature = "refresh")]
    fn spawn<S: SnapshotSource>(
        inner: Arc<InMemoryTrustAnchorStore>,
        source: Arc<S>,
        period: Duration,
    ) -> TrustStoreResult<Self> {
        use tokio::time::{interval_at, Instant, MissedTickBehavior};

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TrustStoreError::Runtime)?;
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let src = Arc::clone(&source);
                // Key-store reads block; keep them off the runtime workers.
                match tokio::task::spawn_blocking(move || src.load()).await {
                    Ok(result) => {
                        apply_reload(&inner, result);
                    }
                    Err(e) => {
                        tracing::error!("trust store {} reload task failed: {}", inner.location(), e);
                    }
                }
            }
        });
        Ok(Self { handle })
    }

    #[cfg(not(feature = "refresh"))]
    fn spawn<S: SnapshotSource>(
        _inner: Arc<InMemoryTrustAnchorStore>,
        _source: Arc<S>,
        _period: Duration,
    ) -> TrustStoreResult<Self> {
        Err(TrustStoreError::Feature("refresh"))
    }

    fn cancel(self) {
        #[cfg(feature = "refresh")]
        self.handle.abort();
    }
}
