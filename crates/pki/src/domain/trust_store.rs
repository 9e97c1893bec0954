// crates/pki/src/domain/trust_store.rs

use std::collections::HashSet;
use std::sync::Arc;

use openssl::x509::X509;

use super::error::{TrustStoreError, TrustStoreResult};
use super::listener::UpdateErrorListener;
use super::types::{TrustAnchor, TrustSnapshot};

/// Provider of trusted CA material, read by path validators.
///
/// Reads are lock-free and always observe one whole snapshot.
pub trait TrustAnchorStore: Send + Sync {
    /// The currently published snapshot; both views of it come from the same load.
    fn snapshot(&self) -> Arc<TrustSnapshot>;

    fn trust_anchors(&self) -> HashSet<TrustAnchor> {
        self.snapshot().anchors().clone()
    }

    fn trusted_certificates(&self) -> Vec<X509> {
        self.snapshot().certificates().to_vec()
    }

    fn add_update_error_listener(&self, listener: Arc<dyn UpdateErrorListener>);

    fn remove_update_error_listener(&self, listener: &Arc<dyn UpdateErrorListener>);

    /// Stops any refreshing and drops listeners. Reads keep returning the last snapshot.
    fn dispose(&self);
}

/// Result of reading a trust material source once.
///
/// `rejected` holds entries that could not be parsed; they are reported but do
/// not fail the load.
#[derive(Debug, Default)]
pub struct SourceLoad {
    pub certificates: Vec<X509>,
    pub rejected: Vec<TrustStoreError>,
}

/// Something that can produce a fresh set of trusted certificates on demand.
///
/// An `Err` means nothing usable was read and the previous snapshot must stay.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Where the material comes from, used in notifications and logs.
    fn location(&self) -> String;

    fn load(&self) -> TrustStoreResult<SourceLoad>;
}
