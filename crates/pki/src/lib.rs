// crates/pki/src/lib.rs

//! Public facade for the grid PKI core.
//! Exposes the self-refreshing trust anchor stores and the proxy certificate
//! request generator, and re-exports the types consumers need.

pub mod adapters;
pub mod crypto;
pub mod domain;
pub mod store;

use std::sync::Arc;

use openssl::pkey::{PKeyRef, Private};

use domain::error::{ProxyResult, TrustStoreResult};
use domain::listener::UpdateErrorListener;
use domain::types::{ProxyCertificateOptions, TrustStoreConfig};

/// Opens a key-store backed trust anchor store from a JSON configuration document.
///
/// `listeners` see the errors of the initial load as well as later refresh failures.
pub fn open_trust_store<I>(config_json: &str, listeners: I) -> TrustStoreResult<FilesystemTrustAnchorStore>
where
    I: IntoIterator<Item = Arc<dyn UpdateErrorListener>>,
{
    let cfg = TrustStoreConfig::from_json(config_json)?;
    FilesystemTrustAnchorStore::open(&cfg, listeners)
}

/// Generates a proxy certificate signing request; see [`ProxyCsrGenerator::generate`].
pub fn generate_proxy_csr(
    options: &ProxyCertificateOptions,
    signing_key: &PKeyRef<Private>,
) -> ProxyResult<ProxyCsr> {
    ProxyCsrGenerator::generate(options, signing_key)
}

// Re-exports for convenience
pub use adapters::keystore::{KeystoreFileSource, KeystoreFormat};
pub use crypto::{ProxyCsr, ProxyCsrGenerator};
pub use domain::error::{ProxyError, TrustStoreError};
pub use domain::trust_store::{SnapshotSource, SourceLoad, TrustAnchorStore};
pub use domain::types::{
    CertificateExtension, ProxyPolicy, ProxyType, ResourceCategory, Severity, TrustAnchor,
    TrustSnapshot,
};
pub use store::{FilesystemTrustAnchorStore, InMemoryTrustAnchorStore, RefreshingTrustAnchorStore};
