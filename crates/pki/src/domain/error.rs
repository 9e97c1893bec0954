// crates/pki/src/domain/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the trust anchor store and its backing key-store sources.
#[derive(Debug, Error)]
pub enum TrustStoreError {
  #[error("configuration: {0}")]
  InvalidConfig(String),

  #[error("unsupported key-store format: {0}")]
  UnsupportedFormat(String),

  #[error("I/O error reading key-store {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The file is not a container of the configured format at all.
  #[error("malformed {format} key-store {path}: {reason}")]
  Malformed {
    path: PathBuf,
    format: &'static str,
    reason: String,
  },

  /// Wrong passphrase or an integrity (MAC) algorithm that can not be verified.
  #[error("key-store integrity check failed, key-store path: {path}: {source}")]
  Integrity {
    path: PathBuf,
    #[source]
    source: openssl::error::ErrorStack,
  },

  /// A single certificate entry could not be parsed.
  #[error("certificate entry #{index} in {path} can not be loaded: {reason}")]
  Certificate {
    path: PathBuf,
    index: usize,
    reason: String,
  },

  /// Every entry of one load that could not be used, reported as one failure.
  #[error("{count} entries of {location} can not be loaded: {details}")]
  Entries {
    location: String,
    count: usize,
    details: String,
  },

  #[error("no tokio runtime available to schedule trust store refresh")]
  Runtime,

  #[error("feature not enabled: {0}")]
  Feature(&'static str),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  OpenSsl(#[from] openssl::error::ErrorStack),
}

impl TrustStoreError {
  /// Folds per-entry failures into a single [`TrustStoreError::Entries`].
  pub fn entries(location: &str, rejected: &[TrustStoreError]) -> Option<Self> {
    if rejected.is_empty() {
      return None;
    }
    let details = rejected
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join("; ");
    Some(TrustStoreError::Entries {
      location: location.to_string(),
      count: rejected.len(),
      details,
    })
  }

  /// Errors that leave no usable snapshot when they happen at construction.
  pub fn is_structural(&self) -> bool {
    matches!(
      self,
      TrustStoreError::InvalidConfig(_)
        | TrustStoreError::UnsupportedFormat(_)
        | TrustStoreError::Malformed { .. }
        | TrustStoreError::Runtime
        | TrustStoreError::Feature(_)
        | TrustStoreError::Json(_)
    )
  }
}

pub type TrustStoreResult<T> = Result<T, TrustStoreError>;

/// Failures of proxy certificate request generation. None of them is retried.
#[derive(Debug, Error)]
pub enum ProxyError {
  #[error("parent certificate chain must not be empty")]
  EmptyChain,

  #[error("unsupported signature algorithm for signing key type {0}")]
  UnsupportedSignatureAlgorithm(String),

  #[error("signing the request failed: {0}")]
  Signing(#[source] openssl::error::ErrorStack),

  #[error("key pair generation failed: {0}")]
  KeyGeneration(#[source] openssl::error::ErrorStack),

  #[error("extension encoding failed: {0}")]
  ExtensionEncoding(String),

  #[error("invalid address restriction entry: {0}")]
  InvalidAddress(String),

  #[error("invalid object identifier: {0}")]
  InvalidOid(String),

  #[error(transparent)]
  OpenSsl(#[from] openssl::error::ErrorStack),
}

impl From<der::Error> for ProxyError {
  fn from(e: der::Error) -> Self {
    ProxyError::ExtensionEncoding(e.to_string())
  }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
