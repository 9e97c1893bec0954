// adapters/keystore/source.rs

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::domain::error::{TrustStoreError, TrustStoreResult};
use crate::domain::trust_store::{SnapshotSource, SourceLoad};
use crate::domain::types::TrustStoreConfig;
use super::format::{decode, KeystoreFormat};

/// Reads trusted certificates from a key-store file on every load.
pub struct KeystoreFileSource {
  path: PathBuf,
  format: KeystoreFormat,
  passphrase: Zeroizing<String>,
}

impl KeystoreFileSource {
  pub fn new(path: impl Into<PathBuf>, format: KeystoreFormat, passphrase: Option<&str>) -> Self {
    Self {
      path: path.into(),
      format,
      passphrase: Zeroizing::new(passphrase.unwrap_or_default().to_owned()),
    }
  }

  pub fn from_config(cfg: &TrustStoreConfig) -> Self {
    Self {
      path: cfg.path.clone(),
      format: cfg.format,
      passphrase: Zeroizing::new(cfg.passphrase_str().to_owned()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn format(&self) -> KeystoreFormat {
    self.format
  }
}

impl SnapshotSource for KeystoreFileSource {
  fn location(&self) -> String {
    self.path.display().to_string()
  }

  fn load(&self) -> TrustStoreResult<SourceLoad> {
    let bytes = std::fs::read(&self.path).map_err(|source| TrustStoreError::Io {
      path: self.path.clone(),
      source,
    })?;
    decode(&bytes, self.format, &self.passphrase, &self.path)
  }
}

impl std::fmt::Debug for KeystoreFileSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("KeystoreFileSource")
      .field("path", &self.path)
      .field("format", &self.format)
      .finish_non_exhaustive()
  }
}
