use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

use crate::adapters::keystore::KeystoreFormat;
use crate::domain::error::{TrustStoreError, TrustStoreResult};

/// Centralized defaults for file-backed trust stores.
pub struct TrustStoreDefaults;

impl TrustStoreDefaults {
    pub const FORMAT: KeystoreFormat = KeystoreFormat::Pem; // CA bundles are usually PEM
    pub const PASSPHRASE: Option<Zeroizing<String>> = None; // PEM bundles are not protected
    pub const REFRESH_INTERVAL: Option<Duration> = Some(Duration::from_secs(600)); // 10 minutes
}

/// Configuration of a [`crate::FilesystemTrustAnchorStore`].
///
/// Deserializable from JSON:
///
/// ```json
/// { "path": "/etc/grid-security/truststore.p12", "format": "pkcs12",
///   "passphrase": "changeit", "refresh_interval_secs": 300 }
/// ```
///
/// `refresh_interval_secs: 0` loads the store once and never refreshes it.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustStoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_format")]
    pub format: KeystoreFormat,
    #[serde(default)]
    pub passphrase: Option<Zeroizing<String>>,
    #[serde(
        rename = "refresh_interval_secs",
        default = "default_refresh_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub refresh_interval: Option<Duration>,
}

impl TrustStoreConfig {
    /// Opinionated defaults; caller supplies the key-store path.
    pub fn secure_default(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: TrustStoreDefaults::FORMAT,
            passphrase: TrustStoreDefaults::PASSPHRASE,
            refresh_interval: TrustStoreDefaults::REFRESH_INTERVAL,
        }
    }

    pub fn from_json(json: &str) -> TrustStoreResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TrustStoreResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(TrustStoreError::InvalidConfig("trust store path is empty".into()));
        }
        if self.refresh_interval == Some(Duration::ZERO) {
            return Err(TrustStoreError::InvalidConfig(
                "refresh interval must be positive; use None to disable refreshing".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn passphrase_str(&self) -> &str {
        self.passphrase.as_ref().map(|p| p.as_str()).unwrap_or("")
    }
}

impl fmt::Debug for TrustStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStoreConfig")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

fn default_format() -> KeystoreFormat {
    TrustStoreDefaults::FORMAT
}

fn default_refresh_interval() -> Option<Duration> {
    TrustStoreDefaults::REFRESH_INTERVAL
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
