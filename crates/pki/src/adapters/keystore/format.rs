// adapters/keystore/format.rs

use std::path::Path;
use std::str::FromStr;

use openssl::pkcs12::Pkcs12;
use openssl::x509::X509;
use serde::Deserialize;

use crate::domain::error::{TrustStoreError, TrustStoreResult};
use crate::domain::trust_store::SourceLoad;

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Container formats accepted for backing trust stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum KeystoreFormat {
  /// Concatenated PEM `CERTIFICATE` blocks; each block is one entry.
  Pem,
  /// PKCS#12 archive; every certificate inside is trusted.
  Pkcs12,
}

impl KeystoreFormat {
  pub fn as_str(self) -> &'static str {
    match self {
      KeystoreFormat::Pem => "pem",
      KeystoreFormat::Pkcs12 => "pkcs12",
    }
  }
}

impl FromStr for KeystoreFormat {
  type Err = TrustStoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pem" => Ok(KeystoreFormat::Pem),
      "pkcs12" | "p12" => Ok(KeystoreFormat::Pkcs12),
      other => Err(TrustStoreError::UnsupportedFormat(other.to_string())),
    }
  }
}

impl TryFrom<String> for KeystoreFormat {
  type Error = TrustStoreError;

  fn try_from(s: String) -> Result<Self, Self::Error> {
    s.parse()
  }
}

impl std::fmt::Display for KeystoreFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Decodes raw key-store bytes into trusted certificates.
///
/// Container level problems fail the whole call. Individual PEM entries that
/// are not certificates are reported in `SourceLoad::rejected` instead.
pub fn decode(
  bytes: &[u8],
  format: KeystoreFormat,
  passphrase: &str,
  path: &Path,
) -> TrustStoreResult<SourceLoad> {
  match format {
    KeystoreFormat::Pem => decode_pem(bytes, path),
    KeystoreFormat::Pkcs12 => decode_pkcs12(bytes, passphrase, path),
  }
}

fn decode_pem(bytes: &[u8], path: &Path) -> TrustStoreResult<SourceLoad> {
  let blocks = pem::parse_many(bytes).map_err(|e| TrustStoreError::Malformed {
    path: path.to_path_buf(),
    format: KeystoreFormat::Pem.as_str(),
    reason: e.to_string(),
  })?;

  if blocks.is_empty() && bytes.iter().any(|b| !b.is_ascii_whitespace()) {
    return Err(TrustStoreError::Malformed {
      path: path.to_path_buf(),
      format: KeystoreFormat::Pem.as_str(),
      reason: "no PEM blocks found".into(),
    });
  }

  let mut load = SourceLoad::default();
  for (index, block) in blocks.iter().enumerate() {
    if block.tag() != PEM_CERTIFICATE_TAG {
      tracing::debug!("skipping non-certificate PEM block '{}' in {}", block.tag(), path.display());
      continue;
    }
    match X509::from_der(block.contents()) {
      Ok(cert) => load.certificates.push(cert),
      Err(e) => load.rejected.push(TrustStoreError::Certificate {
        path: path.to_path_buf(),
        index,
        reason: e.to_string(),
      }),
    }
  }
  Ok(load)
}

fn decode_pkcs12(bytes: &[u8], passphrase: &str, path: &Path) -> TrustStoreResult<SourceLoad> {
  let archive = Pkcs12::from_der(bytes).map_err(|e| TrustStoreError::Malformed {
    path: path.to_path_buf(),
    format: KeystoreFormat::Pkcs12.as_str(),
    reason: e.to_string(),
  })?;

  let parsed = archive.parse2(passphrase).map_err(|source| TrustStoreError::Integrity {
    path: path.to_path_buf(),
    source,
  })?;

  let mut load = SourceLoad::default();
  if let Some(cert) = parsed.cert {
    load.certificates.push(cert);
  }
  if let Some(chain) = parsed.ca {
    load.certificates.extend(chain);
  }
  Ok(load)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_format_names() {
    assert_eq!("pem".parse::<KeystoreFormat>().unwrap(), KeystoreFormat::Pem);
    assert_eq!("PKCS12".parse::<KeystoreFormat>().unwrap(), KeystoreFormat::Pkcs12);
    assert_eq!(" p12 ".parse::<KeystoreFormat>().unwrap(), KeystoreFormat::Pkcs12);
  }

  #[test]
  fn unknown_format_is_rejected() {
    let err = "jks".parse::<KeystoreFormat>().unwrap_err();
    assert!(matches!(err, TrustStoreError::UnsupportedFormat(ref f) if f == "jks"));
    assert!(err.is_structural());
  }

  #[test]
  fn empty_pem_file_is_an_empty_store() {
    let load = decode(b"\n  \n", KeystoreFormat::Pem, "", Path::new("empty.pem")).unwrap();
    assert!(load.certificates.is_empty());
    assert!(load.rejected.is_empty());
  }

  #[test]
  fn non_pem_text_is_malformed() {
    let err = decode(b"not a key-store", KeystoreFormat::Pem, "", Path::new("x.pem")).unwrap_err();
    assert!(matches!(err, TrustStoreError::Malformed { .. }));
  }

  #[test]
  fn garbage_pkcs12_is_malformed() {
    let err = decode(b"\x30\x03\x02\x01", KeystoreFormat::Pkcs12, "pw", Path::new("x.p12")).unwrap_err();
    assert!(matches!(err, TrustStoreError::Malformed { .. }));
  }
}
