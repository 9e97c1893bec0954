use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use const_oid::db::rfc5280::ID_CE_NAME_CONSTRAINTS;
use der::Decode;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Public};
use openssl::x509::{X509NameRef, X509};

/// A CA certificate designated as a root of trust, as consumed by path validators.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    certificate: X509,
    subject: String,
    name_constraints: Option<Vec<u8>>,
    fingerprint: Vec<u8>,
}

impl TrustAnchor {
    pub fn from_certificate(certificate: X509) -> Result<Self, openssl::error::ErrorStack> {
        let fingerprint = certificate.digest(MessageDigest::sha256())?.to_vec();
        let subject = name_to_string(certificate.subject_name());
        let name_constraints = certificate
            .to_der()
            .ok()
            .and_then(|der| extract_name_constraints(&der));
        Ok(Self {
            certificate,
            subject,
            name_constraints,
            fingerprint,
        })
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// Comma separated `KEY=value` rendering of the CA subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn public_key(&self) -> Result<PKey<Public>, openssl::error::ErrorStack> {
        self.certificate.public_key()
    }

    /// Raw DER `NameConstraints` value, when the CA certificate carries one.
    pub fn name_constraints(&self) -> Option<&[u8]> {
        self.name_constraints.as_deref()
    }

    /// SHA-256 over the DER certificate; the anchor's identity.
    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }
}

impl PartialEq for TrustAnchor {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for TrustAnchor {}

impl Hash for TrustAnchor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

/// Immutable view of the trusted material produced by one load.
///
/// The anchor set and the certificate list always come from the same read.
#[derive(Debug, Clone, Default)]
pub struct TrustSnapshot {
    anchors: HashSet<TrustAnchor>,
    certificates: Vec<X509>,
    generation: u64,
}

impl TrustSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(anchors: Vec<TrustAnchor>, generation: u64) -> Self {
        let mut set = HashSet::with_capacity(anchors.len());
        let mut certificates = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            if !set.contains(&anchor) {
                certificates.push(anchor.certificate.clone());
                set.insert(anchor);
            }
        }
        Self {
            anchors: set,
            certificates,
            generation,
        }
    }

    pub fn anchors(&self) -> &HashSet<TrustAnchor> {
        &self.anchors
    }

    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    /// Publication counter of the owning store; 0 for the initial empty snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// RFC 2253 text: RDNs last to first, values escaped. Values that are not
/// valid strings are decoded lossily.
fn name_to_string(name: &X509NameRef) -> String {
    let mut rdns: Vec<String> = name
        .entries()
        .map(|entry| {
            let nid = entry.object().nid();
            let key = match nid.short_name() {
                Ok(short) if nid != Nid::UNDEF => short.to_string(),
                _ => entry.object().to_string(),
            };
            let value = match entry.data().as_utf8() {
                Ok(s) => s.to_string(),
                Err(_) => String::from_utf8_lossy(entry.data().as_slice()).into_owned(),
            };
            format!("{}={}", key, escape_value(&value))
        })
        .collect();
    rdns.reverse();
    rdns.join(",")
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn extract_name_constraints(cert_der: &[u8]) -> Option<Vec<u8>> {
    let cert = x509_cert::Certificate::from_der(cert_der).ok()?;
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == ID_CE_NAME_CONSTRAINTS)
        .map(|ext| ext.extn_value.as_bytes().to_vec())
}


#[cfg(test)]
mod tests {
    use super::*;
    use openssl::x509::X509Name;

    #[test]
    fn names_render_last_rdn_first() {
        let mut name = X509Name::builder().unwrap();
        name.append_entry_by_text("C", "PL").unwrap();
        name.append_entry_by_text("O", "Grid, Inc").unwrap();
        name.append_entry_by_text("CN", "#root ").unwrap();
        let name = name.build();

        assert_eq!(name_to_string(&name), "CN=\\#root\\ ,O=Grid\\, Inc,C=PL");
    }

    #[test]
    fn plain_values_are_not_escaped() {
        assert_eq!(escape_value("Test User"), "Test User");
        assert_eq!(escape_value("a+b"), "a\\+b");
    }
}
