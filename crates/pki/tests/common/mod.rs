#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use der::asn1::{Any, BitString};
use der::{Decode, Encode, Sequence};
use grid_pki::domain::listener::UpdateErrorListener;
use grid_pki::{ResourceCategory, Severity, TrustStoreError};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::{X509Req, X509};
use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, SerialNumber};
use tempfile::TempDir;
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;

/// Serial of the certificate returned by [`parent_certificate`]: 0x1092.
pub const PARENT_SERIAL: &str = "4242";

pub const EXTENSION_REQUEST_OID: &str = "1.2.840.113549.1.9.14";

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::OrganizationName, "Grid Test");
    params.distinguished_name.push(DnType::CommonName, common_name);
    params
}

/// Generate a self-signed CA certificate in PEM format using rcgen.
pub fn generate_ca_pem(common_name: &str) -> String {
    let cert = Certificate::from_params(ca_params(common_name)).expect("ca cert");
    cert.serialize_pem().expect("ca pem")
}

pub fn generate_ca(common_name: &str) -> X509 {
    X509::from_pem(generate_ca_pem(common_name).as_bytes()).expect("parse ca")
}

/// End entity certificate with serial [`PARENT_SERIAL`] and its EC private key.
pub fn parent_certificate() -> (X509, PKey<Private>) {
    let mut params = CertificateParams::new(vec![]);
    params.distinguished_name.push(DnType::CountryName, "PL");
    params.distinguished_name.push(DnType::OrganizationName, "Grid Test");
    params.distinguished_name.push(DnType::CommonName, "Test User");
    params.serial_number = Some(SerialNumber::from(vec![0x10, 0x92]));
    let cert = Certificate::from_params(params).expect("parent cert");
    let x509 = X509::from_pem(cert.serialize_pem().expect("pem").as_bytes()).expect("parse parent");
    let key = PKey::private_key_from_pem(cert.serialize_private_key_pem().as_bytes()).expect("parse key");
    (x509, key)
}

/// A CERTIFICATE block whose contents are not a certificate.
pub fn corrupt_certificate_pem() -> String {
    let block = pem::Pem::new("CERTIFICATE", b"definitely not DER".to_vec());
    pem::encode(&block)
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write key-store");
    path
}

/// PEM blocks joined into one bundle.
pub fn pem_bundle(blocks: &[String]) -> String {
    blocks.join("\n")
}

/// Write a PEM bundle of the given blocks into a fresh temp dir.
pub fn pem_keystore(blocks: &[String]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(dir.path(), "truststore.pem", pem_bundle(blocks).as_bytes());
    (dir, path)
}

/// Replace a key-store atomically so a concurrent reader never sees a partial file.
pub fn replace_file(path: &Path, contents: &[u8]) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).expect("write tmp");
    std::fs::rename(&tmp, path).expect("rename");
}

pub fn pkcs12_bytes(certs: &[X509], passphrase: &str) -> Vec<u8> {
    let mut stack = Stack::new().expect("stack");
    for cert in certs {
        stack.push(cert.clone()).expect("push");
    }
    let mut builder = Pkcs12::builder();
    builder.ca(stack);
    builder.build2(passphrase).expect("pkcs12").to_der().expect("pkcs12 der")
}

/// PKCS#10 layout that keeps the attributes in encoded order.
#[derive(Sequence)]
struct RequestInfo {
    version: u8,
    subject: Any,
    public_key: Any,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    attributes: Vec<Attribute>,
}

#[derive(Sequence)]
struct Request {
    info: RequestInfo,
    algorithm: Any,
    signature: BitString,
}

/// The extensions of each extensionRequest attribute of `req`, one entry per attribute.
pub fn extension_request_attributes(req: &X509Req) -> Vec<Vec<Extension>> {
    let der = req.to_der().expect("csr der");
    let csr = Request::from_der(&der).expect("decode csr");
    csr.info
        .attributes
        .iter()
        .filter(|attr| attr.oid.to_string() == EXTENSION_REQUEST_OID)
        .map(|attr| {
            attr.values
                .iter()
                .flat_map(|value| {
                    let bytes = value.to_der().expect("attribute value");
                    Vec::<Extension>::from_der(&bytes).expect("extension request")
                })
                .collect()
        })
        .collect()
}

/// Extensions of every extensionRequest attribute of `req`, flattened.
pub fn requested_extensions(req: &X509Req) -> Vec<Extension> {
    extension_request_attributes(req).into_iter().flatten().collect()
}

pub fn find_extension<'a>(exts: &'a [Extension], oid: &str) -> Option<&'a Extension> {
    exts.iter().find(|e| e.extn_id.to_string() == oid)
}

/// What a listener saw for one failure.
#[derive(Debug, Clone)]
pub struct Notification {
    pub location: String,
    pub category: ResourceCategory,
    pub severity: Severity,
    pub cause: String,
}

/// Listener that keeps every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl UpdateErrorListener for RecordingListener {
    fn on_update_error(
        &self,
        location: &str,
        category: ResourceCategory,
        severity: Severity,
        cause: &TrustStoreError,
    ) {
        self.seen.lock().unwrap().push(Notification {
            location: location.to_string(),
            category,
            severity,
            cause: cause.to_string(),
        });
    }
}

pub fn as_listener(l: &Arc<RecordingListener>) -> Arc<dyn UpdateErrorListener> {
    l.clone()
}
