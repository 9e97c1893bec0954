//! Proxy certificate signing request generation.

use der::asn1::{Any, BitString, ObjectIdentifier};
use der::{Decode, Encode};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::{X509Name, X509Req, X509Ref};
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use zeroize::Zeroizing;

use crate::domain::error::{ProxyError, ProxyResult};
use crate::domain::types::ProxyCertificateOptions;

use super::asn1::{self, RequestInfo, SignedRequest};
use super::rules;

const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const DSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.2");

/// A signed request plus the private key generated for it, if any.
pub struct ProxyCsr {
    request: X509Req,
    private_key: Option<PKey<Private>>,
}

impl ProxyCsr {
    pub fn request(&self) -> &X509Req {
        &self.request
    }

    /// `None` when the request was built for a caller supplied public key.
    pub fn private_key(&self) -> Option<&PKey<Private>> {
        self.private_key.as_ref()
    }

    pub fn into_parts(self) -> (X509Req, Option<PKey<Private>>) {
        (self.request, self.private_key)
    }

    pub fn to_der(&self) -> ProxyResult<Vec<u8>> {
        Ok(self.request.to_der()?)
    }

    pub fn to_pem(&self) -> ProxyResult<Vec<u8>> {
        Ok(self.request.to_pem()?)
    }

    /// PKCS#8 PEM of the generated key.
    pub fn private_key_pem(&self) -> ProxyResult<Option<Zeroizing<Vec<u8>>>> {
        self.private_key
            .as_ref()
            .map(|key| Ok(Zeroizing::new(key.private_key_to_pem_pkcs8()?)))
            .transpose()
    }
}

impl std::fmt::Debug for ProxyCsr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCsr")
            .field("subject", &self.request.subject_name())
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

/// Stateless generator of proxy signing requests.
pub struct ProxyCsrGenerator;

impl ProxyCsrGenerator {
    /// Builds and signs a request for a proxy issued by `options.issuer()`.
    ///
    /// The request is signed with `signing_key` (SHA-256). When no public key is
    /// set in `options` a fresh RSA key pair of `key_length` bits is generated and
    /// its private half is returned with the request.
    pub fn generate(
        options: &ProxyCertificateOptions,
        signing_key: &PKeyRef<Private>,
    ) -> ProxyResult<ProxyCsr> {
        let (digest, algorithm) = signature_algorithm(signing_key)?;
        let subject = proxy_subject(options.issuer(), options)?;
        let extensions = rules::extension_attributes(options)?;

        let (public_der, private_key) = match options.public_key() {
            Some(public) => (public.public_key_to_der()?, None),
            None => {
                let key = generate_key(options.key_length())?;
                (key.public_key_to_der()?, Some(key))
            }
        };

        let info = RequestInfo {
            version: 0,
            subject: Name::from_der(&subject.to_der()?)?,
            public_key: SubjectPublicKeyInfoOwned::from_der(&public_der)?,
            attributes: extensions
                .iter()
                .map(asn1::extension_request)
                .collect::<ProxyResult<Vec<_>>>()?,
        };
        let tbs = info.to_der()?;
        let signature = sign(&tbs, signing_key, digest).map_err(ProxyError::Signing)?;

        let signed = SignedRequest {
            info,
            algorithm,
            signature: BitString::from_bytes(&signature)?,
        };
        let request = X509Req::from_der(&signed.to_der()?)?;

        tracing::debug!(
            "generated {:?} proxy request with {} extensions, new key: {}",
            options.proxy_type(),
            extensions.len(),
            private_key.is_some()
        );

        Ok(ProxyCsr {
            request,
            private_key,
        })
    }
}

/// SHA-256 paired with the signature algorithm matching the key type.
fn signature_algorithm(key: &PKeyRef<Private>) -> ProxyResult<(MessageDigest, AlgorithmIdentifierOwned)> {
    let (oid, parameters) = match key.id() {
        Id::RSA => (SHA256_WITH_RSA, Some(Any::null())),
        Id::EC => (ECDSA_WITH_SHA256, None),
        Id::DSA => (DSA_WITH_SHA256, None),
        other => {
            return Err(ProxyError::UnsupportedSignatureAlgorithm(format!(
                "EVP_PKEY id {}",
                other.as_raw()
            )))
        }
    };
    Ok((MessageDigest::sha256(), AlgorithmIdentifierOwned { oid, parameters }))
}

fn sign(
    tbs: &[u8],
    key: &PKeyRef<Private>,
    digest: MessageDigest,
) -> Result<Vec<u8>, openssl::error::ErrorStack> {
    let mut signer = Signer::new(digest, key)?;
    signer.update(tbs)?;
    signer.sign_to_vec()
}

fn generate_key(bits: u32) -> ProxyResult<PKey<Private>> {
    let rsa = Rsa::generate(bits).map_err(ProxyError::KeyGeneration)?;
    PKey::from_rsa(rsa).map_err(ProxyError::KeyGeneration)
}

/// Issuer subject with the decimal serial appended as a CN.
///
/// Legacy proxies get a second CN after the serial, `proxy` or
/// `limited proxy`, which is how legacy validators tell the two apart.
fn proxy_subject(issuer: &X509Ref, options: &ProxyCertificateOptions) -> ProxyResult<X509Name> {
    let serial = match options.serial_number() {
        Some(serial) => serial.to_dec_str()?,
        None => issuer.serial_number().to_bn()?.to_dec_str()?,
    };

    let mut name = X509Name::builder()?;
    for entry in issuer.subject_name().entries() {
        name.append_entry(entry)?;
    }
    name.append_entry_by_nid(Nid::COMMONNAME, &serial)?;
    if options.proxy_type().is_legacy() {
        let marker = if options.is_limited() { "limited proxy" } else { "proxy" };
        name.append_entry_by_nid(Nid::COMMONNAME, marker)?;
    }
    Ok(name.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_signing_keys_are_unsupported() {
        let key = PKey::generate_ed25519().unwrap();
        assert!(matches!(
            signature_algorithm(&key),
            Err(ProxyError::UnsupportedSignatureAlgorithm(_))
        ));
    }

    #[test]
    fn ec_signing_keys_use_ecdsa_with_sha256() {
        let group = openssl::ec::EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(openssl::ec::EcKey::generate(&group).unwrap()).unwrap();
        let (_, algorithm) = signature_algorithm(&key).unwrap();
        assert_eq!(algorithm.oid, ECDSA_WITH_SHA256);
        assert!(algorithm.parameters.is_none());
    }

    #[test]
    fn rsa_signature_algorithm_carries_null_parameters() {
        let key = generate_key(1024).unwrap();
        let (_, algorithm) = signature_algorithm(&key).unwrap();
        assert_eq!(algorithm.oid, SHA256_WITH_RSA);
        assert_eq!(algorithm.parameters, Some(Any::null()));
    }
}
