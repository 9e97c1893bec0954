//! DER value encoders for the proxy-specific request extensions.
//!
//! Each function returns the bytes that go into `extnValue`.

use std::net::IpAddr;

use der::asn1::{Any, BitString, Ia5String, ObjectIdentifier, OctetString, SetOfVec};
use der::{Encode, Sequence};
use ipnet::IpNet;
use x509_cert::attr::Attribute;
use x509_cert::ext::pkix::constraints::name::{GeneralSubtree, NameConstraints};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::domain::error::{ProxyError, ProxyResult};
use crate::domain::types::{CertificateExtension, ProxyPolicy};

pub const RFC_PROXY_CERT_INFO_OID: &str = "1.3.6.1.5.5.7.1.14";
pub const DRAFT_PROXY_CERT_INFO_OID: &str = "1.3.6.1.4.1.3536.1.222";
pub const TRACING_ISSUER_OID: &str = "1.2.246.562.10.1";
pub const TRACING_SUBJECT_OID: &str = "1.2.246.562.10.2";
pub const SOURCE_RESTRICTION_OID: &str = "1.2.246.562.10.3";
pub const TARGET_RESTRICTION_OID: &str = "1.2.246.562.10.4";
pub const SAML_OID: &str = "1.3.6.1.4.1.3536.1.1.1.12";
/// PKCS#9 extensionRequest
pub const EXTENSION_REQUEST_OID: &str = "1.2.840.113549.1.9.14";

/// ProxyCertInfo ::= SEQUENCE { pCPathLenConstraint INTEGER OPTIONAL, proxyPolicy ProxyPolicy }
///
/// The draft and RFC 3820 extensions share this layout.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProxyCertInfo {
    #[asn1(optional = "true")]
    pub path_len_constraint: Option<u32>,
    pub proxy_policy: ProxyPolicyInfo,
}

/// ProxyPolicy ::= SEQUENCE { policyLanguage OBJECT IDENTIFIER, policy OCTET STRING OPTIONAL }
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProxyPolicyInfo {
    pub policy_language: ObjectIdentifier,
    #[asn1(optional = "true")]
    pub policy: Option<OctetString>,
}

/// CertificationRequestInfo (RFC 2986).
///
/// `attributes` is written as the implicit `[0]` SET in the order given, so
/// several attributes of the same type can sit side by side.
#[derive(Clone, Debug, Sequence)]
pub struct RequestInfo {
    pub version: u8,
    pub subject: Name,
    pub public_key: SubjectPublicKeyInfoOwned,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    pub attributes: Vec<Attribute>,
}

/// CertificationRequest ::= SEQUENCE { info, signatureAlgorithm, signature BIT STRING }
#[derive(Clone, Debug, Sequence)]
pub struct SignedRequest {
    pub info: RequestInfo,
    pub algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
}

pub(crate) fn parse_oid(oid: &str) -> ProxyResult<ObjectIdentifier> {
    ObjectIdentifier::new(oid).map_err(|e| ProxyError::InvalidOid(format!("{oid}: {e}")))
}

pub fn encode_proxy_cert_info(path_limit: Option<u32>, policy: &ProxyPolicy) -> ProxyResult<Vec<u8>> {
    let info = ProxyCertInfo {
        path_len_constraint: path_limit,
        proxy_policy: ProxyPolicyInfo {
            policy_language: parse_oid(&policy.oid)?,
            policy: policy.policy.clone().map(OctetString::new).transpose()?,
        },
    };
    Ok(info.to_der()?)
}

/// An extensionRequest attribute whose value is a one-element `Extensions`.
pub fn extension_request(ext: &CertificateExtension) -> ProxyResult<Attribute> {
    let extension = Extension {
        extn_id: parse_oid(&ext.oid)?,
        critical: ext.critical,
        extn_value: OctetString::new(ext.value.clone())?,
    };
    let value = Any::encode_from(&vec![extension])?;
    Ok(Attribute {
        oid: parse_oid(EXTENSION_REQUEST_OID)?,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// GeneralNames holding a single uniformResourceIdentifier.
pub fn encode_tracing_url(url: &str) -> ProxyResult<Vec<u8>> {
    let uri = Ia5String::new(url)
        .map_err(|e| ProxyError::ExtensionEncoding(format!("tracing URL {url:?}: {e}")))?;
    let names: Vec<GeneralName> = vec![GeneralName::UniformResourceIdentifier(uri)];
    Ok(names.to_der()?)
}

pub fn encode_saml(assertion: &[u8]) -> ProxyResult<Vec<u8>> {
    Ok(OctetString::new(assertion)?.to_der()?)
}

/// NameConstraints-shaped restriction where every address lands in the excluded subtrees.
///
/// Permitted addresses are folded into the excluded set as well; peers that
/// consume these extensions expect that layout.
pub fn encode_address_restriction(excluded: &[String], permitted: &[String]) -> ProxyResult<Vec<u8>> {
    let subtrees = excluded
        .iter()
        .chain(permitted)
        .map(|addr| {
            Ok(GeneralSubtree {
                base: GeneralName::IpAddress(OctetString::new(address_with_netmask(addr)?)?),
                minimum: 0,
                maximum: None,
            })
        })
        .collect::<ProxyResult<Vec<_>>>()?;

    let constraints = NameConstraints {
        permitted_subtrees: None,
        excluded_subtrees: (!subtrees.is_empty()).then_some(subtrees),
    };
    Ok(constraints.to_der()?)
}

/// Address bytes followed by netmask bytes. A bare address is a host prefix.
pub fn address_with_netmask(text: &str) -> ProxyResult<Vec<u8>> {
    let text = text.trim();
    let net = match text.parse::<IpNet>() {
        Ok(net) => net,
        Err(_) => text
            .parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|_| ProxyError::InvalidAddress(text.to_string()))?,
    };

    let mut out = Vec::with_capacity(32);
    match net {
        IpNet::V4(n) => {
            out.extend_from_slice(&n.network().octets());
            out.extend_from_slice(&n.netmask().octets());
        }
        IpNet::V6(n) => {
            out.extend_from_slice(&n.network().octets());
            out.extend_from_slice(&n.netmask().octets());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Decode;

    #[test]
    fn cidr_becomes_address_and_mask() {
        assert_eq!(
            address_with_netmask("10.0.0.0/8").unwrap(),
            vec![10, 0, 0, 0, 255, 0, 0, 0]
        );
        assert_eq!(
            address_with_netmask("192.168.1.7").unwrap(),
            vec![192, 168, 1, 7, 255, 255, 255, 255]
        );
    }

    #[test]
    fn ipv6_prefix_is_thirty_two_octets() {
        let bytes = address_with_netmask("2001:db8::/32").unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..4], &[0x20, 0x01, 0x0d, 0xb8]);
        assert_eq!(&bytes[16..20], &[0xff; 4]);
        assert!(bytes[20..].iter().all(|b| *b == 0));
    }

    #[test]
    fn garbage_address_is_rejected() {
        assert!(matches!(
            address_with_netmask("not-an-address"),
            Err(ProxyError::InvalidAddress(_))
        ));
    }

    #[test]
    fn proxy_cert_info_omits_unset_path_length() {
        let der = encode_proxy_cert_info(None, &ProxyPolicy::inherit_all()).unwrap();
        let info = ProxyCertInfo::from_der(&der).unwrap();
        assert_eq!(info.path_len_constraint, None);
        assert_eq!(
            info.proxy_policy.policy_language.to_string(),
            ProxyPolicy::INHERITALL_POLICY_OID
        );
        assert!(info.proxy_policy.policy.is_none());
    }

    #[test]
    fn proxy_cert_info_carries_policy_bytes() {
        let policy = ProxyPolicy::with_policy(ProxyPolicy::INDEPENDENT_POLICY_OID, b"rights".to_vec());
        let der = encode_proxy_cert_info(Some(3), &policy).unwrap();
        let info = ProxyCertInfo::from_der(&der).unwrap();
        assert_eq!(info.path_len_constraint, Some(3));
        assert_eq!(info.proxy_policy.policy.unwrap().as_bytes(), b"rights");
    }

    #[test]
    fn extension_request_wraps_one_extension() {
        let ext = CertificateExtension::new(SAML_OID, encode_saml(b"<a/>").unwrap(), false);
        let attr = extension_request(&ext).unwrap();
        assert_eq!(attr.oid.to_string(), EXTENSION_REQUEST_OID);
        assert_eq!(attr.values.len(), 1);
        let bytes = attr.values.get(0).unwrap().to_der().unwrap();
        let inner = Vec::<Extension>::from_der(&bytes).unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].extn_id.to_string(), SAML_OID);
        assert!(!inner[0].critical);
    }

    #[test]
    fn extension_request_rejects_bad_oid() {
        let ext = CertificateExtension::new("bogus", vec![0x05, 0x00], false);
        assert!(matches!(extension_request(&ext), Err(ProxyError::InvalidOid(_))));
    }

    #[test]
    fn bad_policy_oid_is_reported() {
        let err = encode_proxy_cert_info(None, &ProxyPolicy::new("not.an.oid")).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidOid(_)));
    }

    #[test]
    fn restriction_folds_permitted_into_excluded() {
        let der = encode_address_restriction(
            &["10.0.0.0/8".to_string()],
            &["192.168.0.0/16".to_string()],
        )
        .unwrap();
        let nc = NameConstraints::from_der(&der).unwrap();
        assert!(nc.permitted_subtrees.is_none());
        let excluded = nc.excluded_subtrees.unwrap();
        assert_eq!(excluded.len(), 2);
        match &excluded[1].base {
            GeneralName::IpAddress(ip) => {
                assert_eq!(ip.as_bytes(), &[192, 168, 0, 0, 255, 255, 0, 0])
            }
            other => panic!("unexpected name {other:?}"),
        }
    }

    #[test]
    fn tracing_url_is_a_uri_general_name() {
        let der = encode_tracing_url("https://tracing.example.org/proxy").unwrap();
        let names = Vec::<GeneralName>::from_der(&der).unwrap();
        assert!(matches!(
            &names[..],
            [GeneralName::UniformResourceIdentifier(uri)] if uri.to_string() == "https://tracing.example.org/proxy"
        ));
    }

    #[test]
    fn saml_is_wrapped_in_octet_string() {
        let der = encode_saml(b"<saml:Assertion/>").unwrap();
        assert_eq!(OctetString::from_der(&der).unwrap().as_bytes(), b"<saml:Assertion/>");
    }
}
