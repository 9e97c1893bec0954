//! Ordered table of the extensions a proxy request may carry.

use crate::domain::error::{ProxyError, ProxyResult};
use crate::domain::types::{CertificateExtension, ProxyCertificateOptions, ProxyType};

use super::asn1;

/// One conditional extension: emitted when `applies` holds for the options.
pub struct ExtensionRule {
    pub name: &'static str,
    pub applies: fn(&ProxyCertificateOptions) -> bool,
    pub build: fn(&ProxyCertificateOptions) -> ProxyResult<CertificateExtension>,
}

/// Evaluated top to bottom after the caller supplied extensions.
pub static EXTENSION_RULES: &[ExtensionRule] = &[
    ExtensionRule {
        name: "proxy-cert-info",
        applies: wants_proxy_cert_info,
        build: proxy_cert_info,
    },
    ExtensionRule {
        name: "tracing-issuer",
        applies: |o| o.tracing_issuer().is_some(),
        build: tracing_issuer,
    },
    ExtensionRule {
        name: "tracing-subject",
        applies: |o| o.tracing_subject().is_some(),
        build: tracing_subject,
    },
    ExtensionRule {
        name: "saml",
        applies: |o| o.saml_assertion().is_some(),
        build: saml,
    },
    ExtensionRule {
        name: "source-restriction",
        applies: |o| {
            !o.source_restriction_excluded().is_empty() || !o.source_restriction_permitted().is_empty()
        },
        build: source_restriction,
    },
    ExtensionRule {
        name: "target-restriction",
        applies: |o| {
            !o.target_restriction_excluded().is_empty() || !o.target_restriction_permitted().is_empty()
        },
        build: target_restriction,
    },
];

/// Every extension to request, in emission order.
pub fn extension_attributes(options: &ProxyCertificateOptions) -> ProxyResult<Vec<CertificateExtension>> {
    let mut out = options.extensions().to_vec();
    for rule in EXTENSION_RULES {
        if (rule.applies)(options) {
            tracing::trace!("adding {} extension", rule.name);
            out.push((rule.build)(options)?);
        }
    }
    Ok(out)
}

fn wants_proxy_cert_info(o: &ProxyCertificateOptions) -> bool {
    // Legacy proxies predate the extension.
    !o.proxy_type().is_legacy() && (o.policy().is_some() || o.is_limited() || o.path_limit().is_some())
}

/// A builder ran for an option its rule saw set.
fn present<T>(value: Option<T>, rule: &str) -> ProxyResult<T> {
    value.ok_or_else(|| ProxyError::ExtensionEncoding(format!("{rule} rule applied without a value")))
}

fn proxy_cert_info(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let oid = match o.proxy_type() {
        ProxyType::DraftRfc => asn1::DRAFT_PROXY_CERT_INFO_OID,
        _ => asn1::RFC_PROXY_CERT_INFO_OID,
    };
    let value = asn1::encode_proxy_cert_info(o.path_limit(), &o.effective_policy())?;
    Ok(CertificateExtension::new(oid, value, true))
}

fn tracing_issuer(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let value = asn1::encode_tracing_url(present(o.tracing_issuer(), "tracing-issuer")?)?;
    Ok(CertificateExtension::new(asn1::TRACING_ISSUER_OID, value, false))
}

fn tracing_subject(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let value = asn1::encode_tracing_url(present(o.tracing_subject(), "tracing-subject")?)?;
    Ok(CertificateExtension::new(asn1::TRACING_SUBJECT_OID, value, false))
}

fn saml(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let value = asn1::encode_saml(present(o.saml_assertion(), "saml")?)?;
    Ok(CertificateExtension::new(asn1::SAML_OID, value, false))
}

fn source_restriction(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let value = asn1::encode_address_restriction(
        o.source_restriction_excluded(),
        o.source_restriction_permitted(),
    )?;
    Ok(CertificateExtension::new(asn1::SOURCE_RESTRICTION_OID, value, false))
}

fn target_restriction(o: &ProxyCertificateOptions) -> ProxyResult<CertificateExtension> {
    let value = asn1::encode_address_restriction(
        o.target_restriction_excluded(),
        o.target_restriction_permitted(),
    )?;
    Ok(CertificateExtension::new(asn1::TARGET_RESTRICTION_OID, value, false))
}
