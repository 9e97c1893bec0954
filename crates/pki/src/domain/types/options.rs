use openssl::bn::BigNum;
use openssl::pkey::{PKey, Public};
use openssl::x509::X509;

use crate::domain::error::{ProxyError, ProxyResult};

use super::core::ProxyType;
use super::extension::CertificateExtension;
use super::policy::ProxyPolicy;

/// Centralized defaults for proxy requests.
pub struct ProxyDefaults;

impl ProxyDefaults {
    pub const KEY_LENGTH: u32 = 2048;
    pub const PROXY_TYPE: ProxyType = ProxyType::Rfc3820;
    pub const PATH_LIMIT: Option<u32> = None; // unlimited
    pub const POLICY: Option<ProxyPolicy> = None; // inherit-all is substituted when needed
    pub const LIMITED: bool = false;
}

/// Everything the request generator needs. Immutable once built; create one per
/// request with [`ProxyCertificateOptions::builder`].
#[derive(Debug)]
pub struct ProxyCertificateOptions {
    parent_chain: Vec<X509>,
    proxy_type: ProxyType,
    path_limit: Option<u32>,
    policy: Option<ProxyPolicy>,
    limited: bool,
    serial_number: Option<BigNum>,
    public_key: Option<PKey<Public>>,
    key_length: u32,
    tracing_issuer: Option<String>,
    tracing_subject: Option<String>,
    saml_assertion: Option<Vec<u8>>,
    source_excluded: Vec<String>,
    source_permitted: Vec<String>,
    target_excluded: Vec<String>,
    target_permitted: Vec<String>,
    extensions: Vec<CertificateExtension>,
}

impl ProxyCertificateOptions {
    /// Start building options for a proxy issued by `parent_chain[0]`.
    pub fn builder(parent_chain: Vec<X509>) -> ProxyCertificateOptionsBuilder {
        ProxyCertificateOptionsBuilder {
            inner: ProxyCertificateOptions {
                parent_chain,
                proxy_type: ProxyDefaults::PROXY_TYPE,
                path_limit: ProxyDefaults::PATH_LIMIT,
                policy: ProxyDefaults::POLICY,
                limited: ProxyDefaults::LIMITED,
                serial_number: None,
                public_key: None,
                key_length: ProxyDefaults::KEY_LENGTH,
                tracing_issuer: None,
                tracing_subject: None,
                saml_assertion: None,
                source_excluded: Vec::new(),
                source_permitted: Vec::new(),
                target_excluded: Vec::new(),
                target_permitted: Vec::new(),
                extensions: Vec::new(),
            },
        }
    }

    pub fn parent_chain(&self) -> &[X509] {
        &self.parent_chain
    }

    /// The certificate issuing the proxy (chain element 0).
    pub fn issuer(&self) -> &X509 {
        // Non-empty by construction, see `ProxyCertificateOptionsBuilder::build`.
        &self.parent_chain[0]
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.proxy_type
    }

    pub fn path_limit(&self) -> Option<u32> {
        self.path_limit
    }

    pub fn policy(&self) -> Option<&ProxyPolicy> {
        self.policy.as_ref()
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Policy that goes into proxy-cert-info: the explicit one, else the
    /// limited policy for limited proxies, else inherit-all.
    pub fn effective_policy(&self) -> ProxyPolicy {
        match &self.policy {
            Some(policy) => policy.clone(),
            None if self.limited => ProxyPolicy::limited(),
            None => ProxyPolicy::inherit_all(),
        }
    }

    pub fn serial_number(&self) -> Option<&BigNum> {
        self.serial_number.as_ref()
    }

    pub fn public_key(&self) -> Option<&PKey<Public>> {
        self.public_key.as_ref()
    }

    pub fn key_length(&self) -> u32 {
        self.key_length
    }

    pub fn tracing_issuer(&self) -> Option<&str> {
        self.tracing_issuer.as_deref()
    }

    pub fn tracing_subject(&self) -> Option<&str> {
        self.tracing_subject.as_deref()
    }

    pub fn saml_assertion(&self) -> Option<&[u8]> {
        self.saml_assertion.as_deref()
    }

    pub fn source_restriction_excluded(&self) -> &[String] {
        &self.source_excluded
    }

    pub fn source_restriction_permitted(&self) -> &[String] {
        &self.source_permitted
    }

    pub fn target_restriction_excluded(&self) -> &[String] {
        &self.target_excluded
    }

    pub fn target_restriction_permitted(&self) -> &[String] {
        &self.target_permitted
    }

    pub fn extensions(&self) -> &[CertificateExtension] {
        &self.extensions
    }
}

/// Builder for [`ProxyCertificateOptions`].
#[derive(Debug)]
pub struct ProxyCertificateOptionsBuilder {
    inner: ProxyCertificateOptions,
}

impl ProxyCertificateOptionsBuilder {
    pub fn proxy_type(mut self, proxy_type: ProxyType) -> Self {
        self.inner.proxy_type = proxy_type;
        self
    }

    pub fn path_limit(mut self, limit: u32) -> Self {
        self.inner.path_limit = Some(limit);
        self
    }

    pub fn policy(mut self, policy: ProxyPolicy) -> Self {
        self.inner.policy = Some(policy);
        self
    }

    /// Limited proxies: legacy ones are named `limited proxy`, the others get
    /// the limited policy unless a policy is set explicitly.
    pub fn limited(mut self, limited: bool) -> Self {
        self.inner.limited = limited;
        self
    }

    /// Requested serial number; becomes the CN appended to the issuer subject.
    pub fn serial_number(mut self, serial: BigNum) -> Self {
        self.inner.serial_number = Some(serial);
        self
    }

    /// Build the request for an externally held key instead of generating one.
    pub fn public_key(mut self, key: PKey<Public>) -> Self {
        self.inner.public_key = Some(key);
        self
    }

    pub fn key_length(mut self, bits: u32) -> Self {
        self.inner.key_length = bits;
        self
    }

    pub fn tracing_issuer(mut self, url: impl Into<String>) -> Self {
        self.inner.tracing_issuer = Some(url.into());
        self
    }

    pub fn tracing_subject(mut self, url: impl Into<String>) -> Self {
        self.inner.tracing_subject = Some(url.into());
        self
    }

    pub fn saml_assertion(mut self, assertion: impl Into<Vec<u8>>) -> Self {
        self.inner.saml_assertion = Some(assertion.into());
        self
    }

    pub fn source_restriction_excluded<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.source_excluded = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn source_restriction_permitted<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.source_permitted = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn target_restriction_excluded<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.target_excluded = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn target_restriction_permitted<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.target_permitted = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn extension(mut self, extension: CertificateExtension) -> Self {
        self.inner.extensions.push(extension);
        self
    }

    pub fn extensions(mut self, extensions: impl IntoIterator<Item = CertificateExtension>) -> Self {
        self.inner.extensions.extend(extensions);
        self
    }

    pub fn build(self) -> ProxyResult<ProxyCertificateOptions> {
        if self.inner.parent_chain.is_empty() {
            return Err(ProxyError::EmptyChain);
        }
        Ok(self.inner)
    }
}
