/// Delegation policy carried by the proxy-cert-info extension: a policy
/// language OID and optional policy data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPolicy {
    pub oid: String,
    pub policy: Option<Vec<u8>>,
}

impl ProxyPolicy {
    /// id-ppl-inheritAll (RFC 3820)
    pub const INHERITALL_POLICY_OID: &'static str = "1.3.6.1.5.5.7.21.1";
    /// id-ppl-independent (RFC 3820)
    pub const INDEPENDENT_POLICY_OID: &'static str = "1.3.6.1.5.5.7.21.2";
    /// Globus limited proxy policy
    pub const LIMITED_PROXY_OID: &'static str = "1.3.6.1.4.1.3536.1.1.1.9";

    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            policy: None,
        }
    }

    pub fn with_policy(oid: impl Into<String>, policy: impl Into<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            policy: Some(policy.into()),
        }
    }

    pub fn inherit_all() -> Self {
        Self::new(Self::INHERITALL_POLICY_OID)
    }

    pub fn limited() -> Self {
        Self::new(Self::LIMITED_PROXY_OID)
    }
}
