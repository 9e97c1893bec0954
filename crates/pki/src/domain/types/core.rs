/// Flavor of proxy certificate to request. Mapped to extension OIDs internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    /// Pre-standard Globus proxies. Never carry a proxy-cert-info extension.
    Legacy,
    /// Proxies following the pre-RFC draft (GSI3).
    DraftRfc,
    /// RFC 3820 proxies.
    Rfc3820,
}

impl ProxyType {
    pub fn is_legacy(self) -> bool {
        matches!(self, ProxyType::Legacy)
    }
}

/// How serious a reported trust material problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Kind of trust material a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    CaCert,
    Crl,
    NamespacePolicy,
}

impl ResourceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceCategory::CaCert => "CA certificate",
            ResourceCategory::Crl => "CRL",
            ResourceCategory::NamespacePolicy => "namespace policy",
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
