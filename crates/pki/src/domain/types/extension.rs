/// One extension to be requested in a certificate signing request.
///
/// The value is the DER encoding that lands in `extnValue`. Identity is the OID,
/// but nothing enforces uniqueness: two extensions with the same OID are both
/// emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExtension {
    pub oid: String,
    pub value: Vec<u8>,
    pub critical: bool,
}

impl CertificateExtension {
    pub fn new(oid: impl Into<String>, value: impl Into<Vec<u8>>, critical: bool) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
            critical,
        }
    }
}
