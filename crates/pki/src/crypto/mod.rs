//! Proxy request building blocks: DER encoders, the extension rule table and
//! the request generator.

pub mod asn1;
pub mod csr;
pub mod rules;

pub use csr::{ProxyCsr, ProxyCsrGenerator};
pub use rules::{extension_attributes, ExtensionRule, EXTENSION_RULES};
