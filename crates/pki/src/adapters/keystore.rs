//! Key-store files as a source of trusted CA certificates.

mod format;
mod source;

pub use format::{decode, KeystoreFormat};
pub use source::KeystoreFileSource;
