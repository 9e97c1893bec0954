//! Trust anchor store implementations.

mod memory;
mod refresh;

pub use memory::InMemoryTrustAnchorStore;
pub use refresh::{FilesystemTrustAnchorStore, RefreshingTrustAnchorStore};
