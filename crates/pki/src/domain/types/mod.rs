// Re-export all types so callers can use `domain::types::*`
// while the code stays organized per concern.

pub use self::core::*;
pub use extension::*;
pub use policy::*;
pub use options::*;
pub use trust::*;
pub use config::*;

// Module declarations
mod core;
mod extension;
mod policy;
mod options;
mod trust;
mod config;
