pub mod error;
pub mod listener;
pub mod trust_store;
pub mod types;
