//! Core library for exthub
//!
//! Reconciles the remote extension catalog with locally installed and
//! side-loaded debug extensions, and tracks which of them are enabled.

pub mod config;
pub mod error;
pub mod extensions;
pub mod paths;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::HubConfig;
pub use error::ExtensionError;
