//! Extension catalog and install state
//!
//! The registry says what exists, a platform host says what is installed,
//! debug packages add local work in progress, and the disabled list says
//! what the user switched off. [`ExtensionService`] reconciles all four.

pub mod debug;
pub mod disabled;
pub mod events;
pub mod package;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod service;
pub mod translate;
pub mod types;

pub use events::{ExtensionEvent, ExtensionEventBus};
pub use platform::{ExtensionPlatform, InstallRequest, PlatformKind, PlatformReply};
pub use registry::RegistryClient;
pub use service::{ExtensionService, ListKind, ServiceOptions};
pub use types::*;
