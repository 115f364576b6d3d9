//! Extension events
//!
//! Installed-state changes are broadcast to whoever is listening.

use serde::Serialize;
use tokio::sync::broadcast;

use super::types::{ExtensionAction, InstalledMap};

/// Events emitted after installed state changes.
///
/// Serializes as `{"type": "installedExtensionsChange", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ExtensionEvent {
    InstalledExtensionsChange {
        #[serde(rename = "installedMap")]
        installed_map: InstalledMap,
        action: ExtensionAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// Event bus for extension events
pub struct ExtensionEventBus {
    sender: broadcast::Sender<ExtensionEvent>,
}

impl ExtensionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Having no subscribers is fine.
    pub fn emit(&self, event: ExtensionEvent) {
        tracing::debug!("Extension event: {:?}", event);
        let _ = self.sender.send(event);
    }
}

impl Default for ExtensionEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
