//! Disabled extension names
//!
//! Persisted as a JSON array under one storage key. Absence from the list
//! means enabled.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ExtensionError;
use crate::storage::KeyValueStore;

pub const DISABLE_EXTENSION_NAMES: &str = "DISABLE_EXTENSION_NAMES";

/// Decode the stored value. Anything that isn't a JSON array reads as
/// "nothing disabled"; non-string elements of an array are skipped.
pub fn parse_disabled_names(raw: Option<&str>) -> Vec<String> {
    let raw = raw.unwrap_or("[]");
    match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) => {
            let total = values.len();
            let names: Vec<String> = values
                .into_iter()
                .filter_map(|value| match value {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect();
            if names.len() != total {
                warn!(
                    "DisabledNames: skipped {} non-string stored entries",
                    total - names.len()
                );
            }
            names
        }
        Err(e) => {
            warn!("DisabledNames: ignoring malformed stored value: {}", e);
            Vec::new()
        }
    }
}

pub struct DisabledNames {
    names: Vec<String>,
    store: Arc<dyn KeyValueStore>,
}

impl DisabledNames {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let raw = match store.get(DISABLE_EXTENSION_NAMES).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("DisabledNames: failed to read store: {}", e);
                None
            }
        };
        let names = parse_disabled_names(raw.as_deref());
        debug!("DisabledNames: {} disabled", names.len());
        Self { names, store }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub async fn enable(&mut self, names: &[&str]) -> Result<(), ExtensionError> {
        let next = self
            .names
            .iter()
            .filter(|n| !names.contains(&n.as_str()))
            .cloned()
            .collect();
        self.set(next).await
    }

    pub async fn disable(&mut self, names: &[&str]) -> Result<(), ExtensionError> {
        let mut next = self.names.clone();
        for name in names {
            if !next.iter().any(|n| n == name) {
                next.push(name.to_string());
            }
        }
        self.set(next).await
    }

    /// Persist first; memory only changes once the write went through
    async fn set(&mut self, names: Vec<String>) -> Result<(), ExtensionError> {
        let json = serde_json::to_string(&names)?;
        self.store
            .set(DISABLE_EXTENSION_NAMES, &json)
            .await
            .map_err(|e| ExtensionError::Persistence {
                key: DISABLE_EXTENSION_NAMES.to_string(),
                reason: e.to_string(),
            })?;
        self.names = names;
        Ok(())
    }
}
