//! Persisted key-value storage
//!
//! A tiny string store standing in for browser local storage. Values are
//! opaque strings; callers encode them (usually as JSON).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write-through: returns once the value is durable
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// All keys in one JSON object on disk
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => {
                    debug!("JsonFileStore: loaded {} keys from {:?}", entries.len(), path);
                    entries
                }
                Err(e) => {
                    warn!("JsonFileStore: ignoring malformed {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("JsonFileStore: failed to read {:?}: {}", path, e);
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("writing {:?}", self.path))?;

        *entries = next;
        Ok(())
    }
}

/// In-memory store (tests, ephemeral sessions)
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
