//! Side-loaded debug packages
//!
//! Extensions under development are loaded straight from a local directory
//! and never go through the registry.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use super::package::read_package_manifest;
use super::types::ExtensionRecord;

#[derive(Debug, Clone, Default)]
pub struct DebugPackages {
    dirs: BTreeMap<String, PathBuf>,
}

impl DebugPackages {
    pub fn new(dirs: BTreeMap<String, PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    /// Load the package info for `name`, marked as a debug record
    pub async fn package_info(&self, name: &str) -> Result<ExtensionRecord> {
        let dir = self
            .dirs
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no debug package named '{}'", name))?;

        let mut record = read_package_manifest(dir).await?;
        if record.name.is_empty() {
            record.name = name.to_string();
        }
        record.is_debug = true;
        record.installed = false;
        debug!("DebugPackages: loaded '{}' from {:?}", record.name, dir);
        Ok(record)
    }
}
