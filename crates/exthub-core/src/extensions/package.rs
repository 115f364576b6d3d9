//! package.json reading
//!
//! Installed and side-loaded extensions are npm-style packages; their
//! manifest doubles as the extension record.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use super::types::ExtensionRecord;

pub const PACKAGE_MANIFEST: &str = "package.json";

pub fn parse_package_manifest(content: &str) -> Result<ExtensionRecord> {
    serde_json::from_str(content).context("parsing package.json")
}

/// Read `<dir>/package.json`
pub async fn read_package_manifest(dir: &Path) -> Result<ExtensionRecord> {
    let path = dir.join(PACKAGE_MANIFEST);
    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    parse_package_manifest(&content).with_context(|| format!("in {}", path.display()))
}
