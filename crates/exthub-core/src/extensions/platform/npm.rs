//! Desktop host: npm-managed extension directory
//!
//! Layout:
//! ```text
//! <root>/package.json          dependencies = installed extensions
//! <root>/node_modules/<name>/  one package per extension
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{ExtensionPlatform, InstallRequest, PlatformKind, PlatformReply};
use crate::extensions::package::{read_package_manifest, PACKAGE_MANIFEST};
use crate::extensions::reconcile::features_from_records;
use crate::extensions::types::{ExtensionRecord, FeatureMap, InstalledMap};

pub struct NpmHost {
    root: PathBuf,
    registry: String,
    command: String,
}

impl NpmHost {
    pub fn new(root: PathBuf, registry: String, command: String) -> Self {
        Self {
            root,
            registry,
            command,
        }
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        // Scoped names ("@scope/pkg") map onto nested directories
        name.split('/')
            .fold(self.root.join("node_modules"), |dir, part| dir.join(part))
    }

    /// npm refuses to `--prefix` into a directory without a package.json
    async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating {:?}", self.root))?;
        let manifest = self.root.join(PACKAGE_MANIFEST);
        if !manifest.exists() {
            let content = json!({
                "name": "exthub-extensions",
                "private": true,
                "dependencies": {}
            });
            fs::write(&manifest, serde_json::to_string_pretty(&content)?)
                .await
                .with_context(|| format!("writing {:?}", manifest))?;
        }
        Ok(())
    }

    async fn dependency_names(&self) -> Result<Vec<String>> {
        let manifest = self.root.join(PACKAGE_MANIFEST);
        let content = match fs::read_to_string(&manifest).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {:?}", manifest)),
        };
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing {:?}", manifest))?;
        Ok(value
            .get("dependencies")
            .and_then(Value::as_object)
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn run_npm(&self, action: &str, args: &[&str]) -> PlatformReply {
        if let Err(e) = self.ensure_root().await {
            return PlatformReply::failed(-1, format!("{e:#}"));
        }

        debug!("NpmHost: {} {} {:?}", self.command, action, args);
        let output = Command::new(&self.command)
            .arg(action)
            .args(args)
            .arg("--prefix")
            .arg(&self.root)
            .arg("--registry")
            .arg(&self.registry)
            .arg("--no-audit")
            .arg("--no-fund")
            .current_dir(&self.root)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                error!("NpmHost: failed to spawn '{}': {}", self.command, e);
                return PlatformReply::failed(-1, format!("failed to run {}: {}", self.command, e));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return PlatformReply::failed(output.status.code().unwrap_or(-1), stderr);
        }

        match self.installed_extensions().await {
            Ok(modules) => PlatformReply::ok(modules),
            Err(e) => {
                warn!("NpmHost: {} succeeded but rescan failed: {:#}", action, e);
                PlatformReply::ok(InstalledMap::new())
            }
        }
    }
}

#[async_trait]
impl ExtensionPlatform for NpmHost {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Desktop
    }

    async fn installed_extensions(&self) -> Result<InstalledMap> {
        let mut installed = InstalledMap::new();
        for name in self.dependency_names().await? {
            match read_package_manifest(&self.package_dir(&name)).await {
                Ok(mut record) => {
                    record.name = name.clone();
                    record.installed = true;
                    installed.insert(name, record);
                }
                Err(e) => warn!("NpmHost: skipping '{}': {:#}", name, e),
            }
        }
        Ok(installed)
    }

    async fn install(&self, request: &InstallRequest) -> PlatformReply {
        info!("NpmHost: installing {}", request.spec());
        self.run_npm("install", &[&request.spec()]).await
    }

    async fn uninstall(&self, name: &str) -> PlatformReply {
        info!("NpmHost: uninstalling {}", name);
        self.run_npm("uninstall", &[name]).await
    }

    async fn extensions_by_feature(
        &self,
        feature_key: &str,
        _installed: &[ExtensionRecord],
    ) -> Result<FeatureMap> {
        let installed = self.installed_extensions().await?;
        Ok(features_from_records(feature_key, installed.values()))
    }

    async fn extension_package(&self, name: &str) -> Result<Option<String>> {
        let dir = self.package_dir(name);
        if !dir.join(PACKAGE_MANIFEST).exists() {
            return Ok(None);
        }
        let record = read_package_manifest(&dir).await?;
        let main = record.main.as_deref().unwrap_or("index.js");
        Ok(Some(dir.join(main).to_string_lossy().into_owned()))
    }
}
