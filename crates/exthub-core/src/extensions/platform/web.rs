//! Web host: package manifests from a CDN
//!
//! Nothing is executed locally. Installing an extension records its
//! package.json; the entry module is served by the CDN.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ExtensionPlatform, InstallRequest, PlatformKind, PlatformReply};
use crate::extensions::package::parse_package_manifest;
use crate::extensions::reconcile::features_from_records;
use crate::extensions::types::{ExtensionRecord, FeatureMap, InstalledMap};

const STATE_FILE: &str = "web-installed.json";

pub struct WebHost {
    cdn_url: String,
    state_path: PathBuf,
    client: reqwest::Client,
    installed: RwLock<InstalledMap>,
}

impl WebHost {
    /// Open the host, restoring the installed set from `dir`
    pub async fn open(cdn_url: String, dir: &Path, client: reqwest::Client) -> Self {
        let state_path = dir.join(STATE_FILE);
        let installed = match fs::read_to_string(&state_path).await {
            Ok(content) => match serde_json::from_str::<Vec<ExtensionRecord>>(&content) {
                Ok(records) => records
                    .into_iter()
                    .map(|record| (record.name.clone(), record))
                    .collect(),
                Err(e) => {
                    warn!("WebHost: ignoring malformed {:?}: {}", state_path, e);
                    InstalledMap::new()
                }
            },
            Err(_) => InstalledMap::new(),
        };
        debug!("WebHost: {} installed extensions", installed.len());

        Self {
            cdn_url,
            state_path,
            client,
            installed: RwLock::new(installed),
        }
    }

    fn asset_url(&self, spec: &str, file: &str) -> String {
        format!(
            "{}/{}/{}",
            self.cdn_url.trim_end_matches('/'),
            spec,
            file.trim_start_matches("./")
        )
    }

    async fn fetch_manifest(&self, request: &InstallRequest) -> Result<ExtensionRecord> {
        let url = self.asset_url(&request.spec(), "package.json");
        debug!("WebHost: fetching {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "exthub")
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?;
        if !response.status().is_success() {
            bail!("CDN returned {} for {}", response.status(), url);
        }
        let body = response.text().await.context("reading package.json")?;
        parse_package_manifest(&body)
    }

    async fn persist(&self, installed: &InstalledMap) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let records: Vec<&ExtensionRecord> = installed.values().collect();
        fs::write(&self.state_path, serde_json::to_string_pretty(&records)?)
            .await
            .with_context(|| format!("writing {:?}", self.state_path))?;
        Ok(())
    }
}

#[async_trait]
impl ExtensionPlatform for WebHost {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Web
    }

    async fn installed_extensions(&self) -> Result<InstalledMap> {
        Ok(self.installed.read().await.clone())
    }

    async fn install(&self, request: &InstallRequest) -> PlatformReply {
        info!("WebHost: installing {}", request.spec());
        let mut record = match self.fetch_manifest(request).await {
            Ok(record) => record,
            Err(e) => return PlatformReply::failed(-1, format!("{e:#}")),
        };
        record.name = request.name.clone();
        if !request.main.is_empty() {
            record.main = Some(request.main.clone());
        }
        record.installed = true;

        let mut installed = self.installed.write().await;
        let mut next = installed.clone();
        next.insert(request.name.clone(), record);
        if let Err(e) = self.persist(&next).await {
            return PlatformReply::failed(-1, format!("{e:#}"));
        }
        *installed = next;
        PlatformReply::ok(installed.clone())
    }

    async fn uninstall(&self, name: &str) -> PlatformReply {
        let mut installed = self.installed.write().await;
        if !installed.contains_key(name) {
            return PlatformReply::failed(-1, format!("'{name}' is not installed"));
        }
        let mut next = installed.clone();
        next.remove(name);
        if let Err(e) = self.persist(&next).await {
            return PlatformReply::failed(-1, format!("{e:#}"));
        }
        info!("WebHost: uninstalled {}", name);
        *installed = next;
        PlatformReply::ok(installed.clone())
    }

    async fn extensions_by_feature(
        &self,
        feature_key: &str,
        installed: &[ExtensionRecord],
    ) -> Result<FeatureMap> {
        Ok(features_from_records(feature_key, installed))
    }

    async fn extension_package(&self, name: &str) -> Result<Option<String>> {
        let installed = self.installed.read().await;
        Ok(installed.get(name).map(|record| {
            let spec = format!("{}@{}", record.name, record.version);
            self.asset_url(&spec, record.main.as_deref().unwrap_or("index.js"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_json;

    #[tokio::test]
    async fn test_install_records_manifest() {
        let cdn = serve_json(|url| match url {
            "/postcat-apispace@latest/package.json" => (
                200,
                r#"{"name": "postcat-apispace", "version": "0.2.1", "main": "./dist/index.js"}"#
                    .to_string(),
            ),
            _ => (404, "{}".to_string()),
        });
        let dir = tempfile::tempdir().unwrap();
        let host = WebHost::open(cdn.clone(), dir.path(), reqwest::Client::new()).await;

        let reply = host.install(&InstallRequest::new("postcat-apispace")).await;
        assert!(reply.is_success(), "{:?}", reply.data);
        assert!(reply.modules["postcat-apispace"].installed);

        let entry = host.extension_package("postcat-apispace").await.unwrap();
        assert_eq!(
            entry.as_deref(),
            Some(format!("{cdn}/postcat-apispace@0.2.1/dist/index.js").as_str())
        );

        // State survives a restart
        let reopened = WebHost::open(cdn, dir.path(), reqwest::Client::new()).await;
        assert!(reopened
            .installed_extensions()
            .await
            .unwrap()
            .contains_key("postcat-apispace"));
    }

    #[tokio::test]
    async fn test_install_main_override_and_failure() {
        let cdn = serve_json(|url| match url {
            "/a@1.0.0/package.json" => (200, r#"{"name": "a", "version": "1.0.0"}"#.to_string()),
            _ => (404, "{}".to_string()),
        });
        let dir = tempfile::tempdir().unwrap();
        let host = WebHost::open(cdn, dir.path(), reqwest::Client::new()).await;

        let reply = host
            .install(&InstallRequest::new("a").with_version("1.0.0").with_main("web.js"))
            .await;
        assert!(reply.is_success());
        assert_eq!(reply.modules["a"].main.as_deref(), Some("web.js"));

        let missing = host.install(&InstallRequest::new("b")).await;
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_uninstall() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE),
            r#"[{"name": "a", "version": "1.0.0", "installed": true}]"#,
        )
        .unwrap();
        let host = WebHost::open("http://127.0.0.1:9".into(), dir.path(), reqwest::Client::new()).await;

        assert!(host.uninstall("a").await.is_success());
        assert!(!host.uninstall("a").await.is_success());
        assert!(host.installed_extensions().await.unwrap().is_empty());
    }
}
