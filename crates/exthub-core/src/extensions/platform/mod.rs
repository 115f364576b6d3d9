//! Platform hosts
//!
//! A platform host owns the installed set: it installs and removes packages
//! and answers feature queries about them. The desktop host drives npm in a
//! local directory; the web host records manifests fetched from a package
//! CDN. Which one is used is decided once, from config.

mod npm;
mod web;

pub use npm::NpmHost;
pub use web::WebHost;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{ExtensionRecord, FeatureMap, InstalledMap, SidebarView, SIDEBAR_VIEW_FEATURE};
use crate::config::HubConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Packages installed with npm into a local directory
    #[default]
    Desktop,
    /// Package manifests fetched from a CDN
    Web,
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::Desktop => write!(f, "desktop"),
            PlatformKind::Web => write!(f, "web"),
        }
    }
}

/// `{code, data, modules}` reply from install/uninstall. `code == 0` is success.
#[derive(Debug, Clone, Default)]
pub struct PlatformReply {
    pub code: i32,
    pub data: Value,
    /// Installed set after the operation
    pub modules: InstalledMap,
}

impl PlatformReply {
    pub fn ok(modules: InstalledMap) -> Self {
        Self {
            code: 0,
            data: Value::Null,
            modules,
        }
    }

    pub fn failed(code: i32, data: impl Into<String>) -> Self {
        Self {
            code: if code == 0 { -1 } else { code },
            data: Value::String(data.into()),
            modules: InstalledMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

// npm package names, optionally scoped. No leading dash so a name can't pass as a flag.
static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(@[a-z0-9~][a-z0-9\-._~]*/)?[a-z0-9~][a-z0-9\-._~]*$")
        .expect("valid package name regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub name: String,
    /// `latest`, an exact version or a semver range
    pub version: String,
    /// Entry module override; empty keeps the package's own `main`
    pub main: String,
}

impl InstallRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "latest".to_string(),
            main: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    /// Reject names and versions npm or the CDN would misread
    pub fn validate(&self) -> Result<()> {
        if !PACKAGE_NAME.is_match(&self.name) {
            bail!("'{}' is not a valid package name", self.name);
        }
        if self.version != "latest" {
            semver::VersionReq::parse(&self.version)
                .with_context(|| format!("invalid version '{}' for {}", self.version, self.name))?;
        }
        Ok(())
    }

    /// `name@version` as npm and the CDN expect it
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[async_trait]
pub trait ExtensionPlatform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    async fn installed_extensions(&self) -> Result<InstalledMap>;

    async fn install(&self, request: &InstallRequest) -> PlatformReply;

    async fn uninstall(&self, name: &str) -> PlatformReply;

    /// Feature payloads keyed by extension name. `installed` is the
    /// caller's current installed list; hosts that track their own state
    /// may ignore it.
    async fn extensions_by_feature(
        &self,
        feature_key: &str,
        installed: &[ExtensionRecord],
    ) -> Result<FeatureMap>;

    /// Entry point of an installed package (a path or URL)
    async fn extension_package(&self, name: &str) -> Result<Option<String>>;

    async fn sidebar_views(&self, installed: &[ExtensionRecord]) -> Result<Vec<SidebarView>> {
        let features = self
            .extensions_by_feature(SIDEBAR_VIEW_FEATURE, installed)
            .await?;
        Ok(features
            .into_iter()
            .filter_map(|(name, payload)| sidebar_view_from_payload(name, payload))
            .collect())
    }

    async fn sidebar_view(
        &self,
        name: &str,
        installed: &[ExtensionRecord],
    ) -> Result<Option<SidebarView>> {
        Ok(self
            .sidebar_views(installed)
            .await?
            .into_iter()
            .find(|view| view.extension_id == name))
    }
}

fn sidebar_view_from_payload(name: String, payload: Value) -> Option<SidebarView> {
    match serde_json::from_value::<SidebarView>(payload) {
        Ok(mut view) => {
            view.extension_id = name;
            Some(view)
        }
        Err(e) => {
            warn!("Ignoring malformed sidebarView from '{}': {}", name, e);
            None
        }
    }
}

/// Build the platform host named by `config.platform`
pub async fn connect(config: &HubConfig, client: reqwest::Client) -> Arc<dyn ExtensionPlatform> {
    info!(
        "Platform: {} host in {:?}",
        config.platform, config.extensions_dir
    );
    match config.platform {
        PlatformKind::Desktop => Arc::new(NpmHost::new(
            config.extensions_dir.clone(),
            config.npm_registry.clone(),
            config.npm_command.clone(),
        )),
        PlatformKind::Web => Arc::new(
            WebHost::open(config.cdn_url.clone(), &config.extensions_dir, client).await,
        ),
    }
}
