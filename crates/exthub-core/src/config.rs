//! Hub configuration
//!
//! Loaded from `config.toml` in the config dir. Every field has a default so
//! a missing file (or a partial one) is fine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::ExtensionError;
use crate::extensions::platform::PlatformKind;
use crate::paths;

pub const DEFAULT_REGISTRY_URL: &str = "https://extensions.postcat.com/api";
pub const DEFAULT_CDN_URL: &str = "https://unpkg.com";
pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// Extensions installed on first start of the web host
pub const DEFAULT_EXTENSIONS: &[&str] = &["postcat-export-openapi", "postcat-import-openapi"];

/// Installed-map keys that never show up in the installed list
pub const DEFAULT_IGNORE_LIST: &[&str] = &["default"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the extension registry (`/list`, `/detail/{id}`)
    pub registry_url: String,
    /// Locale passed to the registry and used for translating records
    pub locale: String,
    /// Which platform host manages installed packages
    pub platform: PlatformKind,
    pub extensions_dir: PathBuf,
    pub storage_path: PathBuf,
    /// Package CDN used by the web host
    pub cdn_url: String,
    /// npm registry used by the desktop host
    pub npm_registry: String,
    pub npm_command: String,
    pub ignore_list: Vec<String>,
    pub default_extensions: Vec<String>,
    /// Side-loaded packages: extension name -> local package directory
    pub debug_extensions: BTreeMap<String, PathBuf>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            locale: "en-US".to_string(),
            platform: PlatformKind::default(),
            extensions_dir: paths::extensions_dir(),
            storage_path: paths::storage_file(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
            npm_registry: DEFAULT_NPM_REGISTRY.to_string(),
            npm_command: "npm".to_string(),
            ignore_list: DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect(),
            default_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            debug_extensions: BTreeMap::new(),
        }
    }
}

impl HubConfig {
    /// Load from the default location, then apply environment overrides
    pub async fn load_default() -> Result<Self, ExtensionError> {
        let mut config = Self::load(&paths::config_file()).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self, ExtensionError> {
        if !path.exists() {
            debug!("HubConfig: no config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config: HubConfig = toml::from_str(&content).map_err(|e| ExtensionError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!("HubConfig: loaded {:?}", path);
        Ok(config)
    }

    /// `EXTHUB_REGISTRY_URL` and `EXTHUB_LOCALE` win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("EXTHUB_REGISTRY_URL") {
            if !url.is_empty() {
                self.registry_url = url;
            }
        }
        if let Ok(locale) = std::env::var("EXTHUB_LOCALE") {
            if !locale.is_empty() {
                self.locale = locale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HubConfig::load(&dir.path().join("nope.toml")).await.unwrap();
        assert_eq!(config, HubConfig::default());
        assert_eq!(config.ignore_list, vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
locale = "zh-Hans"
platform = "web"

[debug_extensions]
my-ext = "/tmp/my-ext"
"#,
        )
        .unwrap();

        let config = HubConfig::load(&path).await.unwrap();
        assert_eq!(config.locale, "zh-Hans");
        assert_eq!(config.platform, PlatformKind::Web);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(
            config.debug_extensions.get("my-ext"),
            Some(&PathBuf::from("/tmp/my-ext"))
        );
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "platform = [").unwrap();

        let result = HubConfig::load(&path).await;
        assert!(matches!(result, Err(ExtensionError::Config { .. })));
    }
}
