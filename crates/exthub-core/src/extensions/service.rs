//! Extension service
//!
//! Owns the reconciled view of extensions: what the registry offers, what
//! the platform host has installed, what is side-loaded for debugging and
//! what the user disabled. Every mutation goes through the platform host,
//! then re-derives the installed view and broadcasts the change.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::debug::DebugPackages;
use super::disabled::DisabledNames;
use super::events::{ExtensionEvent, ExtensionEventBus};
use super::platform::{self, ExtensionPlatform, InstallRequest, PlatformKind};
use super::reconcile::{
    compute_installed_list, derive_enabled, extension_ids, merge_catalog, normalize,
    valid_by_feature,
};
use super::registry::RegistryClient;
use super::translate::translate_module;
use super::types::{
    ExtensionAction, ExtensionRecord, FeatureMap, InstalledMap, RegistryReply, SidebarView,
};
use crate::config::{HubConfig, DEFAULT_EXTENSIONS, DEFAULT_IGNORE_LIST};
use crate::error::ExtensionError;
use crate::storage::{JsonFileStore, KeyValueStore};

/// Why the catalog is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Startup sync; debug packages are left out
    Init,
    List,
}

/// Knobs that don't come from a collaborator
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub locale: String,
    pub ignore_list: Vec<String>,
    pub default_extensions: Vec<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            ignore_list: DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect(),
            default_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&HubConfig> for ServiceOptions {
    fn from(config: &HubConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            ignore_list: config.ignore_list.clone(),
            default_extensions: config.default_extensions.clone(),
        }
    }
}

pub struct ExtensionService {
    platform: Arc<dyn ExtensionPlatform>,
    registry: RegistryClient,
    debug: DebugPackages,
    disabled: DisabledNames,
    events: ExtensionEventBus,
    options: ServiceOptions,
    installed_map: InstalledMap,
    installed_list: Vec<ExtensionRecord>,
    extension_ids: Vec<String>,
    debug_extensions: Vec<ExtensionRecord>,
}

impl ExtensionService {
    pub fn new(
        platform: Arc<dyn ExtensionPlatform>,
        registry: RegistryClient,
        debug: DebugPackages,
        disabled: DisabledNames,
        options: ServiceOptions,
    ) -> Self {
        Self {
            platform,
            registry,
            debug,
            disabled,
            events: ExtensionEventBus::default(),
            options,
            installed_map: InstalledMap::new(),
            installed_list: Vec::new(),
            extension_ids: Vec::new(),
            debug_extensions: Vec::new(),
        }
    }

    /// Wire up the collaborators named by `config`
    pub async fn from_config(config: &HubConfig) -> Self {
        let client = reqwest::Client::new();
        let store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::open(config.storage_path.clone()).await);
        let disabled = DisabledNames::load(store).await;
        let platform = platform::connect(config, client.clone()).await;

        Self::new(
            platform,
            RegistryClient::with_client(config.registry_url.clone(), client),
            DebugPackages::new(config.debug_extensions.clone()),
            disabled,
            ServiceOptions::from(config),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent> {
        self.events.subscribe()
    }

    pub fn platform_kind(&self) -> PlatformKind {
        self.platform.kind()
    }

    /// Bring the installed view up to date at startup.
    ///
    /// The web host re-installs everything it knows about (to pick up the
    /// newest versions) and adds the default extensions.
    pub async fn init(&mut self) -> Result<(), ExtensionError> {
        if self.platform.kind() == PlatformKind::Desktop {
            self.refresh().await;
            return Ok(());
        }

        let catalog = self.request_list(ListKind::Init).await?;
        let current = self.get_extensions().await;
        let mut names: Vec<String> = current
            .keys()
            .filter(|name| catalog.iter().any(|m| &m.name == *name))
            .cloned()
            .collect();

        for name in &self.options.default_extensions {
            let in_catalog = catalog.iter().any(|m| &m.name == name);
            if in_catalog && !current.contains_key(name) && !names.contains(name) {
                names.push(name.clone());
            }
        }

        info!("ExtensionService: init installing {:?}", names);
        if names.is_empty() {
            self.update_installed_info(current, ExtensionAction::Init, None);
            return Ok(());
        }
        let mut installed_any = false;
        for name in names {
            installed_any |= self.install(InstallRequest::new(name)).await;
        }
        if !installed_any {
            warn!("ExtensionService: no init install succeeded, keeping the stored set");
            self.update_installed_info(current, ExtensionAction::Init, None);
        }
        Ok(())
    }

    /// Re-read the installed set from the platform host
    pub async fn refresh(&mut self) {
        let map = self.get_extensions().await;
        self.update_installed_info(map, ExtensionAction::Init, None);
    }

    /// Installed set as the platform host reports it; empty if it can't say
    pub async fn get_extensions(&self) -> InstalledMap {
        match self.platform.installed_extensions().await {
            Ok(map) => map,
            Err(e) => {
                error!("ExtensionService: failed to list installed extensions: {:#}", e);
                InstalledMap::new()
            }
        }
    }

    pub fn installed_list(&self) -> &[ExtensionRecord] {
        &self.installed_list
    }

    pub fn installed_map(&self) -> &InstalledMap {
        &self.installed_map
    }

    pub fn extension_ids(&self) -> &[String] {
        &self.extension_ids
    }

    pub fn debug_extensions(&self) -> &[ExtensionRecord] {
        &self.debug_extensions
    }

    pub fn disabled_names(&self) -> &[String] {
        self.disabled.names()
    }

    /// Replace the installed map and re-derive everything that hangs off it
    pub fn update_installed_info(
        &mut self,
        mut map: InstalledMap,
        action: ExtensionAction,
        name: Option<&str>,
    ) {
        derive_enabled(&mut map, self.disabled.names());
        self.extension_ids = extension_ids(&map, &self.options.ignore_list);
        self.installed_list = compute_installed_list(&map, &self.options.ignore_list);
        self.installed_map = map;

        self.events.emit(ExtensionEvent::InstalledExtensionsChange {
            installed_map: self.installed_map.clone(),
            action,
            name: name.map(str::to_string),
        });
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed_list.iter().any(|m| m.name == name)
    }

    /// Catalog merged with installed and debug extensions, translated for
    /// the configured locale. Registry failures are returned as-is.
    pub async fn request_list(
        &mut self,
        kind: ListKind,
    ) -> Result<Vec<ExtensionRecord>, ExtensionError> {
        let remote = self.registry.fetch_catalog(&self.options.locale).await?;

        let mut debug_records = Vec::new();
        if kind != ListKind::Init {
            let pending: Vec<&str> = self
                .debug
                .names()
                .filter(|name| !self.is_installed(name))
                .collect();
            let loaded = join_all(pending.iter().map(|name| self.debug.package_info(name))).await;
            for (name, result) in pending.iter().zip(loaded) {
                match result {
                    Ok(record) => debug_records.push(record),
                    Err(e) => warn!("ExtensionService: debug package '{}': {:#}", name, e),
                }
            }
        }

        let merged = merge_catalog(remote, &self.installed_list, debug_records);
        let list: Vec<ExtensionRecord> = merged
            .into_iter()
            .map(|record| normalize(translate_module(record, &self.options.locale)))
            .collect();

        self.debug_extensions = list.iter().filter(|m| m.is_debug).cloned().collect();
        debug!(
            "ExtensionService: {} extensions listed ({} debug)",
            list.len(),
            self.debug_extensions.len()
        );
        Ok(list)
    }

    /// Detail reply for `id`; debug extensions are answered locally
    pub async fn request_detail(&self, id: &str) -> RegistryReply {
        if let Some(record) = self.debug_extensions.iter().find(|m| m.name == id) {
            return RegistryReply {
                code: 0,
                data: serde_json::to_value(record).unwrap_or(Value::Null),
            };
        }
        self.registry.fetch_detail(id, &self.options.locale).await
    }

    /// Registry detail overlaid with the local installed record, if any
    pub async fn get_detail(&self, name: &str) -> ExtensionRecord {
        let reply = self.request_detail(name).await;
        let mut fields = match reply.data {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };

        if let Some(installed) = self.installed_map.get(name) {
            if let Ok(Value::Object(local)) = serde_json::to_value(installed) {
                fields.extend(local);
            }
            fields.insert("installed".to_string(), Value::Bool(true));
            fields.insert("enable".to_string(), Value::Bool(self.is_enable(name)));
        }

        let mut record = match serde_json::from_value::<ExtensionRecord>(Value::Object(fields)) {
            Ok(record) => record,
            Err(e) => {
                warn!("ExtensionService: unusable detail for '{}': {}", name, e);
                ExtensionRecord::named(name)
            }
        };
        if record.name.is_empty() {
            record.name = name.to_string();
        }
        normalize(translate_module(record, &self.options.locale))
    }

    /// Install through the platform host. Failures are logged, not returned.
    pub async fn install(&mut self, request: InstallRequest) -> bool {
        if let Err(e) = request.validate() {
            error!("ExtensionService: refusing to install: {:#}", e);
            return false;
        }

        let reply = self.platform.install(&request).await;
        if !reply.is_success() {
            error!(
                "ExtensionService: install {} failed ({}): {}",
                request.name, reply.code, reply.data
            );
            return false;
        }

        let map = self.get_extensions().await;
        self.update_installed_info(map, ExtensionAction::Install, Some(&request.name));
        if !self.is_enable(&request.name) {
            if let Err(e) = self.toggle_enable(&request.name, true).await {
                error!("ExtensionService: could not enable {}: {}", request.name, e);
            }
        }
        info!("ExtensionService: installed {}", request.name);
        true
    }

    pub async fn uninstall(&mut self, name: &str) -> bool {
        let reply = self.platform.uninstall(name).await;
        if !reply.is_success() {
            error!(
                "ExtensionService: uninstall {} failed ({}): {}",
                name, reply.code, reply.data
            );
            return false;
        }

        let map = self.get_extensions().await;
        self.update_installed_info(map, ExtensionAction::Uninstall, Some(name));
        info!("ExtensionService: uninstalled {}", name);
        true
    }

    pub fn is_enable(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }

    /// Enable or disable `name`. The disabled list is persisted before the
    /// change is broadcast; if persisting fails nothing changes.
    pub async fn toggle_enable(&mut self, name: &str, enable: bool) -> Result<(), ExtensionError> {
        if enable {
            self.disabled.enable(&[name]).await?;
        } else {
            self.disabled.disable(&[name]).await?;
        }

        let action = if enable {
            ExtensionAction::Enable
        } else {
            ExtensionAction::Disable
        };
        let map = std::mem::take(&mut self.installed_map);
        self.update_installed_info(map, action, Some(name));
        Ok(())
    }

    /// Entry point of an extension's package. The web host installs
    /// missing extensions on demand.
    pub async fn extension_package(&mut self, name: &str) -> Result<Option<String>, ExtensionError> {
        if self.platform.kind() == PlatformKind::Web
            && !self.installed_map.contains_key(name)
            && !self.install(InstallRequest::new(name)).await
        {
            return Ok(None);
        }

        self.platform
            .extension_package(name)
            .await
            .map_err(|e| ExtensionError::Platform {
                action: "load",
                name: name.to_string(),
                reason: format!("{e:#}"),
            })
    }

    pub async fn extensions_by_feature(&self, feature_key: &str) -> FeatureMap {
        match self
            .platform
            .extensions_by_feature(feature_key, &self.installed_list)
            .await
        {
            Ok(features) => features,
            Err(e) => {
                warn!("ExtensionService: feature '{}' lookup failed: {:#}", feature_key, e);
                FeatureMap::new()
            }
        }
    }

    /// Like [`Self::extensions_by_feature`], minus disabled extensions
    pub async fn valid_extensions_by_feature(&self, feature_key: &str) -> FeatureMap {
        let features = self.extensions_by_feature(feature_key).await;
        valid_by_feature(features, self.disabled.names())
    }

    pub async fn sidebar_view(&self, name: &str) -> Option<SidebarView> {
        match self.platform.sidebar_view(name, &self.installed_list).await {
            Ok(view) => view,
            Err(e) => {
                warn!("ExtensionService: sidebar view for '{}' failed: {:#}", name, e);
                None
            }
        }
    }

    pub async fn sidebar_views(&self) -> Vec<SidebarView> {
        match self.platform.sidebar_views(&self.installed_list).await {
            Ok(views) => views,
            Err(e) => {
                warn!("ExtensionService: sidebar views failed: {:#}", e);
                Vec::new()
            }
        }
    }
}
