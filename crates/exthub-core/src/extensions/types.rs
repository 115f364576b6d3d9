//! Extension types
//!
//! Records as advertised by the registry, reported by a platform host or
//! read from a side-loaded package.json. All three share one shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Installed extensions keyed by name
pub type InstalledMap = BTreeMap<String, ExtensionRecord>;

/// Feature payloads keyed by extension name
pub type FeatureMap = BTreeMap<String, Value>;

/// Feature key for sidebar contributions
pub const SIDEBAR_VIEW_FEATURE: &str = "sidebarView";

/// Catalogs are not consistent about authors: some send a plain string,
/// some an npm-style person object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Person {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl Author {
    pub fn display_name(&self) -> &str {
        match self {
            Author::Name(name) => name,
            Author::Person { name, .. } => name.as_deref().unwrap_or(""),
        }
    }
}

/// Translated strings for one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nPackage {
    pub locale: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub package: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Entry module, relative to the package root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub i18n: Vec<I18nPackage>,
    /// Capability contributions (e.g. `sidebarView`) keyed by feature
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub features: BTreeMap<String, Value>,
    /// Side-loaded from a local directory instead of the registry
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_false"
    )]
    pub is_debug: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub installed: bool,
    /// Anything else the catalog sends; carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Catalogs send `null` for fields they have no value for; read it as the default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExtensionRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(Author::display_name).unwrap_or("")
    }

    pub fn feature(&self, key: &str) -> Option<&Value> {
        self.features.get(key)
    }
}

/// What caused an installed-state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionAction {
    Init,
    Install,
    Uninstall,
    Enable,
    Disable,
}

impl std::fmt::Display for ExtensionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionAction::Init => write!(f, "init"),
            ExtensionAction::Install => write!(f, "install"),
            ExtensionAction::Uninstall => write!(f, "uninstall"),
            ExtensionAction::Enable => write!(f, "enable"),
            ExtensionAction::Disable => write!(f, "disable"),
        }
    }
}

/// `{code, data}` envelope used by the registry detail endpoint.
/// `code == 0` does not by itself mean the payload is a record: a failed
/// request is reported as code 0 with the error text as `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryReply {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Value,
}

/// A sidebar contribution with the extension it belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarView {
    #[serde(rename = "extensionID", default)]
    pub extension_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
