//! Registry API for the extension catalog

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::types::{ExtensionRecord, RegistryReply};
use crate::error::ExtensionError;

#[derive(Deserialize, Debug, Default)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Clone)]
pub struct RegistryClient {
    host: String,
    client: reqwest::Client,
}

impl RegistryClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_client(host, reqwest::Client::new())
    }

    pub fn with_client(host: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            host: host.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str, locale: &str) -> Result<Url, ExtensionError> {
        let raw = format!("{}/{}", self.host.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| ExtensionError::Network {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("locale", locale);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ExtensionError> {
        let network = |e: reqwest::Error| ExtensionError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", "exthub")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!("Registry API error for {}: {}", url, status);
            return Err(ExtensionError::Registry {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(network)
    }

    /// Fetch the catalog. Entries that don't parse as records are dropped.
    pub async fn fetch_catalog(&self, locale: &str) -> Result<Vec<ExtensionRecord>, ExtensionError> {
        let url = self.endpoint("list", locale)?;
        debug!("Registry API: fetching catalog from {}", url);

        let response: CatalogResponse = self.get_json(url).await?;
        let entries: Vec<ExtensionRecord> = response
            .data
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<ExtensionRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Registry API: skipping malformed catalog entry: {}", e);
                    None
                }
            })
            .collect();

        debug!("Registry API: {} catalog entries", entries.len());
        Ok(entries)
    }

    /// Fetch one extension's detail. Never fails: a network or decode
    /// error comes back as `code: 0` with the error text in `data`.
    pub async fn fetch_detail(&self, id: &str, locale: &str) -> RegistryReply {
        let result = match self.endpoint(&format!("detail/{id}"), locale) {
            Ok(url) => self.get_json::<RegistryReply>(url).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            warn!("Registry API: detail for '{}' failed: {}", id, e);
            RegistryReply {
                code: 0,
                data: Value::String(e.to_string()),
            }
        })
    }
}
