//! Shared fixtures for unit tests

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::extensions::platform::{ExtensionPlatform, InstallRequest, PlatformKind, PlatformReply};
use crate::extensions::reconcile::features_from_records;
use crate::extensions::types::{ExtensionRecord, FeatureMap, InstalledMap};
use crate::storage::{KeyValueStore, MemoryStore};

/// Serve `respond(url) -> (status, body)` as JSON on an ephemeral port.
/// Returns the base URL.
pub fn serve_json<F>(respond: F) -> String
where
    F: Fn(&str) -> (u16, String) + Send + 'static,
{
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let (status, body) = respond(request.url());
            let header: tiny_http::Header = "Content-Type: application/json".parse().unwrap();
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}")
}

/// Store whose writes always fail; reads come from the seeded entries
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl ReadOnlyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        Self {
            inner: MemoryStore::with_entry(key, value),
        }
    }
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        anyhow::bail!("storage is read-only, cannot write {key}")
    }
}

/// In-memory platform host
pub struct FakePlatform {
    kind: PlatformKind,
    installed: Mutex<InstalledMap>,
    /// Names whose install fails with a non-zero code
    failing: Vec<String>,
    pub install_calls: AtomicUsize,
}

impl FakePlatform {
    pub fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            installed: Mutex::new(InstalledMap::new()),
            failing: Vec::new(),
            install_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_installed(self, records: Vec<ExtensionRecord>) -> Self {
        {
            let mut installed = self.installed.lock().unwrap();
            for mut record in records {
                record.installed = true;
                installed.insert(record.name.clone(), record);
            }
        }
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    pub fn installs(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtensionPlatform for FakePlatform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    async fn installed_extensions(&self) -> Result<InstalledMap> {
        Ok(self.installed.lock().unwrap().clone())
    }

    async fn install(&self, request: &InstallRequest) -> PlatformReply {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&request.name) {
            return PlatformReply::failed(1, format!("cannot install {}", request.name));
        }
        let mut installed = self.installed.lock().unwrap();
        let mut record = installed
            .get(&request.name)
            .cloned()
            .unwrap_or_else(|| ExtensionRecord::named(&request.name));
        record.installed = true;
        installed.insert(request.name.clone(), record);
        PlatformReply::ok(installed.clone())
    }

    async fn uninstall(&self, name: &str) -> PlatformReply {
        let mut installed = self.installed.lock().unwrap();
        match installed.remove(name) {
            Some(_) => PlatformReply::ok(installed.clone()),
            None => PlatformReply::failed(1, format!("{name} is not installed")),
        }
    }

    async fn extensions_by_feature(
        &self,
        feature_key: &str,
        _installed: &[ExtensionRecord],
    ) -> Result<FeatureMap> {
        let installed = self.installed.lock().unwrap();
        Ok(features_from_records(feature_key, installed.values()))
    }

    async fn extension_package(&self, name: &str) -> Result<Option<String>> {
        let installed = self.installed.lock().unwrap();
        Ok(installed.get(name).map(|r| format!("/fake/{}", r.name)))
    }
}
