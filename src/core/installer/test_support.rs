//! In-process artifact repository and a small published version for installer tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::net::TcpListener;

use super::{DependencyInstaller, InstallOptions};
use crate::core::config::ChecksumSettings;
use crate::core::downloader::Downloader;
use crate::core::http::build_http_client;
use crate::core::platform::Platform;
use crate::core::store::MinecraftStore;
use crate::core::version::{resolve, ResolvedVersion, VersionEntry};

pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serves registered bodies by path, counting requests and peak concurrency.
#[derive(Default)]
pub struct FakeRepo {
    files: Mutex<HashMap<String, Vec<u8>>>,
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Mutex<Duration>,
}

impl FakeRepo {
    pub async fn start() -> (Arc<Self>, String) {
        let repo = Arc::new(Self::default());
        let app = Router::new().fallback(serve_file).with_state(repo.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (repo, format!("http://{addr}"))
    }

    pub fn put(&self, path: &str, body: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    pub fn reset_hits(&self) {
        self.hits.lock().unwrap().clear();
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

async fn serve_file(State(repo): State<Arc<FakeRepo>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *repo.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    let now = repo.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    repo.peak.fetch_max(now, Ordering::SeqCst);
    let delay = *repo.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    repo.in_flight.fetch_sub(1, Ordering::SeqCst);

    let body = repo.files.lock().unwrap().get(&path).cloned();
    match body {
        Some(body) => body.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn test_platform() -> Platform {
    Platform::new("linux", "6.1.0", "x86_64")
}

/// Every checksum on, assets served from `<base>/assets`.
pub fn test_options(base: &str) -> InstallOptions {
    InstallOptions {
        checksum: ChecksumSettings {
            jar: true,
            libraries: true,
            asset_index: true,
            assets: true,
        },
        assets_host: format!("{base}/assets"),
        asset_batch_size: 4,
        ..InstallOptions::default()
    }
}

pub fn installer_with(root: &Path, options: InstallOptions) -> DependencyInstaller {
    let downloader = Downloader::new(build_http_client(None).unwrap());
    DependencyInstaller::new(downloader, MinecraftStore::new(root), options)
        .with_platform(test_platform())
}

pub fn installer(root: &Path, base: &str) -> DependencyInstaller {
    installer_with(root, test_options(base))
}

/// Version `1.0` registered on a [`FakeRepo`].
pub struct Published {
    pub entry: VersionEntry,
    pub json: Vec<u8>,
    pub jar: Vec<u8>,
    pub asset_hashes: Vec<String>,
}

impl Published {
    /// Put the version JSON into the store at `root` and resolve it.
    pub async fn resolved(&self, root: &Path) -> ResolvedVersion {
        let store = MinecraftStore::new(root);
        let path = store.version_json(&self.entry.id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, &self.json).unwrap();
        resolve(&store, &self.entry.id, &test_platform()).await.unwrap()
    }
}

pub fn publish_version(repo: &FakeRepo, base: &str) -> Published {
    let jar = b"client archive".to_vec();
    repo.put("/jars/1.0.jar", jar.clone());

    let libraries: Vec<_> = ["alpha", "beta"]
        .iter()
        .map(|artifact| {
            let path = format!("org/example/{artifact}/1.0/{artifact}-1.0.jar");
            let body = format!("{artifact} library").into_bytes();
            let library = json!({
                "name": format!("org.example:{artifact}:1.0"),
                "downloads": {
                    "artifact": {
                        "path": path,
                        "url": format!("{base}/maven/{path}"),
                        "sha1": sha1_hex(&body),
                        "size": body.len(),
                    }
                }
            });
            repo.put(&format!("/maven/{path}"), body);
            library
        })
        .collect();

    let mut objects = serde_json::Map::new();
    let mut asset_hashes = Vec::new();
    for i in 0..6 {
        let body = format!("asset body {i}").into_bytes();
        let hash = sha1_hex(&body);
        objects.insert(
            format!("minecraft/textures/item_{i}.png"),
            json!({ "hash": hash, "size": body.len() }),
        );
        repo.put(&format!("/assets/{}/{}", &hash[..2], hash), body);
        asset_hashes.push(hash);
    }
    let index = serde_json::to_vec(&json!({ "objects": objects })).unwrap();
    repo.put("/indexes/idx.json", index.clone());

    let json = serde_json::to_vec_pretty(&json!({
        "id": "1.0",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "releaseTime": "2024-01-01T00:00:00+00:00",
        "time": "2024-01-01T00:00:00+00:00",
        "minimumLauncherVersion": 21,
        "downloads": {
            "client": {
                "url": format!("{base}/jars/1.0.jar"),
                "sha1": sha1_hex(&jar),
                "size": jar.len(),
            }
        },
        "libraries": libraries,
        "assetIndex": {
            "id": "idx",
            "url": format!("{base}/indexes/idx.json"),
            "sha1": sha1_hex(&index),
            "size": index.len(),
            "totalSize": 60,
        },
        "assets": "idx",
    }))
    .unwrap();
    repo.put("/versions/1.0.json", json.clone());

    let entry: VersionEntry = serde_json::from_value(json!({
        "id": "1.0",
        "type": "release",
        "time": "2024-01-01T00:00:00+00:00",
        "releaseTime": "2024-01-01T00:00:00+00:00",
        "url": format!("{base}/versions/1.0.json"),
        "sha1": sha1_hex(&json),
    }))
    .unwrap();

    Published {
        entry,
        json,
        jar,
        asset_hashes,
    }
}
