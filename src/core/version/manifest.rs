// ─── Version Manifest ───
// Fetches the remote version catalog, re-validating a cached copy with
// `If-Modified-Since` and short-circuiting on `304 Not Modified`.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level version catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub time: DateTime<FixedOffset>,
    pub release_time: DateTime<FixedOffset>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

/// A catalog plus the `Last-Modified` value it was served with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedManifest {
    #[serde(flatten)]
    pub manifest: VersionManifest,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl VersionManifest {
    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// List all official stable versions (release only).
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}

impl CachedManifest {
    /// Load a previously saved catalog; `None` if absent or unreadable.
    pub async fn load(path: &Path) -> Option<Self> {
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                debug!("Ignoring unreadable catalog cache {:?}: {}", path, e);
                None
            }
        }
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }
}

/// Catalog client bound to one endpoint.
pub struct ManifestFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
}

impl ManifestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: VERSION_MANIFEST_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fetch the catalog.
    ///
    /// With a cached copy that recorded `Last-Modified`, the request is conditional;
    /// a `304` answer hands the cached copy back untouched.
    pub async fn fetch(&self, cached: Option<CachedManifest>) -> LauncherResult<CachedManifest> {
        info!("Fetching Minecraft version manifest...");

        let mut request = self.client.get(&self.url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if let Some(since) = cached.as_ref().and_then(|c| c.last_modified.as_deref()) {
            request = request.header(IF_MODIFIED_SINCE, since);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(cached) = cached {
                debug!("Version manifest not modified; using cached copy");
                return Ok(cached);
            }
        }

        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let manifest: VersionManifest = response.json().await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(CachedManifest {
            manifest,
            last_modified,
        })
    }
}
