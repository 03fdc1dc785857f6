use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{DependencyInstaller, InstallReport, ItemKind};
use crate::core::downloader::{DownloadEntry, EnsureOutcome};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::task::TaskContext;
use crate::core::version::ResolvedVersion;

/// `assets/indexes/<name>.json`: logical file name → content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub async fn read_from(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl DependencyInstaller {
    /// Asset index, then every object it lists in bounded waves.
    ///
    /// Index errors propagate; object failures are collected in the report.
    pub async fn install_assets(
        &self,
        version: &ResolvedVersion,
        ctx: &TaskContext,
    ) -> LauncherResult<InstallReport> {
        ctx.execute("assets", |assets_ctx| async move {
            let index = self.install_asset_index(version, &assets_ctx).await?;
            let objects = index
                .objects
                .into_iter()
                .map(|(name, object)| (name, object.hash))
                .collect();
            Ok::<_, LauncherError>(self.install_asset_objects(objects, &assets_ctx).await)
        })
        .await
    }

    /// `assets/indexes/<assets>.json`, fetched only when missing or corrupt.
    pub async fn install_asset_index(
        &self,
        version: &ResolvedVersion,
        ctx: &TaskContext,
    ) -> LauncherResult<AssetIndex> {
        let info = version.require_asset_index()?;
        let dest = self.store.asset_index(&version.assets);
        let entry = DownloadEntry {
            url: info.url.clone(),
            dest: dest.clone(),
            sha1: info.sha1.clone(),
            size: info.size,
        };
        let verify = self.options.checksum.asset_index;

        ctx.execute("index", |index_ctx| async move {
            self.ensure_reporting(entry, verify, &index_ctx).await
        })
        .await?;

        AssetIndex::read_from(&dest).await
    }

    /// Install `(name, hash)` pairs in waves of `asset_batch_size`.
    pub(super) async fn install_asset_objects(
        &self,
        objects: Vec<(String, String)>,
        ctx: &TaskContext,
    ) -> InstallReport {
        let verify = self.options.checksum.assets;
        let units: Vec<_> = objects
            .iter()
            .map(|(name, hash)| {
                let hash = hash.clone();
                let unit = move |object_ctx: TaskContext| async move {
                    self.install_asset_object(hash, verify, &object_ctx).await
                };
                (name.clone(), unit)
            })
            .collect();

        let results = ctx.execute_all(units, self.options.asset_batch_size).await;

        let mut report = InstallReport::default();
        for ((name, _), result) in objects.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to install asset {}: {}", name, e);
                report.record(ItemKind::Asset, name, e);
            }
        }

        info!(
            "Assets: {} of {} in place",
            objects.len() - report.failures.len(),
            objects.len()
        );
        report
    }

    async fn install_asset_object(
        &self,
        hash: String,
        verify: bool,
        ctx: &TaskContext,
    ) -> LauncherResult<EnsureOutcome> {
        if hash.len() < 2 {
            return Err(LauncherError::Other(format!("Invalid asset hash `{}`", hash)));
        }
        let entry = DownloadEntry {
            url: self.options.asset_url(&hash),
            dest: self.store.asset_object(&hash),
            sha1: Some(hash),
            size: None,
        };
        self.ensure_reporting(entry, verify, ctx).await
    }
}
