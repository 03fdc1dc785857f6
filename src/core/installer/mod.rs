// ─── Dependency Installer ───
// Places everything a resolved version needs into the store:
//   1. version JSON  (propagates errors)
//   2. main archive  (propagates errors)
//   3. libraries     (per-item isolation, unbatched)
//   4. asset index   (propagates errors) + objects (per-item isolation, waves)

mod assets;
mod diagnose;
mod libraries;
mod options;

#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::core::config::InstallerConfig;
use crate::core::downloader::{
    self, DownloadEntry, DownloadTask, Downloader, EnsureOutcome, ProgressFn,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::platform::Platform;
use crate::core::store::MinecraftStore;
use crate::core::task::TaskContext;
use crate::core::version::{resolve, ResolvedVersion, VersionEntry, VersionJson};

pub use assets::{AssetIndex, AssetObject};
pub use diagnose::InstallIssues;
pub use options::{default_batch_size, InstallOptions, LibraryHost, PackDecompressor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Library,
    Asset,
}

/// A batched item that could not be installed.
#[derive(Debug)]
pub struct ItemFailure {
    pub kind: ItemKind,
    pub name: String,
    pub error: LauncherError,
}

/// Outcome of the isolated (per-item) phases of an installation.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub failures: Vec<ItemFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: InstallReport) {
        self.failures.extend(other.failures);
    }

    fn record(&mut self, kind: ItemKind, name: &str, error: LauncherError) {
        self.failures.push(ItemFailure {
            kind,
            name: name.to_string(),
            error,
        });
    }
}

pub struct DependencyInstaller {
    downloader: Downloader,
    store: MinecraftStore,
    options: InstallOptions,
    platform: Platform,
}

impl DependencyInstaller {
    pub fn new(downloader: Downloader, store: MinecraftStore, options: InstallOptions) -> Self {
        Self {
            downloader,
            store,
            options,
            platform: Platform::current(),
        }
    }

    /// Build an installer from the settings file stored in `store`.
    pub fn from_store(store: MinecraftStore) -> LauncherResult<Self> {
        let config = InstallerConfig::load(&store.settings_path());
        let client = build_http_client(config.request_timeout_secs.map(Duration::from_secs))?;
        Ok(Self::new(
            Downloader::new(client),
            store,
            InstallOptions::from_config(&config),
        ))
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn store(&self) -> &MinecraftStore {
        &self.store
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Fetch, resolve and install `entry` with everything it depends on.
    pub async fn install(
        &self,
        entry: &VersionEntry,
        ctx: &TaskContext,
    ) -> LauncherResult<(ResolvedVersion, InstallReport)> {
        ctx.execute("install", |install_ctx| async move {
            self.install_version(entry, &install_ctx).await?;
            let version = resolve(&self.store, &entry.id, &self.platform).await?;
            self.install_dependencies(version, &install_ctx).await
        })
        .await
    }

    /// Place `versions/<id>/<id>.json`, checked against the catalog SHA-1 when known.
    pub async fn install_version(
        &self,
        entry: &VersionEntry,
        ctx: &TaskContext,
    ) -> LauncherResult<VersionJson> {
        let dest = self.store.version_json(&entry.id);
        let download = DownloadEntry {
            url: entry.url.clone(),
            dest: dest.clone(),
            sha1: entry.sha1.clone(),
            size: None,
        };

        ctx.execute("json", |json_ctx| async move {
            self.ensure_reporting(download, true, &json_ctx).await
        })
        .await?;

        VersionJson::read_from(&dest, &entry.id).await
    }

    /// Main archive, then libraries and assets side by side.
    ///
    /// Library and asset failures do not fail the call; they are listed in
    /// the returned report.
    pub async fn install_dependencies(
        &self,
        version: ResolvedVersion,
        ctx: &TaskContext,
    ) -> LauncherResult<(ResolvedVersion, InstallReport)> {
        info!("Installing dependencies of {}", version.id);

        self.install_jar(&version, "client", ctx).await?;

        let (libraries, assets) = tokio::join!(
            self.install_libraries(&version.libraries, ctx),
            self.install_assets(&version, ctx),
        );
        let mut report = libraries?;
        report.merge(assets?);

        if report.is_complete() {
            info!("{} installed", version.id);
        } else {
            warn!(
                "{} installed with {} failed item(s)",
                version.id,
                report.failures.len()
            );
        }
        Ok((version, report))
    }

    /// `versions/<jar>/<jar>[-<kind>].jar` from `downloads.<kind>`.
    pub async fn install_jar(
        &self,
        version: &ResolvedVersion,
        kind: &str,
        ctx: &TaskContext,
    ) -> LauncherResult<PathBuf> {
        let artifact = version
            .downloads
            .get(kind)
            .ok_or_else(|| LauncherError::corrupt(&version.id, format!("downloads.{}", kind)))?;
        let dest = self.store.version_jar(&version.jar, kind);
        let download = DownloadEntry {
            url: artifact.url.clone(),
            dest: dest.clone(),
            sha1: artifact.sha1.clone(),
            size: artifact.size,
        };
        let verify = self.options.checksum.jar;

        ctx.execute("jar", |jar_ctx| async move {
            self.ensure_reporting(download, verify, &jar_ctx).await
        })
        .await?;

        Ok(dest)
    }

    /// Run the per-artifact policy for `entry`, forwarding byte progress to `ctx`.
    async fn ensure_reporting(
        &self,
        entry: DownloadEntry,
        verify: bool,
        ctx: &TaskContext,
    ) -> LauncherResult<EnsureOutcome> {
        let label = entry.url.clone();
        let report = |done: u64, total: Option<u64>| {
            ctx.update(done, total, label.as_str());
        };
        let report: ProgressFn<'_> = &report;
        DownloadTask::new(entry)
            .ensure(&self.downloader, verify, Some(report))
            .await
    }
}

/// Present, and matching `sha1` when one is known and `verify` is on.
async fn artifact_ok(path: &Path, sha1: Option<&str>, verify: bool) -> LauncherResult<bool> {
    match sha1.filter(|s| !s.is_empty()) {
        Some(expected) if verify => downloader::validate(path, expected).await,
        _ => tokio::fs::try_exists(path)
            .await
            .map_err(|e| LauncherError::io(path, e)),
    }
}
