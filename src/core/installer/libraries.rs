use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{artifact_ok, DependencyInstaller, InstallReport, ItemKind};
use crate::core::downloader::{digest, DownloadEntry, EnsureOutcome, HashAlgorithm, ProgressFn};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::task::TaskContext;
use crate::core::version::ResolvedLibrary;

/// Suffix of the pack-compressed variant of a library URL.
const PACKED_SUFFIX: &str = ".pack.xz";

impl DependencyInstaller {
    /// Install every library concurrently. A failing library is logged and
    /// recorded; the others carry on.
    pub async fn install_libraries(
        &self,
        libraries: &[ResolvedLibrary],
        ctx: &TaskContext,
    ) -> LauncherResult<InstallReport> {
        ctx.execute("libraries", |libs_ctx| async move {
            let total = libraries.len() as u64;
            let settled = AtomicU64::new(0);

            let results = join_all(libraries.iter().map(|library| {
                let libs_ctx = &libs_ctx;
                let settled = &settled;
                async move {
                    let result = libs_ctx
                        .execute(&library.name, |lib_ctx| async move {
                            self.install_library(library, &lib_ctx).await
                        })
                        .await;
                    let done = settled.fetch_add(1, Ordering::SeqCst) + 1;
                    libs_ctx.update(done, Some(total), library.name.as_str());
                    (library, result)
                }
            }))
            .await;

            let mut report = InstallReport::default();
            for (library, result) in results {
                match result {
                    Ok(outcome) => debug!("Library {}: {:?}", library.name, outcome),
                    Err(e) => {
                        warn!("Failed to install library {}: {}", library.name, e);
                        report.record(ItemKind::Library, &library.name, e);
                    }
                }
            }

            info!(
                "Libraries: {} of {} in place",
                libraries.len() - report.failures.len(),
                libraries.len()
            );
            Ok::<_, LauncherError>(report)
        })
        .await
    }

    async fn install_library(
        &self,
        library: &ResolvedLibrary,
        ctx: &TaskContext,
    ) -> LauncherResult<EnsureOutcome> {
        let dest = self.store.library_path(&library.download.path);
        let url = self.options.library_url(library);
        let verify = self.options.checksum.libraries;

        if library.compressed {
            return self
                .install_packed_library(library, &url, &dest, verify, ctx)
                .await;
        }

        if url.is_empty() {
            // Nothing to fetch from; only a file already in place satisfies it.
            return if artifact_ok(&dest, None, false).await? {
                Ok(EnsureOutcome::Present)
            } else {
                Err(LauncherError::Other(format!(
                    "Library {} has no download URL",
                    library.name
                )))
            };
        }

        let entry = DownloadEntry {
            url,
            dest,
            sha1: library.download.sha1.clone(),
            size: library.download.size,
        };
        self.ensure_reporting(entry, verify, ctx).await
    }

    /// Fetch `<url>.pack.xz` and hand it to the configured decompressor.
    async fn install_packed_library(
        &self,
        library: &ResolvedLibrary,
        url: &str,
        dest: &Path,
        verify: bool,
        ctx: &TaskContext,
    ) -> LauncherResult<EnsureOutcome> {
        let sha1 = library.download.sha1.as_deref();
        if artifact_ok(dest, sha1, verify).await? {
            return Ok(EnsureOutcome::Present);
        }

        let decompressor = self
            .options
            .decompressor
            .as_ref()
            .ok_or_else(|| LauncherError::DecompressionUnsupported(library.name.clone()))?;

        let packed_url = format!("{}{}", url, PACKED_SUFFIX);
        let report = |done: u64, total: Option<u64>| {
            ctx.update(done, total, packed_url.as_str());
        };
        let report: ProgressFn<'_> = &report;
        let packed = self
            .downloader
            .fetch_to_memory(&packed_url, Some(report))
            .await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        decompressor.unpack(packed, dest).await?;

        if let Some(expected) = sha1.filter(|s| verify && !s.is_empty()) {
            let actual = digest(dest, HashAlgorithm::Sha1).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                if let Err(e) = tokio::fs::remove_file(dest).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove mismatched library {:?}: {}", dest, e);
                    }
                }
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(EnsureOutcome::Downloaded)
    }
}
