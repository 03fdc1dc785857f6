// Read-only inspection of an installed version, and the targeted repair that
// consumes its findings.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, info};

use super::assets::AssetIndex;
use super::{artifact_ok, DependencyInstaller, InstallReport};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::task::TaskContext;
use crate::core::version::{ResolvedLibrary, ResolvedVersion};

/// Files of a version that are absent or fail verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallIssues {
    pub missing_jar: bool,
    pub missing_asset_index: bool,
    pub libraries: Vec<ResolvedLibrary>,
    /// Logical asset name → expected hash.
    pub assets: BTreeMap<String, String>,
}

impl InstallIssues {
    pub fn is_empty(&self) -> bool {
        !self.missing_jar
            && !self.missing_asset_index
            && self.libraries.is_empty()
            && self.assets.is_empty()
    }
}

impl DependencyInstaller {
    /// Check every file `version` needs without network access or writes.
    ///
    /// Asset objects can only be listed once the index itself is sound; with a
    /// missing index, `assets` stays empty and `fix` installs them all.
    pub async fn diagnose(&self, version: &ResolvedVersion) -> LauncherResult<InstallIssues> {
        let checksum = self.options.checksum;
        let mut issues = InstallIssues::default();

        let jar_sha1 = version
            .downloads
            .get("client")
            .and_then(|artifact| artifact.sha1.as_deref());
        let jar = self.store.version_jar(&version.jar, "client");
        issues.missing_jar = !artifact_ok(&jar, jar_sha1, checksum.jar).await?;

        let library_checks = join_all(version.libraries.iter().map(|library| async move {
            let path = self.store.library_path(&library.download.path);
            let sha1 = library.download.sha1.as_deref();
            (library, artifact_ok(&path, sha1, checksum.libraries).await)
        }))
        .await;
        for (library, ok) in library_checks {
            if !ok? {
                issues.libraries.push(library.clone());
            }
        }

        if let Some(info) = &version.asset_index {
            let index_path = self.store.asset_index(&version.assets);
            let index_ok =
                artifact_ok(&index_path, info.sha1.as_deref(), checksum.asset_index).await?;
            // A present index that does not parse needs replacing as well.
            let index = if index_ok {
                AssetIndex::read_from(&index_path).await.ok()
            } else {
                None
            };

            match index {
                Some(index) => {
                    for (name, object) in index.objects {
                        let path = self.store.asset_object(&object.hash);
                        if !artifact_ok(&path, Some(&object.hash), checksum.assets).await? {
                            issues.assets.insert(name, object.hash);
                        }
                    }
                }
                None => issues.missing_asset_index = true,
            }
        }

        debug!(
            "Diagnosed {}: jar missing {}, {} libraries, index missing {}, {} assets",
            version.id,
            issues.missing_jar,
            issues.libraries.len(),
            issues.missing_asset_index,
            issues.assets.len()
        );
        Ok(issues)
    }

    /// Apply the per-artifact policy to exactly what `issues` lists.
    pub async fn fix(
        &self,
        version: &ResolvedVersion,
        issues: &InstallIssues,
        ctx: &TaskContext,
    ) -> LauncherResult<InstallReport> {
        if issues.is_empty() {
            return Ok(InstallReport::default());
        }
        info!("Repairing {}", version.id);

        ctx.execute("fix", |fix_ctx| async move {
            if issues.missing_jar {
                self.install_jar(version, "client", &fix_ctx).await?;
            }

            let mut report = self.install_libraries(&issues.libraries, &fix_ctx).await?;

            if issues.missing_asset_index {
                // An unreadable index without a checksum would otherwise be kept.
                let index_path = self.store.asset_index(&version.assets);
                if let Err(e) = tokio::fs::remove_file(&index_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(LauncherError::io(&index_path, e));
                    }
                }
                report.merge(self.install_assets(version, &fix_ctx).await?);
            } else if !issues.assets.is_empty() {
                let objects = issues
                    .assets
                    .iter()
                    .map(|(name, hash)| (name.clone(), hash.clone()))
                    .collect();
                report.merge(self.install_asset_objects(objects, &fix_ctx).await);
            }

            Ok::<_, LauncherError>(report)
        })
        .await
    }
}
