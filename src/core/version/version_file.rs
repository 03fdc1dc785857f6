// ─── Version File ───
// One version JSON exactly as stored in `versions/<id>/<id>.json`, plus
// per-library platform resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::rules::{rules_allow, LaunchArgument, Rule};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};
use crate::core::platform::Platform;

/// A single, unmerged version JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: BTreeMap<String, DownloadArtifact>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub minimum_launcher_version: Option<u32>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub logging: Option<BTreeMap<String, LoggingConfig>>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    /// Id of the version whose archive this one launches with.
    #[serde(default)]
    pub jar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default)]
    pub component: Option<String>,
    pub major_version: u32,
}

/// Entry of the `downloads` map (`client`, `server`, mappings, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<LaunchArgument>,
    #[serde(default)]
    pub jvm: Vec<LaunchArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub argument: String,
    pub file: LoggingFile,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

// ─── Library Entry ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    /// OS name → classifier, e.g. `"windows": "natives-windows-${arch}"`.
    #[serde(default)]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
    /// Repository base for entries without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
    /// Legacy checksum list; more than one entry marks a pack-compressed artifact.
    #[serde(default)]
    pub checksums: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<BTreeMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: String,
}

/// A library after platform filtering: exactly one file to place under `libraries/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLibrary {
    pub name: String,
    pub download: LibraryArtifact,
    /// Artifact is served pack-compressed (`.pack.xz`) and needs unpacking.
    pub compressed: bool,
    /// Present for native libraries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<NativeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryArtifact {
    /// `/`-separated path relative to `libraries/`.
    pub path: String,
    pub url: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeInfo {
    pub classifier: String,
    /// Path prefixes that must not be unpacked into the natives directory.
    pub extract_exclude: Vec<String>,
}

impl ResolvedLibrary {
    pub fn is_native(&self) -> bool {
        self.natives.is_some()
    }
}

impl LibraryEntry {
    /// Whether this library's rules admit `platform`.
    pub fn is_allowed_on(&self, platform: &Platform) -> bool {
        match &self.rules {
            Some(rules) => rules_allow(rules, platform, &BTreeMap::new()),
            None => true,
        }
    }

    /// Native classifier for `platform`, with `${arch}` substituted.
    pub fn native_classifier(&self, platform: &Platform) -> Option<String> {
        let natives = self.natives.as_ref()?;
        natives
            .get(&platform.name)
            .map(|c| c.replace("${arch}", platform.arch_bits()))
    }

    /// Resolve to the single file this entry contributes on `platform`.
    ///
    /// `Ok(None)` when rules reject the platform or a natives entry has no
    /// classifier for it.
    pub fn resolve(&self, platform: &Platform) -> LauncherResult<Option<ResolvedLibrary>> {
        if !self.is_allowed_on(platform) {
            return Ok(None);
        }

        let checksums = self.checksums.clone().unwrap_or_default();
        let compressed = checksums.len() > 1;

        if self.natives.is_some() {
            let Some(classifier) = self.native_classifier(platform) else {
                return Ok(None);
            };
            let declared = self
                .downloads
                .as_ref()
                .and_then(|d| d.classifiers.as_ref())
                .and_then(|c| c.get(&classifier));
            let coordinate = MavenArtifact::parse(&self.name)?.with_classifier(&classifier);
            let download = self.artifact_from(declared, &coordinate, checksums.first());
            let extract_exclude = self
                .extract
                .as_ref()
                .map(|e| e.exclude.clone())
                .unwrap_or_default();

            return Ok(Some(ResolvedLibrary {
                name: self.name.clone(),
                download,
                compressed,
                natives: Some(NativeInfo {
                    classifier,
                    extract_exclude,
                }),
            }));
        }

        let declared = self.downloads.as_ref().and_then(|d| d.artifact.as_ref());
        let coordinate = MavenArtifact::parse(&self.name)?;
        let download = self.artifact_from(declared, &coordinate, checksums.first());

        Ok(Some(ResolvedLibrary {
            name: self.name.clone(),
            download,
            compressed,
            natives: None,
        }))
    }

    /// Prefer the manifest's declared artifact; fill gaps from the coordinate.
    fn artifact_from(
        &self,
        declared: Option<&LibDownloadArtifact>,
        coordinate: &MavenArtifact,
        fallback_sha1: Option<&String>,
    ) -> LibraryArtifact {
        let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        match declared {
            Some(artifact) => {
                let path = artifact.path.clone().unwrap_or_else(|| coordinate.path());
                let url = if artifact.url.is_empty() {
                    coordinate.url(repo)
                } else {
                    artifact.url.clone()
                };
                LibraryArtifact {
                    path,
                    url,
                    sha1: artifact.sha1.clone().or_else(|| fallback_sha1.cloned()),
                    size: artifact.size,
                }
            }
            None => LibraryArtifact {
                path: coordinate.path(),
                url: coordinate.url(repo),
                sha1: fallback_sha1.cloned(),
                size: None,
            },
        }
    }
}

impl VersionJson {
    /// Parse a version JSON and check that its `id` matches the directory it was read from.
    pub fn parse(raw: &str, expected_id: &str) -> LauncherResult<Self> {
        let version: VersionJson = serde_json::from_str(raw)?;
        if version.id != expected_id {
            return Err(LauncherError::corrupt(expected_id, "id"));
        }
        Ok(version)
    }

    /// Read `versions/<id>/<id>.json` from disk.
    pub async fn read_from(path: &Path, expected_id: &str) -> LauncherResult<Self> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LauncherError::MissingManifest(expected_id.to_string()));
            }
            Err(e) => return Err(LauncherError::io(path, e)),
        };
        Self::parse(&raw, expected_id)
    }
}
