// ─── Installer Settings ───
// Persisted as `installer_settings.json` in the store root.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_ASSETS_HOST: &str = "https://resources.download.minecraft.net";

/// Which artifact kinds are verified against their recorded SHA-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksumSettings {
    pub jar: bool,
    pub libraries: bool,
    pub asset_index: bool,
    /// Off by default: asset sets run into the thousands of files.
    pub assets: bool,
}

impl Default for ChecksumSettings {
    fn default() -> Self {
        Self {
            jar: true,
            libraries: true,
            asset_index: true,
            assets: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub checksum: ChecksumSettings,
    pub assets_host: String,
    /// Base URL replacing the default library repository, if set.
    pub library_mirror: Option<String>,
    /// Asset downloads per wave; `None` uses the available parallelism.
    pub asset_batch_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            checksum: ChecksumSettings::default(),
            assets_host: DEFAULT_ASSETS_HOST.to_string(),
            library_mirror: None,
            asset_batch_size: None,
            request_timeout_secs: None,
        }
    }
}

impl InstallerConfig {
    /// Load settings from `path`, falling back to defaults when absent or unreadable.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Invalid installer settings at {:?}, using defaults: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }
}
