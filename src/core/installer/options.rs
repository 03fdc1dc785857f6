use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::{ChecksumSettings, InstallerConfig, DEFAULT_ASSETS_HOST};
use crate::core::error::LauncherResult;
use crate::core::maven::MOJANG_LIBRARIES;
use crate::core::version::ResolvedLibrary;

/// Unpacks a `.pack.xz` library body into its final jar.
#[async_trait]
pub trait PackDecompressor: Send + Sync {
    async fn unpack(&self, packed: Vec<u8>, dest: &Path) -> LauncherResult<()>;
}

/// Per-library URL override; `None` keeps the manifest URL.
pub type LibraryHost = Arc<dyn Fn(&ResolvedLibrary) -> Option<String> + Send + Sync>;

/// Runtime knobs for [`DependencyInstaller`](super::DependencyInstaller).
#[derive(Clone)]
pub struct InstallOptions {
    pub checksum: ChecksumSettings,
    pub library_host: Option<LibraryHost>,
    pub assets_host: String,
    pub asset_batch_size: usize,
    pub decompressor: Option<Arc<dyn PackDecompressor>>,
}

impl fmt::Debug for InstallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallOptions")
            .field("checksum", &self.checksum)
            .field("library_host", &self.library_host.is_some())
            .field("assets_host", &self.assets_host)
            .field("asset_batch_size", &self.asset_batch_size)
            .field("decompressor", &self.decompressor.is_some())
            .finish()
    }
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            checksum: ChecksumSettings::default(),
            library_host: None,
            assets_host: DEFAULT_ASSETS_HOST.to_string(),
            asset_batch_size: default_batch_size(),
            decompressor: None,
        }
    }
}

/// Available parallelism, never below one.
pub fn default_batch_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1)
}

impl InstallOptions {
    pub fn from_config(config: &InstallerConfig) -> Self {
        let library_host = config.library_mirror.clone().map(|mirror| {
            let mirror = mirror.trim_end_matches('/').to_string();
            let host: LibraryHost = Arc::new(move |library: &ResolvedLibrary| {
                library
                    .download
                    .url
                    .strip_prefix(MOJANG_LIBRARIES)
                    .map(|rest| format!("{}{}", mirror, rest))
            });
            host
        });

        Self {
            checksum: config.checksum,
            library_host,
            assets_host: config.assets_host.clone(),
            asset_batch_size: config
                .asset_batch_size
                .unwrap_or_else(default_batch_size)
                .max(1),
            decompressor: None,
        }
    }

    pub fn with_library_host<F>(mut self, host: F) -> Self
    where
        F: Fn(&ResolvedLibrary) -> Option<String> + Send + Sync + 'static,
    {
        self.library_host = Some(Arc::new(host));
        self
    }

    pub fn with_decompressor(mut self, decompressor: Arc<dyn PackDecompressor>) -> Self {
        self.decompressor = Some(decompressor);
        self
    }

    /// URL to fetch `library` from, after the host override.
    pub fn library_url(&self, library: &ResolvedLibrary) -> String {
        self.library_host
            .as_ref()
            .and_then(|host| host(library))
            .unwrap_or_else(|| library.download.url.clone())
    }

    /// `<assets_host>/<hh>/<hash>`.
    pub fn asset_url(&self, hash: &str) -> String {
        let prefix = hash.get(..2).unwrap_or(hash);
        format!(
            "{}/{}/{}",
            self.assets_host.trim_end_matches('/'),
            prefix,
            hash
        )
    }
}
