// ─── Local Store ───
// Fixed on-disk layout shared with the launch side:
//   versions/<id>/<id>.json
//   versions/<id>/<id>[-<type>].jar
//   libraries/<group-path>/<artifact>/<version>/<file>.jar
//   assets/indexes/<name>.json
//   assets/objects/<hh>/<hash>

use std::path::{Path, PathBuf};

/// Root of an installation store (the `.minecraft` equivalent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinecraftStore {
    root: PathBuf,
}

impl MinecraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform default store under the user's data directory.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(".minecraft"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_root(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_root(id).join(format!("{}.json", id))
    }

    /// `versions/<id>/<id>.jar` for the client, `<id>-<kind>.jar` otherwise.
    pub fn version_jar(&self, id: &str, kind: &str) -> PathBuf {
        let file_name = if kind == "client" {
            format!("{}.jar", id)
        } else {
            format!("{}-{}.jar", id, kind)
        };
        self.version_root(id).join(file_name)
    }

    /// Cached copy of the remote version catalog.
    pub fn catalog_cache(&self) -> PathBuf {
        self.versions_dir().join("version_manifest.json")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Resolve a library's relative artifact path under `libraries/`.
    pub fn library_path(&self, relative: &str) -> PathBuf {
        self.libraries_dir().join(relative)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index(&self, name: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{}.json", name))
    }

    /// Content-addressed object path: `assets/objects/<hash[0..2]>/<hash>`.
    pub fn asset_object(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.assets_dir().join("objects").join(prefix).join(hash)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("installer_settings.json")
    }
}
