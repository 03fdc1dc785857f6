// ─── Version Resolver ───
// Walks the `inheritsFrom` chain in the local store and folds it root → leaf
// into one effective version.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rules::{default_jvm_arguments, flatten_arguments, LaunchArgument};
use super::version_file::{
    AssetIndexInfo, DownloadArtifact, JavaVersionInfo, LoggingConfig, ResolvedLibrary,
    VersionJson,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;
use crate::core::store::MinecraftStore;

/// Fully merged, platform-filtered version ready for installation or launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVersion {
    pub id: String,
    /// Chain ids from the requested version up to the root.
    pub inheritances: Vec<String>,
    /// Id of the root manifest.
    pub minecraft_version: String,
    pub main_class: String,
    /// Plain libraries first, natives appended. Names are unique within each
    /// kind; a coordinate may appear once as plain and once as native.
    pub libraries: Vec<ResolvedLibrary>,
    pub downloads: BTreeMap<String, DownloadArtifact>,
    pub asset_index: Option<AssetIndexInfo>,
    pub assets: String,
    pub arguments: ResolvedArguments,
    pub minimum_launcher_version: u32,
    pub release_time: String,
    pub time: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub logging: BTreeMap<String, LoggingConfig>,
    pub java_version: Option<JavaVersionInfo>,
    /// Version id whose `versions/<jar>/<jar>.jar` holds the main archive.
    pub jar: String,
}

/// Game arguments keep their feature rules for the launcher; JVM arguments are flat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArguments {
    pub game: Vec<LaunchArgument>,
    pub jvm: Vec<String>,
}

/// Name-keyed library list where a later insert replaces an earlier one in place.
#[derive(Default)]
struct LibrarySet {
    items: Vec<ResolvedLibrary>,
    index: HashMap<String, usize>,
}

impl LibrarySet {
    fn insert(&mut self, library: ResolvedLibrary) {
        match self.index.get(&library.name) {
            Some(&slot) => self.items[slot] = library,
            None => {
                self.index.insert(library.name.clone(), self.items.len());
                self.items.push(library);
            }
        }
    }
}

/// Read the manifest chain for `version_id`, leaf first.
pub async fn read_chain(
    store: &MinecraftStore,
    version_id: &str,
) -> LauncherResult<Vec<VersionJson>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(version_id.to_string());

    while let Some(id) = next.take() {
        if !seen.insert(id.clone()) {
            return Err(LauncherError::CircularInheritance(id));
        }
        let json = VersionJson::read_from(&store.version_json(&id), &id).await?;
        next = json.inherits_from.clone();
        chain.push(json);
    }

    Ok(chain)
}

/// Resolve `version_id` from `store` against `platform`.
pub async fn resolve(
    store: &MinecraftStore,
    version_id: &str,
    platform: &Platform,
) -> LauncherResult<ResolvedVersion> {
    let chain = read_chain(store, version_id).await?;
    let resolved = merge_chain(chain, platform)?;
    info!(
        "Resolved version {} ({} libraries, chain {:?})",
        resolved.id,
        resolved.libraries.len(),
        resolved.inheritances
    );
    Ok(resolved)
}

/// Fold a leaf-first manifest stack into one version.
///
/// The stack is popped root → leaf; scalar fields are overwritten by each more-leaf
/// manifest that declares them, `downloads` merge per key, and libraries are keyed
/// by exact coordinate string.
pub fn merge_chain(
    mut stack: Vec<VersionJson>,
    platform: &Platform,
) -> LauncherResult<ResolvedVersion> {
    let leaf_id = stack
        .first()
        .map(|v| v.id.clone())
        .ok_or_else(|| LauncherError::Other("Cannot resolve an empty manifest chain".into()))?;
    let inheritances: Vec<String> = stack.iter().map(|v| v.id.clone()).collect();
    let minecraft_version = inheritances.last().cloned().unwrap_or_default();

    let mut main_class = None;
    let mut assets = None;
    let mut asset_index = None;
    let mut version_type = None;
    let mut release_time = None;
    let mut time = None;
    let mut logging = BTreeMap::new();
    let mut java_version = None;
    let mut jar = None;
    let mut minimum_launcher_version = 0;
    let mut downloads = BTreeMap::new();
    let mut libraries = LibrarySet::default();
    let mut natives = LibrarySet::default();
    let mut game_args = Vec::new();
    let mut jvm_args = Vec::new();
    let mut has_structured_arguments = false;
    let mut legacy_game_args = None;

    while let Some(json) = stack.pop() {
        debug!("Merging manifest {}", json.id);

        main_class = json.main_class.or(main_class);
        assets = json.assets.or(assets);
        asset_index = json.asset_index.or(asset_index);
        version_type = json.version_type.or(version_type);
        release_time = json.release_time.or(release_time);
        time = json.time.or(time);
        java_version = json.java_version.or(java_version);
        jar = json.jar.or(jar);
        legacy_game_args = json.minecraft_arguments.or(legacy_game_args);
        if let Some(config) = json.logging {
            logging = config;
        }
        if let Some(min) = json.minimum_launcher_version {
            minimum_launcher_version = minimum_launcher_version.max(min);
        }

        downloads.extend(json.downloads);

        for entry in &json.libraries {
            match entry.resolve(platform)? {
                Some(lib) if lib.is_native() => natives.insert(lib),
                Some(lib) => libraries.insert(lib),
                None => debug!("Skipping library (platform rules): {}", entry.name),
            }
        }

        if let Some(arguments) = json.arguments {
            has_structured_arguments = true;
            game_args.extend(arguments.game);
            jvm_args.extend(arguments.jvm);
        }
    }

    let main_class = main_class.ok_or_else(|| LauncherError::corrupt(&leaf_id, "mainClass"))?;

    if !has_structured_arguments {
        jvm_args = default_jvm_arguments();
        game_args = legacy_game_args
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|token| LaunchArgument::Literal(token.to_string()))
            .collect();
    }

    let assets = assets
        .or_else(|| asset_index.as_ref().map(|index: &AssetIndexInfo| index.id.clone()))
        .unwrap_or_else(|| "legacy".to_string());

    let mut merged_libraries = libraries.items;
    merged_libraries.extend(natives.items);

    Ok(ResolvedVersion {
        id: leaf_id,
        jar: jar.unwrap_or_else(|| minecraft_version.clone()),
        inheritances,
        minecraft_version,
        main_class,
        libraries: merged_libraries,
        downloads,
        asset_index,
        assets,
        arguments: ResolvedArguments {
            game: game_args,
            jvm: flatten_arguments(&jvm_args, platform),
        },
        minimum_launcher_version,
        release_time: release_time.unwrap_or_default(),
        time: time.unwrap_or_default(),
        version_type: version_type.unwrap_or_default(),
        logging,
        java_version,
    })
}

impl ResolvedVersion {
    /// Asset index descriptor, required before any asset can be installed.
    pub fn require_asset_index(&self) -> LauncherResult<&AssetIndexInfo> {
        self.asset_index
            .as_ref()
            .ok_or_else(|| LauncherError::corrupt(&self.id, "assetIndex"))
    }
}
