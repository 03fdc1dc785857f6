pub mod manifest;
pub mod resolver;
pub mod rules;
pub mod version_file;

pub use manifest::{CachedManifest, ManifestFetcher, VersionEntry, VersionManifest};
pub use resolver::{resolve, ResolvedArguments, ResolvedVersion};
pub use rules::{LaunchArgument, Rule, RuleAction};
pub use version_file::{
    AssetIndexInfo, DownloadArtifact, LibraryArtifact, LibraryEntry, NativeInfo,
    ResolvedLibrary, VersionJson,
};
