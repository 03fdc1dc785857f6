mod artifact;

pub use artifact::MavenArtifact;

/// Default repository for libraries whose manifest entry carries no explicit URL.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
