pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::installer::{DependencyInstaller, InstallOptions, InstallReport};
pub use crate::core::platform::Platform;
pub use crate::core::store::MinecraftStore;
pub use crate::core::task::TaskContext;

/// Install the global `tracing` subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,interface_installer=debug")),
        )
        .try_init();
}
