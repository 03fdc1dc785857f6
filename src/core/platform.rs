// ─── Platform ───
// The OS description every library rule and native classifier is evaluated against.

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Running platform in the vocabulary used by version manifests.
///
/// `name` is one of `windows`, `osx`, `linux`; `arch` is the manifest-style
/// architecture (`x86`, `x86_64`, `arm64`, ...). Constructed once at startup
/// with [`Platform::current`] and passed explicitly to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub version: String,
    pub arch: String,
}

impl Platform {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform this process runs on.
    pub fn current() -> Self {
        let version = System::kernel_version()
            .or_else(System::os_version)
            .unwrap_or_default();

        Self {
            name: current_os_name().to_string(),
            version,
            arch: current_arch().to_string(),
        }
    }

    /// Value substituted for `${arch}` in native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        match self.arch.as_str() {
            "x86" | "arm" | "i386" | "i686" => "32",
            _ => "64",
        }
    }
}

/// Get the Mojang OS name for the current platform.
fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn current_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    }
}
