//! Streaming file digests used to verify installed artifacts.

use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tokio::io::AsyncReadExt;

use crate::core::error::{LauncherError, LauncherResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Md5,
}

/// Lowercase hex digest of the file at `path`, read in fixed-size chunks.
pub async fn digest(path: &Path, algorithm: HashAlgorithm) -> LauncherResult<String> {
    match algorithm {
        HashAlgorithm::Sha1 => digest_with::<Sha1>(path).await,
        HashAlgorithm::Sha256 => digest_with::<Sha256>(path).await,
        HashAlgorithm::Md5 => digest_with::<Md5>(path).await,
    }
}

async fn digest_with<D: Digest>(path: &Path) -> LauncherResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;

    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-1 check of an existing file. A missing file is `Ok(false)`.
pub async fn validate(path: &Path, expected: &str) -> LauncherResult<bool> {
    validate_with(path, expected, HashAlgorithm::Sha1).await
}

pub async fn validate_with(
    path: &Path,
    expected: &str,
    algorithm: HashAlgorithm,
) -> LauncherResult<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(LauncherError::io(path, e)),
    }
    let actual = digest(path, algorithm).await?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
