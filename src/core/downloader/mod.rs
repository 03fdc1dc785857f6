pub mod checksum;
mod client;

pub use checksum::{digest, validate, HashAlgorithm};
pub use client::{
    DownloadEntry, DownloadState, DownloadTask, Downloader, EnsureOutcome, ProgressFn,
};
