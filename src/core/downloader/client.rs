use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::checksum;
use crate::core::error::{LauncherError, LauncherResult};

/// Byte-level progress sink: `(transferred, total)`; `total` is `None` when unknown.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Streaming HTTP fetcher. Never retries on its own.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Stream `url` into `dest`, creating parent directories as needed.
    ///
    /// Returns the number of bytes written. On any failure the partially
    /// written file is removed before the error is returned.
    pub async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let result = async {
            // Scoped so the handle is closed before any cleanup runs.
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            let written = self.stream_into(url, &mut file, dest, progress).await?;
            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
            Ok::<u64, LauncherError>(written)
        }
        .await;

        match result {
            Ok(written) => {
                debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
                Ok(written)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial download {:?}: {}", dest, remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// Fetch `url` into memory.
    pub async fn fetch_to_memory(
        &self,
        url: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.stream_into(url, &mut buffer, Path::new(url), progress)
            .await?;
        Ok(buffer)
    }

    async fn stream_into<W>(
        &self,
        url: &str,
        writer: &mut W,
        dest: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut transferred = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            transferred += chunk.len() as u64;
            if let Some(report) = progress {
                report(transferred, total);
            }
        }

        Ok(transferred)
    }
}

// ─── Per-artifact policy ───

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    InFlight,
    /// Present file failed verification; one more fetch is allowed.
    Retrying,
    Succeeded,
    Failed,
}

/// How an artifact ended up satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Already on disk (and verified when a checksum applied). No request made.
    Present,
    Downloaded,
    /// Present but corrupt; fetched again and verified.
    Repaired,
}

/// One retryable unit: a URL, its destination and the checks it must pass.
#[derive(Debug)]
pub struct DownloadTask {
    entry: DownloadEntry,
    state: DownloadState,
}

impl DownloadTask {
    pub fn new(entry: DownloadEntry) -> Self {
        Self {
            entry,
            state: DownloadState::Pending,
        }
    }

    pub fn entry(&self) -> &DownloadEntry {
        &self.entry
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    /// Make sure the destination exists and, with `verify`, matches its SHA-1.
    ///
    /// - absent → fetch once, then verify;
    /// - present, verified OK or no checksum known → nothing to do;
    /// - present but mismatching → fetch once more, verify again; a second
    ///   mismatch is `Sha1Mismatch`.
    ///
    /// Transport errors fail the task immediately.
    pub async fn ensure(
        &mut self,
        downloader: &Downloader,
        verify: bool,
        progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<EnsureOutcome> {
        let expected = if verify {
            self.entry.sha1.clone().filter(|s| !s.is_empty())
        } else {
            None
        };

        let present = tokio::fs::try_exists(&self.entry.dest)
            .await
            .map_err(|e| LauncherError::io(&self.entry.dest, e))?;

        let outcome = if present {
            let Some(expected) = expected.as_deref() else {
                self.state = DownloadState::Succeeded;
                return Ok(EnsureOutcome::Present);
            };
            if checksum::validate(&self.entry.dest, expected).await? {
                self.state = DownloadState::Succeeded;
                return Ok(EnsureOutcome::Present);
            }
            debug!(
                "Checksum mismatch for {:?}, fetching again",
                self.entry.dest
            );
            self.state = DownloadState::Retrying;
            EnsureOutcome::Repaired
        } else {
            EnsureOutcome::Downloaded
        };

        self.state = DownloadState::InFlight;
        if let Err(e) = downloader
            .fetch_to_file(&self.entry.url, &self.entry.dest, progress)
            .await
        {
            self.state = DownloadState::Failed;
            return Err(e);
        }

        if let Some(expected) = expected.as_deref() {
            if let Err(e) = self.check(expected).await {
                self.state = DownloadState::Failed;
                return Err(e);
            }
        }

        self.state = DownloadState::Succeeded;
        Ok(outcome)
    }

    async fn check(&self, expected: &str) -> LauncherResult<()> {
        let actual = checksum::digest(&self.entry.dest, checksum::HashAlgorithm::Sha1).await?;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(LauncherError::Sha1Mismatch {
                path: self.entry.dest.clone(),
                expected: expected.to_string(),
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Redirect};
    use axum::routing::get;
    use axum::Router;
    use sha1::{Digest, Sha1};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const PAYLOAD: &[u8] = b"library bytes for testing";

    fn sha1_hex(data: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    async fn serve(hits: Arc<AtomicUsize>) -> String {
        let counted = hits.clone();
        let app = Router::new()
            .route(
                "/file",
                get(move || {
                    let hits = counted.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        PAYLOAD
                    }
                }),
            )
            .route("/hop", get(|| async { Redirect::temporary("/file") }))
            .route("/loop", get(|| async { Redirect::temporary("/loop") }))
            .route(
                "/missing",
                get(|| async { StatusCode::NOT_FOUND.into_response() }),
            )
            .route(
                "/chunked",
                get(|| async {
                    let chunks = vec![Ok::<_, std::io::Error>(&PAYLOAD[..10]), Ok(&PAYLOAD[10..])];
                    Body::from_stream(futures::stream::iter(chunks))
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    /// Announces more bytes than it sends, then closes the connection.
    async fn serve_truncated() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\nonly a few bytes")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn downloader() -> Downloader {
        Downloader::new(crate::core::http::build_http_client(None).unwrap())
    }

    #[tokio::test]
    async fn fetch_streams_to_file_and_reports_progress() {
        let base = serve(Arc::new(AtomicUsize::new(0))).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested").join("a.jar");
        let seen = Mutex::new(Vec::new());
        let report = |done: u64, total: Option<u64>| seen.lock().unwrap().push((done, total));
        let report: ProgressFn<'_> = &report;

        let written = downloader()
            .fetch_to_file(&format!("{base}/file"), &dest, Some(report))
            .await
            .unwrap();

        assert_eq!(written, PAYLOAD.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), PAYLOAD);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().unwrap().0, PAYLOAD.len() as u64);
    }

    #[tokio::test]
    async fn fetch_follows_redirects_and_gives_up_on_loops() {
        let base = serve(Arc::new(AtomicUsize::new(0))).await;
        let bytes = downloader()
            .fetch_to_memory(&format!("{base}/hop"), None)
            .await
            .unwrap();
        assert_eq!(bytes, PAYLOAD);

        let err = downloader()
            .fetch_to_memory(&format!("{base}/loop"), None)
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_file_behind() {
        let base = serve(Arc::new(AtomicUsize::new(0))).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("gone.jar");

        let err = downloader()
            .fetch_to_file(&format!("{base}/missing"), &dest, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn connection_cut_mid_body_leaves_no_file_behind() {
        let base = serve_truncated().await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("cut.jar");

        let err = downloader()
            .fetch_to_file(&format!("{base}/file"), &dest, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Http(_)), "{err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn chunked_response_reports_unknown_total() {
        let base = serve(Arc::new(AtomicUsize::new(0))).await;
        let seen = Mutex::new(Vec::new());
        let report = |done: u64, total: Option<u64>| seen.lock().unwrap().push((done, total));
        let report: ProgressFn<'_> = &report;

        let bytes = downloader()
            .fetch_to_memory(&format!("{base}/chunked"), Some(report))
            .await
            .unwrap();

        assert_eq!(bytes, PAYLOAD);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|(_, total)| total.is_none()));
        assert_eq!(seen.last().unwrap().0, PAYLOAD.len() as u64);
    }

    #[tokio::test]
    async fn present_valid_file_needs_no_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(hits.clone()).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("ok.jar");
        tokio::fs::write(&dest, PAYLOAD).await.unwrap();

        let mut task = DownloadTask::new(DownloadEntry {
            url: format!("{base}/file"),
            dest,
            sha1: Some(sha1_hex(PAYLOAD)),
            size: None,
        });
        let outcome = task.ensure(&downloader(), true, None).await.unwrap();

        assert_eq!(outcome, EnsureOutcome::Present);
        assert_eq!(task.state(), DownloadState::Succeeded);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn corrupt_file_is_fetched_exactly_once_more() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(hits.clone()).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("corrupt.jar");
        tokio::fs::write(&dest, b"garbage").await.unwrap();

        let mut task = DownloadTask::new(DownloadEntry {
            url: format!("{base}/file"),
            dest: dest.clone(),
            sha1: Some(sha1_hex(PAYLOAD)),
            size: None,
        });
        let outcome = task.ensure(&downloader(), true, None).await.unwrap();

        assert_eq!(outcome, EnsureOutcome::Repaired);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), PAYLOAD);
    }

    #[tokio::test]
    async fn second_mismatch_is_an_integrity_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(hits.clone()).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("bad.jar");
        tokio::fs::write(&dest, b"garbage").await.unwrap();

        let mut task = DownloadTask::new(DownloadEntry {
            url: format!("{base}/file"),
            dest,
            sha1: Some("0000000000000000000000000000000000000000".into()),
            size: None,
        });
        let err = task.ensure(&downloader(), true, None).await.unwrap_err();

        assert!(matches!(err, LauncherError::Sha1Mismatch { .. }));
        assert_eq!(task.state(), DownloadState::Failed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn present_file_without_checksum_is_trusted() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(hits.clone()).await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("any.jar");
        tokio::fs::write(&dest, b"whatever").await.unwrap();

        let mut task = DownloadTask::new(DownloadEntry {
            url: format!("{base}/file"),
            dest,
            sha1: None,
            size: None,
        });
        assert_eq!(
            task.ensure(&downloader(), true, None).await.unwrap(),
            EnsureOutcome::Present
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
