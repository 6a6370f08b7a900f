//! # Clip downloader
//!
//! Downloads every selected clip concurrently and streams each response body
//! to its own file in fixed-size chunks.
//!
//! All downloads are futures driven by one `buffer_unordered` stream on the
//! calling task, so nothing runs in parallel threads and no state is shared
//! between clips. A failing clip is recorded as a [`DownloadOutcome::Failure`]
//! and never cancels its siblings; [`ClipDownloader::download_all`] returns
//! only once every clip reached an outcome.

use std::io;
use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Client;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::output::OutputDir;
use crate::resolver::ResolvedClip;

/// Terminal state of one clip download.
#[derive(Debug)]
pub enum DownloadOutcome {
    Success {
        tracking_id: String,
        path: PathBuf,
        bytes: u64,
    },
    Failure {
        tracking_id: String,
        url: String,
        error: DownloadError,
    },
}

impl DownloadOutcome {
    pub fn tracking_id(&self) -> &str {
        match self {
            Self::Success { tracking_id, .. } | Self::Failure { tracking_id, .. } => tracking_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

pub struct ClipDownloader {
    client: Client,
    output: OutputDir,
    config: DownloadConfig,
}

impl ClipDownloader {
    pub fn new(client: Client, output: OutputDir, config: DownloadConfig) -> Self {
        Self {
            client,
            output,
            config,
        }
    }

    /// Download all clips and collect one outcome per clip, in completion order.
    pub async fn download_all(&self, clips: &[ResolvedClip]) -> Vec<DownloadOutcome> {
        let limit = self
            .config
            .max_concurrent
            .unwrap_or(clips.len())
            .max(1);

        info!(
            clips = clips.len(),
            max_concurrent = limit,
            chunk_size = self.config.chunk_size,
            "Starting clip downloads"
        );

        let outcomes: Vec<DownloadOutcome> = stream::iter(clips.iter().map(|clip| {
            let span = info_span!("clip", tracking_id = %clip.tracking_id());
            self.download_one(clip).instrument(span)
        }))
        .buffer_unordered(limit)
        .collect()
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            succeeded = outcomes.len() - failed,
            failed, "Clip downloads finished"
        );
        outcomes
    }

    async fn download_one(&self, clip: &ResolvedClip) -> DownloadOutcome {
        let tracking_id = clip.tracking_id().to_owned();
        let url = clip.media.url.as_str();
        let path = self.output.clip_path(&tracking_id);

        info!(
            url = %url,
            title = clip.record.title().unwrap_or_default(),
            "Download started"
        );

        let result = match self.config.clip_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch_to_file(url, &path))
                .await
                .unwrap_or(Err(DownloadError::Timeout(limit))),
            None => self.fetch_to_file(url, &path).await,
        };

        match result {
            Ok(bytes) => {
                info!(bytes, path = %path.display(), "Download done");
                DownloadOutcome::Success {
                    tracking_id,
                    path,
                    bytes,
                }
            }
            Err(error) => {
                warn!(url = %url, error = %error, fallback_url = clip.media.fallback, "Cannot download clip");
                if !matches!(error, DownloadError::HttpStatus { .. }) {
                    remove_partial(&path).await;
                }
                DownloadOutcome::Failure {
                    tracking_id,
                    url: url.to_owned(),
                    error,
                }
            }
        }
    }

    /// Plain GET (no auth headers) streamed to `path`.
    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus { status });
        }

        match response.content_length() {
            Some(len) => debug!(content_length = len, "Media response received"),
            None => debug!("Media response has no content length"),
        }

        let body = response.bytes_stream().map_err(io::Error::other);
        let reader = StreamReader::new(body);
        tokio::pin!(reader);

        stream_to_file(reader, path, self.config.chunk_size)
            .await
            .map_err(classify_io_error)
    }
}

/// Copy `reader` into a new file at `path`, `chunk_size` bytes at a time.
pub async fn stream_to_file<R>(mut reader: R, path: &Path, chunk_size: usize) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        written += n as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Body read errors arrive wrapped in `io::Error`; unwrap the transport ones.
fn classify_io_error(err: io::Error) -> DownloadError {
    if err
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>())
    {
        if let Some(inner) = err.into_inner() {
            return match inner.downcast::<reqwest::Error>() {
                Ok(e) => DownloadError::Network(*e),
                Err(other) => DownloadError::Io(io::Error::other(other)),
            };
        }
        return DownloadError::Io(io::Error::other("stream error"));
    }
    DownloadError::Io(err)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial clip file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial clip file"),
    }
}
