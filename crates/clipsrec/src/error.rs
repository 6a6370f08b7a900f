//! Error types.
//!
//! [`Error`] covers everything that aborts a run. [`DownloadError`] is the
//! per-clip failure recorded in a [`DownloadOutcome`](crate::DownloadOutcome)
//! and never escapes the download orchestrator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;

/// Engine-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these halts the whole job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("token request failed: {reason}")]
    Auth { reason: String },

    #[error("clip catalog request failed: {reason}")]
    Catalog { reason: String },

    /// Upstream data no longer has the shape this engine was written against.
    #[error("unexpected upstream data: {0}")]
    DataContract(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error while {op} `{}`: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    pub fn catalog(reason: impl Into<String>) -> Self {
        Self::Catalog {
            reason: reason.into(),
        }
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::DataContract(msg.into())
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short label of the stage that failed, used in run diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Auth { .. } => "token exchange",
            Self::Catalog { .. } => "clip catalog",
            Self::DataContract(_) => "clip metadata",
            Self::Http(_) => "http",
            Self::Io { .. } => "output directory",
            Self::Serialization(_) => "metadata serialization",
        }
    }
}

/// Failure of a single clip download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("media host answered HTTP {status}")]
    HttpStatus { status: StatusCode },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("stream interrupted: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl DownloadError {
    /// HTTP status of the media response, when the failure was a status code.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io_path(
            "removing",
            Path::new("out/dir"),
            std::io::Error::other("busy"),
        );
        let msg = err.to_string();
        assert!(msg.contains("removing"));
        assert!(msg.contains("out/dir"));
        assert_eq!(err.stage(), "output directory");
    }

    #[test]
    fn test_download_error_status() {
        let err = DownloadError::HttpStatus {
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "media host answered HTTP 404 Not Found");
        assert_eq!(DownloadError::Timeout(Duration::from_secs(1)).status(), None);
    }
}
