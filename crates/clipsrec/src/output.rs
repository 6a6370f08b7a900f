//! Output directory owned by a single run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::record::ClipRecord;
use crate::{Error, Result};

pub const METADATA_FILE_NAME: &str = "clips.json";

pub const CLIP_EXTENSION: &str = "mp4";

#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Delete `path` if it is a directory, then create it empty.
    pub async fn recreate(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %path.display(), "Removing previous output directory");
                tokio::fs::remove_dir_all(&path)
                    .await
                    .map_err(|e| Error::io_path("removing", &path, e))?;
            }
            Ok(_) => {
                return Err(Error::io_path(
                    "recreating",
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "path exists and is not a directory",
                    ),
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io_path("inspecting", &path, e)),
        }

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| Error::io_path("creating", &path, e))?;

        info!(path = %path.display(), "Output directory ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clip_path(&self, tracking_id: &str) -> PathBuf {
        self.path.join(format!("{tracking_id}.{CLIP_EXTENSION}"))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE_NAME)
    }

    /// Write `clips.json` with the raw records of the selection.
    pub async fn write_metadata(&self, clips: &[ClipRecord]) -> Result<PathBuf> {
        let raw: Vec<&Value> = clips.iter().map(ClipRecord::raw).collect();
        let bytes = to_json_pretty(&raw)?;

        let path = self.metadata_path();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::io_path("writing", &path, e))?;

        debug!(path = %path.display(), clips = clips.len(), "Clip metadata written");
        Ok(path)
    }
}

/// Pretty JSON with a 4-space indent.
fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}
