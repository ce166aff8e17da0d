//! Local persistence for deliveries that never reached the webhook.
//!
//! Each failure produces a pair of files sharing one ULID:
//! - `failed-{ulid}-report.txt`: the error description
//! - `failed-{ulid}-email.json`: the serialised message, ready to be replayed
//!
//! ULIDs are unique within the same millisecond, and files are opened with
//! `create_new` so an existing artifact is never overwritten. Writing is best
//! effort: failures are logged and otherwise dropped.

use std::path::{Path, PathBuf};

use mailhook_common::internal;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::error;
use ulid::Ulid;

use crate::error::FallbackError;

/// Owner read/write only
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone)]
pub struct FallbackWriter {
    dir: PathBuf,
}

/// Paths of the artifacts that were actually written
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FallbackArtifacts {
    pub report: Option<PathBuf>,
    pub payload: Option<PathBuf>,
}

impl FallbackArtifacts {
    /// Returns `true` when both files made it to disk.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.report.is_some() && self.payload.is_some()
    }
}

impl Default for FallbackWriter {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FallbackWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Make sure the fallback directory exists.
    ///
    /// # Errors
    /// If the directory cannot be created, or the path exists and is not a directory.
    pub fn init(&self) -> Result<(), FallbackError> {
        let write_err = |source| FallbackError::Write {
            path: self.dir.clone(),
            source,
        };

        if !self.dir.try_exists().map_err(write_err)? {
            internal!("{} does not exist, creating...", self.dir.display());
            std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        } else if !self.dir.is_dir() {
            return Err(FallbackError::NotADirectory(self.dir.clone()));
        }

        Ok(())
    }

    /// Persist the error and the payload that failed to go out.
    pub async fn persist(&self, reason: &str, payload: &[u8]) -> FallbackArtifacts {
        let id = Ulid::new();
        let report_path = self.dir.join(format!("failed-{id}-report.txt"));
        let payload_path = self.dir.join(format!("failed-{id}-email.json"));

        let report = match write_restricted(&report_path, reason.as_bytes()).await {
            Ok(()) => Some(report_path),
            Err(err) => {
                error!("Error writing failure report: {err}");
                None
            }
        };

        let payload = match write_restricted(&payload_path, payload).await {
            Ok(()) => Some(payload_path),
            Err(err) => {
                error!("Error writing email backup: {err}");
                None
            }
        };

        if let Some(path) = payload.as_ref() {
            internal!(
                level = WARN,
                "Saved undelivered message to {}",
                path.display()
            );
        }

        FallbackArtifacts { report, payload }
    }
}

async fn write_restricted(path: &Path, contents: &[u8]) -> Result<(), FallbackError> {
    let write_err = |source| FallbackError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(path).await.map_err(write_err)?;
    file.write_all(contents).await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;

    Ok(())
}
