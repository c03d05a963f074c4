use crate::error::server::ServerError;

use common::ErrorLocation;

use std::env::temp_dir;
use std::fs::canonicalize;
use std::io::{ErrorKind, Result as IoResult, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, trace};
use tempfile::{Builder as TempFileBuilder, TempPath};

const ARTIFACT_PREFIX: &str = "pys-";
const ARTIFACT_SUFFIX: &str = ".html";

/// The document written to disk under a unique name.
///
/// Deleted exactly once: by [`consume`](Self::consume) after it was served,
/// or by [`remove`](Self::remove) / drop at teardown.
#[derive(Debug)]
pub struct TemporaryArtifact {
    path: PathBuf,
    file_name: String,
    temp: Mutex<Option<TempPath>>,
}

impl TemporaryArtifact {
    /// Write `contents` to a fresh file in `dir`.
    pub fn create(dir: &Path, contents: &[u8]) -> Result<Self, ServerError> {
        let mut file = TempFileBuilder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(ARTIFACT_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| ServerError::TempFile {
                path: dir.to_path_buf(),
                message: format!("Failed to create temporary document: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if let Err(e) = file.write_all(contents).and_then(|_| file.flush()) {
            return Err(ServerError::TempFile {
                path: file.path().to_path_buf(),
                message: format!("Failed to write temporary document: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let temp = file.into_temp_path();
        let path = temp.to_path_buf();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!("Wrote temporary document {}", path.display());

        Ok(Self {
            path,
            file_name,
            temp: Mutex::new(Some(temp)),
        })
    }

    /// Write `contents` to a fresh file in the system temp directory.
    ///
    /// The static fallback serves everything under `served_root`, so the file
    /// must live elsewhere to stay single-shot.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidOptions`] - the temp directory is inside `served_root`
    /// - [`ServerError::TempFile`] - the file could not be written
    #[track_caller]
    pub fn create_outside(served_root: &Path, contents: &[u8]) -> Result<Self, ServerError> {
        let dir = temp_dir();
        let canonical = |path: &Path| canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if canonical(dir.as_path()).starts_with(canonical(served_root)) {
            return Err(ServerError::invalid_options(format!(
                "temp-file backing needs a working directory outside {}",
                dir.display()
            )));
        }

        Self::create(&dir, contents)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether the file is still owned (not yet served or removed).
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Read the document and delete it. `None` if it was already consumed or removed.
    pub async fn consume(&self) -> Option<IoResult<Vec<u8>>> {
        let temp = self.lock().take()?;
        let contents = tokio::fs::read(&*temp).await;
        close_quietly(temp);
        Some(contents)
    }

    /// Delete the file if it still exists. Safe to call any number of times.
    pub fn remove(&self) {
        if let Some(temp) = self.lock().take() {
            close_quietly(temp);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TempPath>> {
        self.temp.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

fn close_quietly(temp: TempPath) {
    let path = temp.to_path_buf();
    match temp.close() {
        Ok(()) => debug!("Removed temporary document {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!("Temporary document {} already gone", path.display());
        }
        Err(e) => debug!("Could not remove {}: {e}", path.display()),
    }
}
