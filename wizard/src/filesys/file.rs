//! JSON files on disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::WizardError;

fn storage_error(path: &Path, action: &str, e: impl std::fmt::Display) -> WizardError {
    WizardError::StorageError(format!("failed to {} {}: {}", action, path.display(), e))
}

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    pub async fn read_string(&self) -> Result<String, WizardError> {
        fs::read_to_string(&self.path)
            .await
            .map_err(|e| storage_error(&self.path, "read", e))
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, WizardError> {
        let contents = self.read_string().await?;
        serde_json::from_str(&contents).map_err(|e| storage_error(&self.path, "parse", e))
    }

    /// Read file as JSON, `None` when it does not exist
    pub async fn read_json_opt<T: DeserializeOwned>(&self) -> Result<Option<T>, WizardError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| storage_error(&self.path, "parse", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(&self.path, "read", e)),
        }
    }

    /// Write JSON through a temporary file, creating parent directories
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), WizardError> {
        let contents = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, "create", e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| storage_error(&temp_path, "create", e))?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, "replace", e))
    }

    /// Delete the file; a missing file is not an error
    pub async fn delete(&self) -> Result<(), WizardError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, "delete", e)),
        }
    }
}
