//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::errors::WizardError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), WizardError> {
        fs::create_dir_all(&self.path).await.map_err(|e| {
            WizardError::StorageError(format!("failed to create {}: {}", self.path.display(), e))
        })
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), WizardError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Create a uniquely named directory under the system temp dir
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, WizardError> {
        let dir = Dir::new(std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4())));
        dir.create().await?;
        Ok(dir)
    }
}
