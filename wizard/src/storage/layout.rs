//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::WizardError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Storage layout for the wizard
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Per-session state
    pub fn session_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("session"))
    }

    pub fn resume_file(&self) -> File {
        self.session_dir().file("resume.json")
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Create the directories
    pub async fn setup(&self) -> Result<(), WizardError> {
        self.session_dir().create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".obwizard"))
    }
}
