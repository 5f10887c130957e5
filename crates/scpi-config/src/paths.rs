//! Locations of state persisted by the server between runs.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// File name of the opaque auto-login settings blob.
pub const AUTOLOGIN_FILE_NAME: &str = "autologin.blob";

/// Canonical paths for state written by the server.
#[derive(Debug, Clone)]
pub struct StatePaths {
    state_dir: PathBuf,
    autologin_path: PathBuf,
}

impl StatePaths {
    /// Derives state paths from the configuration, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`StatePathsError::StateDirectory`] when the directory cannot
    /// be created.
    pub fn from_config(config: &Config) -> Result<Self, StatePathsError> {
        Self::in_directory(config.state_dir().as_std_path())
    }

    /// Derives state paths rooted at an explicit directory.
    ///
    /// # Errors
    ///
    /// See [`StatePaths::from_config`].
    pub fn in_directory(dir: &Path) -> Result<Self, StatePathsError> {
        fs::create_dir_all(dir).map_err(|source| StatePathsError::StateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            autologin_path: dir.join(AUTOLOGIN_FILE_NAME),
            state_dir: dir.to_path_buf(),
        })
    }

    /// Directory holding persisted state.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        self.state_dir.as_path()
    }

    /// Path of the auto-login settings blob.
    #[must_use]
    pub fn autologin_path(&self) -> &Path {
        self.autologin_path.as_path()
    }
}

/// Errors raised while deriving state paths.
#[derive(Debug, Error)]
pub enum StatePathsError {
    /// Creating the state directory failed.
    #[error("failed to prepare state directory '{path}': {source}")]
    StateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
