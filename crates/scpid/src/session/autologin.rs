//! Persisted auto-login settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::SESSION_TARGET;

/// Credentials a new session logs in with before reading its first command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AutoLoginSettings {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

/// Errors raised while persisting auto-login settings.
#[derive(Debug, Error)]
pub enum AutoLoginError {
    /// Serialising the settings failed.
    #[error("failed to encode auto-login settings: {0}")]
    Encode(#[from] serde_json::Error),
    /// Writing the blob failed.
    #[error("failed to write auto-login settings to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Location of the auto-login blob; `None` keeps settings in memory only.
#[derive(Debug, Clone, Default)]
pub struct AutoLoginStore {
    path: Option<PathBuf>,
}

impl AutoLoginStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Backing file, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the persisted settings.
    ///
    /// A missing or unreadable blob yields the defaults.
    #[must_use]
    pub fn load(&self) -> AutoLoginSettings {
        let Some(path) = self.path.as_deref() else {
            return AutoLoginSettings::default();
        };
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(
                    target: SESSION_TARGET,
                    path = %path.display(),
                    %error,
                    "auto-login settings unavailable; using defaults"
                );
                return AutoLoginSettings::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|error| {
            debug!(
                target: SESSION_TARGET,
                path = %path.display(),
                %error,
                "auto-login settings corrupt; using defaults"
            );
            AutoLoginSettings::default()
        })
    }

    /// Persists `settings`.
    ///
    /// # Errors
    ///
    /// Fails when the settings cannot be encoded or written.
    pub fn save(&self, settings: &AutoLoginSettings) -> Result<(), AutoLoginError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(settings)?;
        fs::write(path, bytes).map_err(|source| AutoLoginError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
