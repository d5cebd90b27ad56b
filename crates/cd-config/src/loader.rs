use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::settings::Settings;

pub const SETTINGS_FILE_NAME: &str = "settings.toml";

impl Settings {
    /// Platform location of the settings file
    #[instrument(level = "debug")]
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let proj_dirs = ProjectDirs::from("com", "contaduria", "contaduria-client").ok_or_else(|| {
            error!("Failed to determine project directories - this usually indicates an unsupported OS or missing home directory");
            SettingsError::ProjectDirectoriesUnavailable
        })?;

        let path = proj_dirs.config_dir().join(SETTINGS_FILE_NAME);
        debug!("Settings path resolved to: {}", path.display());
        Ok(path)
    }

    /// Read and parse a settings file
    #[instrument(level = "debug")]
    pub async fn load(path: &Path) -> Result<Settings, SettingsError> {
        if tokio::fs::metadata(path).await.is_err() {
            warn!("Settings file does not exist: {}", path.display());
            return Err(SettingsError::SettingsFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read settings file")
            .map_err(|e| {
                error!("Failed to read settings file {}: {}", path.display(), e);
                SettingsError::SettingsFileReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;

        let settings: Settings = toml::from_str(&content)
            .context("Failed to parse settings TOML")
            .map_err(|e| {
                error!("Failed to parse settings file {}: {}", path.display(), e);
                SettingsError::SettingsParsingFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults
    pub async fn load_or_default(path: &Path) -> Result<Settings, SettingsError> {
        match Self::load(path).await {
            Err(SettingsError::SettingsFileNotFound { .. }) => {
                info!("Using default settings");
                Ok(Settings::default())
            }
            other => other,
        }
    }

    /// Write the settings as pretty TOML, creating parent directories
    #[instrument(skip(self), level = "debug")]
    pub async fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create settings directory")
                .map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    SettingsError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    }
                })?;
        }

        let toml = toml::to_string_pretty(self)
            .context("Failed to serialize settings to TOML")
            .map_err(|e| SettingsError::SettingsSerializationFailed { source: e })?;

        tokio::fs::write(path, toml)
            .await
            .context("Failed to write settings file")
            .map_err(|e| {
                error!("Failed to write settings file {}: {}", path.display(), e);
                SettingsError::SettingsFileWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "Project directories are unavailable - this usually indicates an unsupported OS or missing home directory"
    )]
    ProjectDirectoriesUnavailable,

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Settings file not found: '{path}'")]
    SettingsFileNotFound { path: PathBuf },

    #[error("Failed to read settings file '{path}': {source}")]
    SettingsFileReadFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write settings file '{path}': {source}")]
    SettingsFileWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    SettingsParsingFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to serialize settings: {source}")]
    SettingsSerializationFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid API base URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}
