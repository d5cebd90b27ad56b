use std::path::PathBuf;
use std::time::Duration;

use cd_auth::config::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use cd_auth::{ClientConfig, HttpTimeouts};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::loader::SettingsError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: timeouts.connect.as_secs(),
            request_timeout_secs: timeouts.request.as_secs(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Token directory; the platform config dir when unset
    pub dir: Option<PathBuf>,
    /// Keep the session in memory only
    pub ephemeral: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// HTTP client configuration for [`cd_auth::ApiClient`]
    pub fn client_config(&self) -> Result<ClientConfig, SettingsError> {
        let base_url =
            Url::parse(&self.api.base_url).map_err(|e| SettingsError::InvalidBaseUrl {
                value: self.api.base_url.clone(),
                source: e,
            })?;

        let mut config = ClientConfig::new(base_url).with_timeouts(HttpTimeouts {
            connect: Duration::from_secs(self.api.connect_timeout_secs),
            request: Duration::from_secs(self.api.request_timeout_secs),
        });
        if self.api.user_agent.is_some() {
            config.user_agent = self.api.user_agent.clone();
        }
        Ok(config)
    }

    /// Directory for the persisted session slots
    pub fn storage_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.storage.dir {
            Some(dir) => Ok(dir.clone()),
            None => cd_auth::FileTokenStore::default_storage_dir()
                .map_err(|_| SettingsError::ProjectDirectoriesUnavailable),
        }
    }
}
