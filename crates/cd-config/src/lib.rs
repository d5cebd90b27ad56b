//! Settings file for the contaduría client
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8081"
//! connect_timeout_secs = 15
//! request_timeout_secs = 30
//!
//! [storage]
//! ephemeral = false
//!
//! [logging]
//! filter = "info"
//! ```

mod loader;
mod settings;

pub use loader::{SETTINGS_FILE_NAME, SettingsError};
pub use settings::{ApiSettings, LoggingSettings, Settings, StorageSettings};
