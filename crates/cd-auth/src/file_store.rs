use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::errors::{AuthError, Result};
use crate::store::{TokenSlot, TokenStore};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// File-based token store
///
/// Keeps each slot in its own file inside a private directory, so a crash
/// between writes leaves the other slots intact. Writers in this process
/// queue on an async mutex shared by every clone; other processes are kept
/// out by an advisory file lock.
///
/// # Directory Structure
/// ```text
/// ~/.config/contaduria-client/session/
/// ├── lock                   # Advisory lock file
/// ├── accessToken            # Access token
/// ├── refreshToken           # Refresh token
/// └── user.json              # Serialized user record
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    storage_dir: PathBuf,
    lock_file: PathBuf,
    write_gate: Arc<Mutex<()>>,
}

impl FileTokenStore {
    /// Create a new file-based token store
    ///
    /// # Arguments
    /// * `storage_dir` - Directory holding the slot files (created if missing)
    pub async fn new(storage_dir: impl AsRef<Path>) -> Result<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        let lock_file = storage_dir.join("lock");

        fs::create_dir_all(&storage_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&storage_dir, perms)?;
        }

        debug!("Token store ready at {}", storage_dir.display());
        Ok(Self {
            storage_dir,
            lock_file,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Get default storage directory for the current platform
    pub fn default_storage_dir() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("com", "contaduria", "contaduria-client")
            .ok_or_else(|| {
                AuthError::InvalidResponse("Could not determine config directory".to_string())
            })?;

        Ok(project_dirs.config_dir().join("session"))
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn slot_path(&self, slot: TokenSlot) -> PathBuf {
        match slot {
            TokenSlot::User => self.storage_dir.join(format!("{}.json", slot.key())),
            _ => self.storage_dir.join(slot.key()),
        }
    }

    /// Acquire an exclusive lock on the storage directory, retrying while
    /// another holder has it
    async fn acquire_lock(&self) -> Result<std::fs::File> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_file)?;

        for attempt in 1..=LOCK_ATTEMPTS {
            if lock_file.try_lock_exclusive().is_ok() {
                return Ok(lock_file);
            }
            debug!("Token store busy (attempt {})", attempt);
            tokio::time::sleep(LOCK_RETRY_DELAY).await;
        }

        warn!("Gave up waiting for the token store lock");
        Err(AuthError::StoreLocked)
    }

    async fn read_slot(&self, slot: TokenSlot) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_slot(&self, slot: TokenSlot, value: &str) -> Result<()> {
        let path = self.slot_path(slot);

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value).await?;

        let file = std::fs::File::open(&temp_path)?;
        file.sync_all()?;

        fs::rename(&temp_path, &path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, slot: TokenSlot) -> Option<String> {
        match self.read_slot(slot).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read slot {}: {}", slot.key(), e);
                None
            }
        }
    }

    async fn set(&self, slot: TokenSlot, value: &str) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let _lock = self.acquire_lock().await?;
        self.write_slot(slot, value).await
    }

    async fn remove(&self, slot: TokenSlot) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let _lock = self.acquire_lock().await?;

        match fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
