use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{AuthError, Result};

/// One independently keyed slot of the persisted session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSlot {
    AccessToken,
    RefreshToken,
    User,
}

impl TokenSlot {
    pub const ALL: [TokenSlot; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    /// Storage key, shared with the browser client's local storage layout
    pub fn key(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::User => "user",
        }
    }
}

/// Snapshot of the three slots; any subset may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<String>,
}

impl PersistedCredentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Durable storage for the access token, refresh token and serialized user.
///
/// Slots are written independently; there is no transaction across them.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Read a slot
    async fn get(&self, slot: TokenSlot) -> Option<String>;

    /// Write a slot, replacing any previous value
    async fn set(&self, slot: TokenSlot, value: &str) -> Result<()>;

    /// Remove a slot; removing an empty slot is not an error
    async fn remove(&self, slot: TokenSlot) -> Result<()>;

    /// Remove all three slots
    async fn clear(&self) -> Result<()> {
        for slot in TokenSlot::ALL {
            self.remove(slot).await?;
        }
        Ok(())
    }

    /// Read all three slots
    async fn load_all(&self) -> PersistedCredentials {
        PersistedCredentials {
            access_token: self.get(TokenSlot::AccessToken).await,
            refresh_token: self.get(TokenSlot::RefreshToken).await,
            user: self.get(TokenSlot::User).await,
        }
    }
}

/// In-memory token store for testing and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slots: Arc<RwLock<HashMap<TokenSlot, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store pre-populated with the given slots
    pub fn with_slots<'a>(slots: impl IntoIterator<Item = (TokenSlot, &'a str)>) -> Self {
        let map = slots
            .into_iter()
            .map(|(slot, value)| (slot, value.to_string()))
            .collect();
        Self {
            slots: Arc::new(RwLock::new(map)),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, slot: TokenSlot) -> Option<String> {
        self.slots.read().ok()?.get(&slot).cloned()
    }

    async fn set(&self, slot: TokenSlot, value: &str) -> Result<()> {
        self.slots
            .write()
            .map_err(|_| AuthError::InvalidResponse("Lock poisoned".to_string()))?
            .insert(slot, value.to_string());
        Ok(())
    }

    async fn remove(&self, slot: TokenSlot) -> Result<()> {
        self.slots
            .write()
            .map_err(|_| AuthError::InvalidResponse("Lock poisoned".to_string()))?
            .remove(&slot);
        Ok(())
    }
}
