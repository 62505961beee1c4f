use super::storage::{MemoryStorage, Storage};
use crate::error::StoreError;
use crate::types::{CredentialPair, SessionUser};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub const KEY_ACCESS_TOKEN: &str = "accessToken";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_USER: &str = "user";

const SESSION_KEYS: [&str; 3] = [KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER];

/// Result of a compare-and-swap on the stored credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    /// The stored pair still matched and was replaced.
    Applied,
    /// Another renewal got there first; the stored pair was kept.
    Superseded(CredentialPair),
    /// No session is stored any more (logout or a failed renewal).
    Ended,
}

/// Session state over a durable [`Storage`] backend.
///
/// Every operation runs under one async lock, so the pair is read and
/// written as a unit and rotations are decided against a stable view.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    fn read_token(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .storage
            .get(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    fn read_pair(&self) -> Result<Option<CredentialPair>, StoreError> {
        let access = self.read_token(KEY_ACCESS_TOKEN)?;
        let refresh = self.read_token(KEY_REFRESH_TOKEN)?;
        Ok(match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Some(CredentialPair {
                access_token,
                refresh_token,
            }),
            _ => None,
        })
    }

    fn write_pair(&self, pair: &CredentialPair, user: Option<&SessionUser>) -> Result<(), StoreError> {
        let mut entries = vec![
            (KEY_ACCESS_TOKEN, pair.access_token.clone()),
            (KEY_REFRESH_TOKEN, pair.refresh_token.clone()),
        ];
        if let Some(user) = user {
            entries.push((KEY_USER, serde_json::to_string(user)?));
        }
        self.storage.set_many(&entries)
    }

    pub async fn access_token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_token(KEY_ACCESS_TOKEN)
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_token(KEY_REFRESH_TOKEN)
    }

    pub async fn credentials(&self) -> Result<Option<CredentialPair>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_pair()
    }

    /// Cached user record. A record that no longer parses is treated as absent.
    pub async fn user(&self) -> Result<Option<SessionUser>, StoreError> {
        let _guard = self.lock.lock().await;
        let Some(raw) = self.storage.get(KEY_USER)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cached user record");
                Ok(None)
            }
        }
    }

    /// Stores a freshly issued pair together with the signed-in user.
    pub async fn begin(&self, pair: &CredentialPair, user: &SessionUser) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write_pair(pair, Some(user))
    }

    /// Updates the cached user, but only while a session exists.
    pub async fn set_user(&self, user: &SessionUser) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        if self.read_token(KEY_REFRESH_TOKEN)?.is_none() {
            return Ok(false);
        }
        self.storage
            .set_many(&[(KEY_USER, serde_json::to_string(user)?)])?;
        Ok(true)
    }

    /// Replaces the pair if the stored refresh token is still `expected_refresh`.
    pub async fn rotate(
        &self,
        expected_refresh: &str,
        next: &CredentialPair,
    ) -> Result<Rotation, StoreError> {
        let _guard = self.lock.lock().await;
        let Some(current_refresh) = self.read_token(KEY_REFRESH_TOKEN)? else {
            return Ok(Rotation::Ended);
        };
        if current_refresh != expected_refresh {
            let current = self.read_pair()?;
            return Ok(match current {
                Some(pair) => Rotation::Superseded(pair),
                None => Rotation::Ended,
            });
        }
        self.write_pair(next, None)?;
        Ok(Rotation::Applied)
    }

    /// Removes both tokens and the cached user.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.storage.remove_many(&SESSION_KEYS)
    }
}
