use super::storage::Storage;
use crate::error::StoreError;
use tracing::debug;

pub const KEYRING_SERVICE: &str = "com.pragya.client";
const AVAILABILITY_KEY: &str = "availability-check";

/// OS keychain / secret service storage, one entry per key.
pub struct KeyringStorage {
    service: String,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(&self.service, key)
    }

    /// Reads a key that is never written. Any answer from the backend,
    /// including "no such entry", means the keychain is reachable.
    pub fn is_available(&self) -> bool {
        match self.entry(AVAILABILITY_KEY).and_then(|entry| entry.get_password()) {
            Ok(_)
            | Err(keyring::Error::NoEntry)
            | Err(keyring::Error::BadEncoding(_))
            | Err(keyring::Error::Ambiguous(_)) => true,
            Err(e) => {
                debug!(service = %self.service, error = %e, "keychain backend unreachable");
                false
            }
        }
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::BadEncoding(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.entry(key)?.set_password(value)?;
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in keys {
            let result = self.entry(key).and_then(|entry| entry.delete_credential());
            match result {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
