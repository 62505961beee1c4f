use crate::error::ConfigError;
use crate::state::{FileStorage, KeyringStorage, MemoryStorage, SessionStore, Storage};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_API_URL: &str = "PRAGYA_API_URL";
pub const ENV_SESSION_STORE: &str = "PRAGYA_SESSION_STORE";
pub const ENV_SESSION_FILE: &str = "PRAGYA_SESSION_FILE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "PRAGYA_HTTP_TIMEOUT_SECS";
pub const ENV_HTTP_CONNECT_TIMEOUT_SECS: &str = "PRAGYA_HTTP_CONNECT_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const SESSION_FILE_RELATIVE_PATH: &str = ".pragya/session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    Keyring,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub store: StoreKind,
    /// `None` when neither `PRAGYA_SESSION_FILE` nor `HOME` is set.
    pub session_file: Option<PathBuf>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Reads `PRAGYA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = normalize_base_url(
            ENV_API_URL,
            var(ENV_API_URL).as_deref().unwrap_or(DEFAULT_API_URL),
        )?;

        let store = match var(ENV_SESSION_STORE) {
            Some(value) => value.parse()?,
            None => StoreKind::File,
        };

        let session_file = var(ENV_SESSION_FILE)
            .map(PathBuf::from)
            .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(SESSION_FILE_RELATIVE_PATH)));

        let timeout = parse_secs(ENV_HTTP_TIMEOUT_SECS, var(ENV_HTTP_TIMEOUT_SECS), DEFAULT_TIMEOUT_SECS)?;
        let connect_timeout = parse_secs(
            ENV_HTTP_CONNECT_TIMEOUT_SECS,
            var(ENV_HTTP_CONNECT_TIMEOUT_SECS),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            base_url,
            store,
            session_file,
            timeout,
            connect_timeout,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(ENV_API_URL, url)?;
        Ok(self)
    }

    /// Opens the selected backend. Only the file store needs a path, and the
    /// keyring store is checked so a missing secret service fails here.
    pub fn storage(&self) -> Result<Arc<dyn Storage>, ConfigError> {
        Ok(match self.store {
            StoreKind::File => {
                let path = self.session_file.clone().ok_or(ConfigError::HomeMissing)?;
                Arc::new(FileStorage::new(path))
            }
            StoreKind::Keyring => {
                let keyring = KeyringStorage::default();
                if !keyring.is_available() {
                    return Err(ConfigError::KeyringUnavailable);
                }
                Arc::new(keyring)
            }
            StoreKind::Memory => Arc::new(MemoryStorage::new()),
        })
    }

    pub fn session_store(&self) -> Result<SessionStore, ConfigError> {
        Ok(SessionStore::new(self.storage()?))
    }
}

pub(crate) fn normalize_base_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let valid = ["http://", "https://"]
        .iter()
        .any(|scheme| trimmed.len() > scheme.len() && trimmed.starts_with(*scheme));
    if !valid {
        return Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_secs(name: &'static str, value: Option<String>, fallback: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(fallback));
    };
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
