use crate::redact::redact_secrets;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(String),
    #[error("encode: {0}")]
    Encode(String),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("session storage: {0}")]
    Storage(#[from] StoreError),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Builds a `Server` error from a non-2xx body, preferring the server's own message.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        let message = server_message(body)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        Self::Server {
            status,
            message: redact_secrets(&message).into_owned(),
        }
    }
}

fn server_message(body: &[u8]) -> Option<String> {
    let json: Value = serde_json::from_slice(body).ok()?;
    let obj = json.as_object()?;
    for key in ["message", "error"] {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            // class-validator failures come back as a list of messages.
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                if !parts.is_empty() {
                    return Some(parts.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be an http(s) url, got {value:?}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("unknown session store {0:?} (expected file, keyring or memory)")]
    UnknownStore(String),
    #[error("HOME is not set; set PRAGYA_SESSION_FILE explicitly")]
    HomeMissing,
    #[error("no OS keychain or secret service is reachable; use --store file")]
    KeyringUnavailable,
}
