mod auth;
mod client;
pub mod config;
mod download;
mod error;
pub mod navigation;
mod redact;
pub mod refresh;
mod request;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use client::ApiClient;
pub use download::{filename_from_disposition, Download};
pub use error::{ApiError, ConfigError, StoreError};
pub use redact::redact_secrets;
pub use request::{ApiRequest, ApiResponse, Attempt};
