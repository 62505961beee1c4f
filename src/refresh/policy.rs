use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse, Attempt};
use reqwest::StatusCode;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

const CREDENTIAL_LIFECYCLE_PATHS: [&str; 3] = [LOGIN_PATH, REGISTER_PATH, REFRESH_PATH];

/// What to do with a finished request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deliver,
    Renew,
}

fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Login, register and refresh answer 401 for bad credentials, never for an expired session.
pub fn is_credential_lifecycle(path: &str) -> bool {
    let path = normalize_path(path);
    CREDENTIAL_LIFECYCLE_PATHS.contains(&path)
}

pub fn should_renew(request: &ApiRequest, status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
        && request.attempt() == Attempt::Fresh
        && !is_credential_lifecycle(request.path())
}

/// Runs after every cycle, including ones that produced no response.
pub fn evaluate(request: &ApiRequest, outcome: &Result<ApiResponse, ApiError>) -> Verdict {
    match outcome {
        Ok(response) if should_renew(request, response.status()) => Verdict::Renew,
        _ => Verdict::Deliver,
    }
}
