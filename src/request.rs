use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

const REFRESH_TOKEN_FIELD: &str = "refreshToken";

/// One-shot renewal guard carried by every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Attempt {
    #[default]
    Fresh,
    Retried,
}

/// A request relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Value>,
    attempt: Attempt,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        let path = path.as_ref().trim();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            headers: HeaderMap::new(),
            body: None,
            attempt: Attempt::Fresh,
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Encode(format!("request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Flips the guard to `Retried`. There is no way back to `Fresh`.
    pub(crate) fn mark_retried(&mut self) {
        self.attempt = Attempt::Retried;
    }

    /// Swaps a `refreshToken` body field that still holds `stale` for `live`.
    pub(crate) fn rebind_refresh_token(&mut self, stale: &str, live: &str) -> bool {
        let Some(field) = self
            .body
            .as_mut()
            .and_then(|body| body.get_mut(REFRESH_TOKEN_FIELD))
        else {
            return false;
        };
        if field.as_str() != Some(stale) {
            return false;
        }
        *field = Value::String(live.to_string());
        true
    }

    pub(crate) fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ApiError::Validation("access token is not a valid header value".to_string())
        })?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Decode(format!("response body: {e}")))
    }

    /// Turns a non-2xx response into [`ApiError::Server`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(self.status.as_u16(), &self.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_request_is_fresh_and_path_is_rooted() {
        let req = ApiRequest::get("jobs");
        assert_eq!(req.path(), "/jobs");
        assert_eq!(req.attempt(), Attempt::Fresh);
        assert_eq!(ApiRequest::get("/jobs").path(), "/jobs");
    }

    #[test]
    fn mark_retried_is_sticky() {
        let mut req = ApiRequest::get("/jobs");
        req.mark_retried();
        req.mark_retried();
        assert_eq!(req.attempt(), Attempt::Retried);
        assert_eq!(req.clone().attempt(), Attempt::Retried);
    }

    #[test]
    fn set_bearer_replaces_existing_authorization() {
        let mut req = ApiRequest::get("/jobs");
        req.set_bearer("a1").unwrap();
        req.set_bearer("a2").unwrap();
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer a2");
        assert!(req.set_bearer("bad\ntoken").is_err());
    }

    #[test]
    fn rebind_refresh_token_only_touches_the_stale_value() {
        let mut req = ApiRequest::post("/auth/logout")
            .json(&json!({ "refreshToken": "r1" }))
            .unwrap();
        assert!(req.rebind_refresh_token("r1", "r2"));
        assert_eq!(req.body().unwrap()["refreshToken"], "r2");
        assert!(!req.rebind_refresh_token("r1", "r3"));
        assert_eq!(req.body().unwrap()["refreshToken"], "r2");

        let mut other = ApiRequest::post("/jobs").json(&json!({ "title": "r1" })).unwrap();
        assert!(!other.rebind_refresh_token("r1", "r2"));
        assert!(!ApiRequest::get("/jobs").rebind_refresh_token("r1", "r2"));
    }

    #[test]
    fn error_for_status_keeps_success_and_maps_failure() {
        let ok = ApiResponse::new(StatusCode::OK, HeaderMap::new(), b"{}".to_vec());
        assert!(ok.error_for_status().is_ok());

        let denied = ApiResponse::new(
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            json!({ "message": "Unauthorized" }).to_string().into_bytes(),
        );
        let err = denied.error_for_status().unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "HTTP 401: Unauthorized");
    }
}
