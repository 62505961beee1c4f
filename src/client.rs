//! Authenticated HTTP client.
//!
//! Every request picks up the stored access token on the way out. Responses
//! go through [`crate::refresh`], which may renew the session once and replay
//! the request.

use crate::config::{normalize_base_url, ClientConfig, ENV_API_URL};
use crate::download::Download;
use crate::error::{ApiError, ConfigError};
use crate::navigation::{LoginNavigator, NoopNavigator};
use crate::redact::token_hint;
use crate::refresh::{self, policy, Verdict};
use crate::request::{ApiRequest, ApiResponse};
use crate::state::SessionStore;
use crate::types::{CredentialPair, RefreshRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    session: SessionStore,
    navigator: Arc<dyn LoginNavigator>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self, ApiError> {
        Self::build(base_url, session, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn from_config(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        Self::build(&config.base_url, session, config.timeout, config.connect_timeout)
    }

    fn build(
        base_url: &str,
        session: SessionStore,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(ENV_API_URL, base_url).map_err(|e| match e {
            ConfigError::InvalidUrl { value, .. } => ApiError::InvalidUrl(value),
            other => ApiError::InvalidUrl(other.to_string()),
        })?;
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(connect_timeout)
                .build()?,
            base_url: base_url.into(),
            session,
            navigator: Arc::new(NoopNavigator),
        })
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn LoginNavigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn navigator(&self) -> &dyn LoginNavigator {
        self.navigator.as_ref()
    }

    /// Sends `request` with the stored bearer token and applies the refresh protocol.
    ///
    /// Non-2xx responses come back as `Ok`; only transport, storage and
    /// renewal failures are `Err`.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.authorize(&mut request).await?;
        let outcome = self.transmit(&request).await;
        match policy::evaluate(&request, &outcome) {
            Verdict::Deliver => outcome,
            Verdict::Renew => refresh::renew_and_replay(self, request, outcome?).await,
        }
    }

    async fn authorize(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        if let Some(token) = self.session.access_token().await? {
            request.set_bearer(&token)?;
        }
        Ok(())
    }

    /// Puts `request` on the wire exactly as it is.
    pub(crate) async fn transmit(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self
            .http
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await?.to_vec();

        debug!(
            method = %request.method(),
            path = request.path(),
            status = status.as_u16(),
            attempt = ?request.attempt(),
            "request completed"
        );
        Ok(ApiResponse::new(status, headers, body))
    }

    /// Exchanges a refresh token for a new pair. Sent without a bearer token.
    pub async fn request_renewal(&self, refresh_token: &str) -> Result<CredentialPair, ApiError> {
        debug!(refresh_token = %token_hint(refresh_token), "requesting token renewal");
        let request = ApiRequest::post(policy::REFRESH_PATH).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        let response = self.transmit(&request).await?.error_for_status()?;
        response.json()
    }

    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.error_for_status()?.json()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_json(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await?.error_for_status()?;
        Ok(())
    }

    pub async fn download(&self, path: &str) -> Result<Download, ApiError> {
        let response = self.send(ApiRequest::get(path)).await?.error_for_status()?;
        Ok(Download::from_response(response))
    }
}
