use crate::client::ApiClient;
use crate::error::ApiError;
use crate::refresh;
use crate::refresh::policy::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, REGISTER_PATH};
use crate::request::ApiRequest;
use crate::state::Rotation;
use crate::types::{
    AuthResponse, CredentialPair, LoginRequest, LogoutRequest, MessageResponse, RegisterRequest,
    SessionUser,
};
use tracing::{info, warn};

/// Credential lifecycle on top of [`ApiClient`]: sign in, sign up, renew, sign out.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<SessionUser, ApiError> {
        request.validate().map_err(ApiError::Validation)?;
        let response: AuthResponse = self
            .client
            .execute_json(ApiRequest::post(LOGIN_PATH).json(request)?)
            .await?;
        self.start_session(response).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<SessionUser, ApiError> {
        request.validate().map_err(ApiError::Validation)?;
        let response: AuthResponse = self
            .client
            .execute_json(ApiRequest::post(REGISTER_PATH).json(request)?)
            .await?;
        self.start_session(response).await
    }

    async fn start_session(&self, response: AuthResponse) -> Result<SessionUser, ApiError> {
        let pair = response.credentials();
        self.client.session().begin(&pair, &response.user).await?;
        info!(
            user_id = %response.user.id,
            role = %response.user.role,
            "session started"
        );
        Ok(response.user)
    }

    /// Renews the stored pair on demand.
    pub async fn refresh(&self) -> Result<CredentialPair, ApiError> {
        let Some(refresh_token) = self.client.session().refresh_token().await? else {
            return Err(ApiError::NotAuthenticated);
        };
        let pair = match self.client.request_renewal(&refresh_token).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "explicit token renewal failed; ending session");
                refresh::end_session(&self.client, &err).await;
                return Err(err);
            }
        };
        match self.client.session().rotate(&refresh_token, &pair).await? {
            Rotation::Applied => Ok(pair),
            Rotation::Superseded(current) => Ok(current),
            Rotation::Ended => Err(ApiError::NotAuthenticated),
        }
    }

    /// Signs out on the server, then always clears the local session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let refresh_token = self.client.session().refresh_token().await?;
        let request = ApiRequest::post(LOGOUT_PATH).json(&LogoutRequest { refresh_token })?;

        match self.client.execute_json::<MessageResponse>(request).await {
            Ok(res) => info!(message = %res.message, "signed out"),
            Err(e) => warn!(error = %e, "server logout failed; clearing local session anyway"),
        }

        self.client.session().clear().await?;
        Ok(())
    }

    /// Fetches the current user and refreshes the cached copy.
    pub async fn me(&self) -> Result<SessionUser, ApiError> {
        let user: SessionUser = self.client.get_json(ME_PATH).await?;
        self.client.session().set_user(&user).await?;
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<Option<SessionUser>, ApiError> {
        Ok(self.client.session().user().await?)
    }

    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.client.session().credentials().await?.is_some())
    }
}
