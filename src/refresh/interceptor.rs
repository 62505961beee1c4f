use crate::client::ApiClient;
use crate::error::ApiError;
use crate::navigation::LoginRedirect;
use crate::redact::token_hint;
use crate::request::{ApiRequest, ApiResponse};
use crate::state::Rotation;
use tracing::{debug, info, warn};

/// Renews the session once after a 401 and replays `request`.
///
/// `original` is handed back untouched when there is nothing to renew with.
/// A failed renewal ends the session and its error replaces the original one.
pub(crate) async fn renew_and_replay(
    client: &ApiClient,
    mut request: ApiRequest,
    original: ApiResponse,
) -> Result<ApiResponse, ApiError> {
    request.mark_retried();

    let Some(refresh_token) = client.session().refresh_token().await? else {
        debug!(path = request.path(), "401 without a stored refresh token");
        return Ok(original);
    };

    let pair = match client.request_renewal(&refresh_token).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(path = request.path(), error = %err, "token renewal failed; ending session");
            end_session(client, &err).await;
            return Err(err);
        }
    };

    let live_refresh = match client.session().rotate(&refresh_token, &pair).await? {
        Rotation::Applied => {
            info!(
                refresh_token = %token_hint(&pair.refresh_token),
                "session tokens renewed"
            );
            pair.refresh_token.clone()
        }
        Rotation::Superseded(current) => {
            debug!("stored session was rotated by a concurrent renewal; keeping it");
            current.refresh_token
        }
        Rotation::Ended => {
            debug!(path = request.path(), "session ended during renewal; not replaying");
            return Ok(original);
        }
    };

    // A body naming the rotated-away refresh token replays with the live one.
    if request.rebind_refresh_token(&refresh_token, &live_refresh) {
        debug!(path = request.path(), "replaying with the rotated refresh token");
    }
    request.set_bearer(&pair.access_token)?;
    client.transmit(&request).await
}

/// Clears the stored session and sends the user back to login.
pub(crate) async fn end_session(client: &ApiClient, cause: &ApiError) {
    if let Err(e) = client.session().clear().await {
        warn!(error = %e, "failed to clear session after renewal failure");
    }
    client.navigator().redirect_to_login(LoginRedirect {
        reason: cause.to_string(),
    });
}
