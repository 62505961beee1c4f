use tokio::sync::mpsc;

/// Why the client is sending the user back to the login surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub reason: String,
}

/// Hook fired when the session is terminated and the user must sign in again.
pub trait LoginNavigator: Send + Sync + 'static {
    fn redirect_to_login(&self, redirect: LoginRedirect);
}

pub struct NoopNavigator;

impl LoginNavigator for NoopNavigator {
    fn redirect_to_login(&self, _redirect: LoginRedirect) {}
}

/// Forwards redirects to whoever owns the UI.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<LoginRedirect>,
}

impl ChannelNavigator {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LoginRedirect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LoginNavigator for ChannelNavigator {
    fn redirect_to_login(&self, redirect: LoginRedirect) {
        if self.tx.send(redirect).is_err() {
            tracing::debug!("login redirect dropped; no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_navigator_delivers_redirects() {
        let (nav, mut rx) = ChannelNavigator::channel();
        nav.redirect_to_login(LoginRedirect {
            reason: "expired".to_string(),
        });
        assert_eq!(rx.recv().await.unwrap().reason, "expired");
    }

    #[test]
    fn channel_navigator_tolerates_closed_receiver() {
        let (nav, rx) = ChannelNavigator::channel();
        drop(rx);
        nav.redirect_to_login(LoginRedirect {
            reason: "expired".to_string(),
        });
    }
}
