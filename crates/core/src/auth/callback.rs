//! Login completion
//!
//! Runs once per redirect back from the identity provider:
//! `Processing` then `Success` or `Error`. Success routes to the stashed
//! return URL after a short pause; failure routes to the default page after
//! the error delay.

use std::sync::Arc;

use crmchat_domain::constants::RETURN_URL_KEY;
use crmchat_domain::{CallbackStatus, SessionConfig, SessionError};
use tokio::sync::watch;
use tracing::{info, warn};

use super::store::SessionStore;
use crate::ports::{KeyValueStorage, Navigator};

/// Read the stashed return URL and delete it
pub fn take_return_url(storage: &dyn KeyValueStorage) -> Option<String> {
    match storage.get_item(RETURN_URL_KEY) {
        Ok(Some(url)) => {
            if let Err(err) = storage.remove_item(RETURN_URL_KEY) {
                warn!(error = %err, "Failed to remove stashed return URL");
            }
            Some(url).filter(|url| !url.is_empty())
        }
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, "Failed to read stashed return URL");
            None
        }
    }
}

/// Callback handler
pub struct CallbackFlow {
    store: SessionStore,
    session_storage: Arc<dyn KeyValueStorage>,
    navigator: Arc<dyn Navigator>,
    settings: SessionConfig,
    status: watch::Sender<CallbackStatus>,
}

impl CallbackFlow {
    pub fn new(
        store: SessionStore,
        session_storage: Arc<dyn KeyValueStorage>,
        navigator: Arc<dyn Navigator>,
        settings: SessionConfig,
    ) -> Self {
        let (status, _) = watch::channel(CallbackStatus::Processing);
        Self { store, session_storage, navigator, settings, status }
    }

    /// Observe status changes
    pub fn subscribe(&self) -> watch::Receiver<CallbackStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> CallbackStatus {
        self.status.borrow().clone()
    }

    /// Exchange the authorization response and route the user
    ///
    /// Resolves after navigation, including the configured pause.
    pub async fn run(&self, callback_url: &str) -> CallbackStatus {
        self.status.send_replace(CallbackStatus::Processing);

        match self.store.identity().signin_redirect_callback(callback_url).await {
            Ok(user) => {
                self.store.set_user(Some(user));
                self.status.send_replace(CallbackStatus::Success);
                info!("Login callback completed");

                tokio::time::sleep(self.settings.success_redirect_delay()).await;
                let target = take_return_url(self.session_storage.as_ref())
                    .unwrap_or_else(|| self.settings.default_return_url.clone());
                info!(target = %target, "Redirecting after login");
                self.navigator.navigate(&target);
                CallbackStatus::Success
            }
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "Login callback failed");
                self.store.set_error(Some(SessionError::Callback(message.clone())));
                let status = CallbackStatus::Error(message);
                self.status.send_replace(status.clone());

                tokio::time::sleep(self.settings.error_redirect_delay()).await;
                self.navigator.navigate(&self.settings.default_return_url);
                status
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::callback.
    use std::time::Duration;

    use crmchat_common::time::MockClock;
    use crmchat_domain::VendorUser;

    use super::*;
    use crate::auth::store::SessionStoreDeps;
    use crate::ports::IdentityError;
    use crate::testing::{MemoryKeyValueStore, MockIdentityClient, RecordingNavigator};

    struct Fixture {
        flow: CallbackFlow,
        identity: Arc<MockIdentityClient>,
        session: Arc<MemoryKeyValueStore>,
        navigator: Arc<RecordingNavigator>,
        store: SessionStore,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(MockIdentityClient::new());
        let session = Arc::new(MemoryKeyValueStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let store = SessionStore::new(SessionStoreDeps {
            identity: identity.clone(),
            profile: None,
            durable: Arc::new(MemoryKeyValueStore::new()),
            clock: Arc::new(MockClock::at_unix_seconds(1_000)),
        });
        let flow = CallbackFlow::new(
            store.clone(),
            session.clone(),
            navigator.clone(),
            SessionConfig::default(),
        );
        Fixture { flow, identity, session, navigator, store }
    }

    /// Validates `CallbackFlow::run` behavior for a successful exchange.
    ///
    /// Assertions:
    /// - Confirms the status reads `Success` before navigation happens.
    /// - Confirms navigation targets the stashed URL after one second.
    /// - Ensures the stash is consumed.
    #[tokio::test(start_paused = true)]
    async fn test_success_routes_to_stashed_url() {
        let f = fixture();
        f.session.set_item(RETURN_URL_KEY, "/chat?topic=7").unwrap();
        f.identity.set_callback_result(Ok(VendorUser::new("abc").with_expires_at(5_000)));

        let started = tokio::time::Instant::now();
        let mut status = f.flow.subscribe();
        let status_task = tokio::spawn(async move {
            status.wait_for(|s| *s == CallbackStatus::Success).await.map(|s| s.clone()).ok()
        });

        assert_eq!(f.flow.run("http://localhost/oidc/callback?code=c&state=s").await, CallbackStatus::Success);
        assert_eq!(status_task.await.unwrap(), Some(CallbackStatus::Success));
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(f.navigator.visits(), vec!["/chat?topic=7"]);
        assert!(f.session.get(RETURN_URL_KEY).is_none());
        assert!(f.store.is_authenticated());
    }

    /// Validates `CallbackFlow::run` behavior without a stashed URL.
    ///
    /// Assertions:
    /// - Confirms navigation falls back to `/`.
    #[tokio::test(start_paused = true)]
    async fn test_success_without_stash_goes_home() {
        let f = fixture();
        f.identity.set_callback_result(Ok(VendorUser::new("abc").with_expires_at(5_000)));

        f.flow.run("http://localhost/oidc/callback?code=c&state=s").await;
        assert_eq!(f.navigator.last().as_deref(), Some("/"));
    }

    /// Validates `CallbackFlow::run` behavior for a failed exchange.
    ///
    /// Assertions:
    /// - Confirms the status and the global error slot carry the message.
    /// - Confirms the redirect to `/` happens after three seconds.
    #[tokio::test(start_paused = true)]
    async fn test_failure_redirects_home_after_error_delay() {
        let f = fixture();
        f.session.set_item(RETURN_URL_KEY, "/chat").unwrap();
        f.identity.set_callback_result(Err(IdentityError::StateMismatch));

        let started = tokio::time::Instant::now();
        let status = f.flow.run("http://localhost/oidc/callback?code=c&state=forged").await;

        let expected = "State mismatch in authorization response".to_string();
        assert_eq!(status, CallbackStatus::Error(expected.clone()));
        assert_eq!(f.flow.status(), CallbackStatus::Error(expected.clone()));
        assert_eq!(f.store.error(), Some(SessionError::Callback(expected)));
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(f.navigator.visits(), vec!["/"]);
        assert!(!f.store.is_authenticated());
    }
}
