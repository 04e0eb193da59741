//! Authentication façade
//!
//! What application code talks to: login, logout, a valid access token, and
//! read-only status. The session store stays behind this boundary.

use std::sync::Arc;

use crmchat_domain::constants::RETURN_URL_KEY;
use crmchat_domain::{Result, SessionError, UserInfo, VendorUser};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::callback::take_return_url;
use super::events::spawn_event_listener;
use super::store::SessionStore;
use crate::ports::{IdentityError, KeyValueStorage};

/// Authentication service
pub struct AuthService {
    store: SessionStore,
    session_storage: Arc<dyn KeyValueStorage>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: SessionStore, session_storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { store, session_storage, listener: Mutex::new(None) }
    }

    /// Restore the persisted session, attach identity events, load the user
    ///
    /// Returns whether the session is authenticated afterwards.
    ///
    /// # Errors
    /// Returns [`SessionError::Initialization`] when the identity client
    /// cannot be read. The error is also stored and loading is cleared.
    pub async fn initialize(&self) -> Result<bool> {
        self.store.set_loading(true);
        let restored = self.store.rehydrate();
        self.attach_events();

        let authenticated = self.store.load_user().await?;
        info!(restored, authenticated, "Authentication initialized");
        Ok(authenticated)
    }

    fn attach_events(&self) {
        let receiver = self.store.identity().subscribe();
        if let Some(handle) = spawn_event_listener(&self.store, receiver) {
            *self.listener.lock() = Some(handle);
        }
    }

    /// Start a login and return the authorization URL
    ///
    /// `return_url` is stashed in session storage for the callback to read.
    ///
    /// # Errors
    /// Returns [`SessionError::Initialization`] for an unconfigured identity
    /// client and [`SessionError::Login`] otherwise. Both are also stored.
    pub async fn login(&self, return_url: Option<&str>) -> Result<String> {
        self.store.set_loading(true);
        self.store.set_error(None);

        if let Some(return_url) = return_url {
            if let Err(err) = self.session_storage.set_item(RETURN_URL_KEY, return_url) {
                warn!(error = %err, "Failed to stash return URL");
            }
        }

        let result = self.store.identity().signin_redirect(None).await;
        self.store.set_loading(false);

        match result {
            Ok(url) => {
                info!("Redirecting to identity provider");
                Ok(url)
            }
            Err(err) => {
                let err = match err {
                    IdentityError::NotConfigured(msg) => SessionError::Initialization(msg),
                    other => SessionError::Login(other.to_string()),
                };
                warn!(error = %err, "Login failed");
                self.store.set_error(Some(err.clone()));
                Err(err)
            }
        }
    }

    /// End the session and return the end-session URL
    ///
    /// # Errors
    /// Returns [`SessionError::Logout`] when the end-session request cannot
    /// be built; local state is kept in that case.
    pub async fn logout(&self) -> Result<String> {
        self.store.set_loading(true);
        let id_token_hint = self.store.token_info().and_then(|t| t.id_token);
        let identity = Arc::clone(self.store.identity());

        match identity.signout_redirect(id_token_hint.as_deref()).await {
            Ok(url) => {
                if let Err(err) = identity.remove_user().await {
                    warn!(error = %err, "Failed to remove identity client user");
                }
                self.store.clear_state();
                info!("Logged out");
                Ok(url)
            }
            Err(err) => {
                let err = SessionError::Logout(err.to_string());
                warn!(error = %err, "Logout failed");
                self.store.set_error(Some(err.clone()));
                self.store.set_loading(false);
                Err(err)
            }
        }
    }

    /// See [`SessionStore::get_valid_access_token`]
    pub async fn get_valid_access_token(&self) -> Option<String> {
        self.store.get_valid_access_token().await
    }

    /// `Authorization` header value for a valid token
    pub async fn authorization_header(&self) -> Option<String> {
        let access_token = self.get_valid_access_token().await?;
        let token_type = self
            .store
            .token_info()
            .map_or_else(|| "Bearer".to_string(), |t| t.token_type);
        Some(format!("{token_type} {access_token}"))
    }

    pub async fn refresh_tokens(&self) -> bool {
        self.store.refresh_tokens().await
    }

    pub async fn load_user_info(&self) -> Option<UserInfo> {
        self.store.load_user_info().await
    }

    /// Read the stashed return URL once
    pub fn take_return_url(&self) -> Option<String> {
        take_return_url(self.session_storage.as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn user(&self) -> Option<VendorUser> {
        self.store.user()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.store.user_info()
    }

    pub fn error(&self) -> Option<SessionError> {
        self.store.error()
    }

    pub fn access_token_expires_in(&self) -> Option<i64> {
        self.store.access_token_expires_in()
    }

    pub fn is_token_expiring_soon(&self) -> bool {
        self.store.is_token_expiring_soon()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Stop background work: the event listener and the refresh timer
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
        self.store.clear_refresh_timer();
    }
}
