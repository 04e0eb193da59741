//! OIDC relying-party client over HTTP
//!
//! Authorization code flow with PKCE, refresh-token renewal and RP-initiated
//! logout against any provider that publishes a discovery document. The
//! signed-in user and the pending sign-in live in a [`KeyValueStorage`], so a
//! login started in one process can complete in another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crmchat_common::time::Clock;
use crmchat_core::{IdentityClient, IdentityError, IdentityEvent, KeyValueStorage};
use crmchat_domain::{OidcConfig, VendorUser};
use parking_lot::Mutex;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::pkce::{validate_state, PkceChallenge};
use super::types::{
    DiscoveryDocument, OAuthErrorBody, PendingSignin, ProviderEndpoints, TokenResponse,
};
use crate::errors::{InfraError, InfraResult};

/// Storage key prefix for the signed-in user
pub const USER_STORE_PREFIX: &str = "oidc.user";

/// Storage key for the sign-in awaiting its callback
pub const PENDING_SIGNIN_KEY: &str = "oidc.pending_signin";

/// `AccessTokenExpiring` fires this long before expiry
pub const EXPIRING_NOTIFICATION_SECS: i64 = 60;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CAPACITY: usize = 16;

/// HTTP implementation of [`IdentityClient`]
pub struct HttpIdentityClient {
    config: OidcConfig,
    http: Client,
    store: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    endpoints: OnceCell<ProviderEndpoints>,
    user: Mutex<Option<VendorUser>>,
    /// Bumped by `remove_user`; held while a renewed user is written
    user_epoch: Mutex<u64>,
    events: broadcast::Sender<IdentityEvent>,
    expiry_timer: Mutex<Option<JoinHandle<()>>>,
}

impl HttpIdentityClient {
    /// Create a client with a default `reqwest` client
    ///
    /// # Errors
    /// Returns [`InfraError`] if the HTTP client cannot be built.
    pub fn new(
        config: OidcConfig,
        store: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
    ) -> InfraResult<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .no_proxy()
            .user_agent(concat!("crmchat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(config, http, store, clock))
    }

    pub fn with_http_client(
        config: OidcConfig,
        http: Client,
        store: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            http,
            store,
            clock,
            endpoints: OnceCell::new(),
            user: Mutex::new(None),
            user_epoch: Mutex::new(0),
            events,
            expiry_timer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    fn ensure_configured(&self) -> Result<(), IdentityError> {
        let required = [
            ("oidc.authority", &self.config.authority),
            ("oidc.client_id", &self.config.client_id),
            ("oidc.redirect_uri", &self.config.redirect_uri),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(IdentityError::NotConfigured(format!("{field} is not set")));
            }
        }
        Ok(())
    }

    fn user_key(&self) -> String {
        format!("{USER_STORE_PREFIX}:{}:{}", self.config.issuer(), self.config.client_id)
    }

    /// Provider endpoints, from configuration or discovery
    ///
    /// Discovery runs at most once per client.
    ///
    /// # Errors
    /// Returns [`IdentityError::NotConfigured`] for an incomplete registration
    /// and a transport or response error when discovery fails.
    pub async fn endpoints(&self) -> Result<&ProviderEndpoints, IdentityError> {
        self.ensure_configured()?;
        self.endpoints.get_or_try_init(|| self.resolve_endpoints()).await
    }

    async fn resolve_endpoints(&self) -> Result<ProviderEndpoints, IdentityError> {
        let config = &self.config;
        if let (Some(authorization), Some(token)) =
            (&config.authorization_endpoint, &config.token_endpoint)
        {
            return Ok(ProviderEndpoints {
                authorization: authorization.clone(),
                token: token.clone(),
                end_session: config.end_session_endpoint.clone(),
            });
        }

        let document = self.fetch_discovery().await?;
        Ok(ProviderEndpoints {
            authorization: config
                .authorization_endpoint
                .clone()
                .unwrap_or(document.authorization_endpoint),
            token: config.token_endpoint.clone().unwrap_or(document.token_endpoint),
            end_session: config.end_session_endpoint.clone().or(document.end_session_endpoint),
        })
    }

    async fn fetch_discovery(&self) -> Result<DiscoveryDocument, IdentityError> {
        let url = format!("{}/.well-known/openid-configuration", self.config.issuer());
        debug!(url = %url, "Fetching OIDC discovery document");

        let response = self.http.get(&url).send().await.map_err(InfraError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::InvalidResponse(format!(
                "discovery document returned HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json::<DiscoveryDocument>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("invalid discovery document: {e}")))
    }

    async fn token_request(
        &self,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<TokenResponse, IdentityError> {
        let endpoints = self.endpoints().await?;
        params.push(("client_id", self.config.client_id.clone()));
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.clone()));
        }

        let response =
            self.http.post(&endpoints.token).form(&params).send().await.map_err(InfraError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(InfraError::from)?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OAuthErrorBody>(&body) {
                debug!(status = status.as_u16(), error = %error, "Token endpoint returned an error");
                return Err(IdentityError::provider(error.error, error.error_description));
            }
            return Err(IdentityError::InvalidResponse(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| IdentityError::InvalidResponse(format!("invalid token response: {e}")))
    }

    fn current_user(&self) -> Option<VendorUser> {
        if let Some(user) = self.user.lock().clone() {
            return Some(user);
        }

        let raw = match self.store.get_item(&self.user_key()) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "Failed to read stored user");
                return None;
            }
        };
        match serde_json::from_str::<VendorUser>(&raw) {
            Ok(user) => {
                *self.user.lock() = Some(user.clone());
                Some(user)
            }
            Err(err) => {
                warn!(error = %err, "Discarding unreadable stored user");
                None
            }
        }
    }

    fn store_user(&self, user: &VendorUser) -> Result<(), IdentityError> {
        let json = serde_json::to_string(user)
            .map_err(|e| IdentityError::Storage(format!("cannot serialize user: {e}")))?;
        self.store
            .set_item(&self.user_key(), &json)
            .map_err(|e| IdentityError::Storage(e.to_string()))?;

        *self.user.lock() = Some(user.clone());
        self.arm_expiry_notifications(user);
        let _ = self.events.send(IdentityEvent::UserLoaded(user.clone()));
        Ok(())
    }

    fn save_pending(&self, pending: &PendingSignin) -> Result<(), IdentityError> {
        let json = serde_json::to_string(pending)
            .map_err(|e| IdentityError::Storage(format!("cannot serialize sign-in: {e}")))?;
        self.store
            .set_item(PENDING_SIGNIN_KEY, &json)
            .map_err(|e| IdentityError::Storage(e.to_string()))
    }

    /// Read and delete the pending sign-in
    fn take_pending(&self) -> Result<Option<PendingSignin>, IdentityError> {
        let raw = self
            .store
            .get_item(PENDING_SIGNIN_KEY)
            .map_err(|e| IdentityError::Storage(e.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Err(err) = self.store.remove_item(PENDING_SIGNIN_KEY) {
            warn!(error = %err, "Failed to remove pending sign-in");
        }

        match serde_json::from_str(&raw) {
            Ok(pending) => Ok(Some(pending)),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable pending sign-in");
                Ok(None)
            }
        }
    }

    fn arm_expiry_notifications(&self, user: &VendorUser) {
        self.cancel_expiry_notifications();
        let Some(expires_at) = user.expires_at else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            return;
        };

        let now = self.clock.unix_seconds();
        let expiring_at = expires_at.saturating_sub(EXPIRING_NOTIFICATION_SECS);
        let expiring_in = seconds_until(expiring_at, now);
        let expired_in = seconds_until(expires_at, now);
        let events = self.events.clone();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(expiring_in).await;
            let _ = events.send(IdentityEvent::AccessTokenExpiring);
            tokio::time::sleep(expired_in.saturating_sub(expiring_in)).await;
            let _ = events.send(IdentityEvent::AccessTokenExpired);
        });
        *self.expiry_timer.lock() = Some(handle);
    }

    fn cancel_expiry_notifications(&self) {
        if let Some(handle) = self.expiry_timer.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for HttpIdentityClient {
    fn drop(&mut self) {
        self.cancel_expiry_notifications();
    }
}

fn seconds_until(at: i64, now: i64) -> Duration {
    Duration::from_secs(u64::try_from(at.saturating_sub(now)).unwrap_or(0))
}

/// Append query parameters to an endpoint that may already carry some
fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn signin_redirect(&self, state: Option<&str>) -> Result<String, IdentityError> {
        let endpoints = self.endpoints().await?;
        let pkce = PkceChallenge::generate();
        let scope = self.config.scope_list().join(" ");

        let url = append_query(
            &endpoints.authorization,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", pkce.state.as_str()),
                ("code_challenge", pkce.code_challenge.as_str()),
                ("code_challenge_method", pkce.challenge_method()),
            ],
        );

        self.save_pending(&PendingSignin {
            pkce,
            data: state.map(str::to_string),
            created_at: self.clock.unix_seconds(),
        })?;
        info!("Authorization request prepared");
        Ok(url)
    }

    async fn signin_redirect_callback(
        &self,
        callback_url: &str,
    ) -> Result<VendorUser, IdentityError> {
        self.ensure_configured()?;
        let url = Url::parse(callback_url)
            .map_err(|e| IdentityError::InvalidCallback(format!("unparsable callback URL: {e}")))?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(code) = params.get("error") {
            self.take_pending()?;
            return Err(IdentityError::provider(
                code.clone(),
                params.get("error_description").cloned(),
            ));
        }

        let state = params
            .get("state")
            .ok_or_else(|| IdentityError::InvalidCallback("missing state parameter".into()))?;
        let code = params
            .get("code")
            .ok_or_else(|| IdentityError::InvalidCallback("missing code parameter".into()))?;

        let pending = self.take_pending()?.ok_or(IdentityError::StateMismatch)?;
        if !validate_state(&pending.pkce.state, state) {
            warn!("Callback state does not match the pending sign-in");
            return Err(IdentityError::StateMismatch);
        }

        let response = self
            .token_request(vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", code.clone()),
                ("redirect_uri", self.config.redirect_uri.clone()),
                ("code_verifier", pending.pkce.code_verifier),
            ])
            .await?;

        let user = response.into_user(self.clock.unix_seconds(), None);
        if user.access_token.is_empty() {
            return Err(IdentityError::InvalidResponse("token response has no access token".into()));
        }
        self.store_user(&user)?;
        info!(
            subject = user.subject().unwrap_or("unknown"),
            expires_at = user.expires_at,
            "Authorization code exchanged"
        );
        Ok(user)
    }

    async fn signin_silent(
        &self,
        refresh_token: &str,
    ) -> Result<Option<VendorUser>, IdentityError> {
        if refresh_token.is_empty() {
            return Err(IdentityError::provider(
                "invalid_grant",
                Some("refresh token is empty".into()),
            ));
        }

        let epoch = *self.user_epoch.lock();
        let previous = self.current_user();
        let response = self
            .token_request(vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token.to_string()),
            ])
            .await?;

        let user = response.into_user(self.clock.unix_seconds(), previous.as_ref());
        if user.access_token.is_empty() {
            warn!("Refresh grant returned no access token");
            return Ok(None);
        }

        {
            let current = self.user_epoch.lock();
            if *current != epoch {
                debug!("User removed during refresh grant, dropping renewed tokens");
                return Ok(None);
            }
            self.store_user(&user)?;
        }
        debug!(expires_at = user.expires_at, "Refresh grant completed");
        Ok(Some(user))
    }

    async fn signout_redirect(&self, id_token_hint: Option<&str>) -> Result<String, IdentityError> {
        let endpoints = self.endpoints().await?;
        let Some(end_session) = &endpoints.end_session else {
            return Err(IdentityError::NotConfigured(
                "provider has no end_session_endpoint".into(),
            ));
        };

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(3);
        if let Some(hint) = id_token_hint {
            params.push(("id_token_hint", hint));
        }
        params.push(("client_id", self.config.client_id.as_str()));
        if let Some(redirect) = &self.config.post_logout_redirect_uri {
            params.push(("post_logout_redirect_uri", redirect.as_str()));
        }
        Ok(append_query(end_session, &params))
    }

    async fn get_user(&self) -> Result<Option<VendorUser>, IdentityError> {
        self.ensure_configured()?;
        Ok(self.current_user())
    }

    async fn remove_user(&self) -> Result<(), IdentityError> {
        {
            let mut epoch = self.user_epoch.lock();
            *epoch += 1;
            self.cancel_expiry_notifications();
            *self.user.lock() = None;
            self.store
                .remove_item(&self.user_key())
                .map_err(|e| IdentityError::Storage(e.to_string()))?;
        }
        let _ = self.events.send(IdentityEvent::UserUnloaded);
        info!("Stored user removed");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.events.subscribe()
    }
}
