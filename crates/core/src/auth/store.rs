//! Session store
//!
//! Single logical instance per application, shared through cheap clones of
//! [`SessionStore`]. All state lives behind one mutex that is never held
//! across an await point. Mutations go through:
//!
//! - [`SessionStore::set_user`]: the only way a user enters the session
//! - [`SessionStore::refresh_tokens`]: silent renewal, guarded by
//!   `is_refreshing`
//! - [`SessionStore::clear_state`]: logout or unrecoverable refresh failure
//!
//! Each `clear_state` bumps a generation counter. Refresh and profile
//! requests capture the generation when they start and drop their result if
//! it changed, so a request that outlives a logout cannot bring the session
//! back.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crmchat_common::error::ErrorClassification;
use crmchat_common::time::Clock;
use crmchat_domain::constants::{DURABLE_STORAGE_KEY, REFRESH_LEEWAY_SECS};
use crmchat_domain::{PersistedSession, SessionError, TokenInfo, UserInfo, VendorUser};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::scheduler::{refresh_delay, RefreshScheduler};
use super::token_info::extract_token_info;
use crate::ports::{IdentityClient, KeyValueStorage, ProfileClient};

/// In-memory session state
///
/// `token_info` is `Some` exactly when `is_authenticated` is true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<VendorUser>,
    pub user_info: Option<UserInfo>,
    pub token_info: Option<TokenInfo>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub error: Option<SessionError>,
    /// Unix seconds of the last successful refresh
    pub last_refresh_time: Option<i64>,
}

impl SessionState {
    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            user_info: self.user_info.clone(),
            token_info: self.token_info.clone(),
            is_authenticated: self.is_authenticated,
            last_refresh_time: self.last_refresh_time,
        }
    }
}

/// Collaborators the store needs
pub struct SessionStoreDeps {
    pub identity: Arc<dyn IdentityClient>,
    pub profile: Option<Arc<dyn ProfileClient>>,
    pub durable: Arc<dyn KeyValueStorage>,
    pub clock: Arc<dyn Clock>,
}

struct Inner {
    identity: Arc<dyn IdentityClient>,
    profile: Option<Arc<dyn ProfileClient>>,
    durable: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    refresh_leeway_secs: i64,
    state: Mutex<SessionState>,
    scheduler: RefreshScheduler,
    generation: AtomicU64,
    events_attached: AtomicBool,
}

/// Handle to the session store
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

/// Non-owning handle held by timers and background tasks
#[derive(Clone)]
pub struct WeakSessionStore {
    inner: Weak<Inner>,
}

impl WeakSessionStore {
    pub fn upgrade(&self) -> Option<SessionStore> {
        self.inner.upgrade().map(|inner| SessionStore { inner })
    }
}

impl SessionStore {
    pub fn new(deps: SessionStoreDeps) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity: deps.identity,
                profile: deps.profile,
                durable: deps.durable,
                clock: deps.clock,
                refresh_leeway_secs: REFRESH_LEEWAY_SECS,
                state: Mutex::new(SessionState::default()),
                scheduler: RefreshScheduler::new(),
                generation: AtomicU64::new(0),
                events_attached: AtomicBool::new(false),
            }),
        }
    }

    /// Override the refresh leeway (seconds before expiry)
    #[must_use]
    pub fn with_refresh_leeway(self, leeway_secs: i64) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.refresh_leeway_secs = leeway_secs;
                Self { inner: Arc::new(inner) }
            }
            Err(inner) => {
                warn!("Store already shared, refresh leeway unchanged");
                Self { inner }
            }
        }
    }

    pub fn downgrade(&self) -> WeakSessionStore {
        WeakSessionStore { inner: Arc::downgrade(&self.inner) }
    }

    pub(crate) fn identity(&self) -> &Arc<dyn IdentityClient> {
        &self.inner.identity
    }

    /// Claim the single event subscription slot; `false` if already taken
    pub(crate) fn mark_events_attached(&self) -> bool {
        !self.inner.events_attached.swap(true, Ordering::SeqCst)
    }

    fn now(&self) -> i64 {
        self.inner.clock.unix_seconds()
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Replace the current user
    ///
    /// Derives the token record and `is_authenticated`, clears the error, and
    /// either arms the refresh timer and starts a background profile fetch or
    /// cancels any pending timer. The state update itself never suspends.
    pub fn set_user(&self, user: Option<VendorUser>) {
        let token_info = user.as_ref().and_then(extract_token_info);
        let is_authenticated = user.is_some() && token_info.is_some();
        let access_token = token_info.as_ref().map(|t| t.access_token.clone());

        {
            let mut state = self.inner.state.lock();
            state.user = user;
            state.token_info = token_info;
            state.is_authenticated = is_authenticated;
            state.error = None;
        }

        if is_authenticated {
            self.schedule_token_refresh();
            if let Some(access_token) = access_token {
                self.spawn_user_info_fetch(access_token);
            }
        } else {
            self.clear_refresh_timer();
        }

        self.persist();
        debug!(is_authenticated, "Session user updated");
    }

    /// Arm the refresh timer from the current token expiry
    ///
    /// Always cancels the previous timer first; does nothing else when there
    /// is no token record.
    pub fn schedule_token_refresh(&self) {
        self.inner.scheduler.cancel();

        let Some(expires_at) = self.inner.state.lock().token_info.as_ref().map(|t| t.expires_at)
        else {
            return;
        };

        let now = self.now();
        let delay = refresh_delay(expires_at, now, self.inner.refresh_leeway_secs);
        let weak = self.downgrade();
        let armed = self.inner.scheduler.arm(delay, async move {
            if let Some(store) = weak.upgrade() {
                debug!("Refresh timer fired");
                store.refresh_tokens().await;
            }
        });

        if armed {
            info!(expires_at, delay_secs = delay.as_secs(), "Scheduled token refresh");
        }
    }

    /// Cancel the pending refresh timer. Idempotent.
    pub fn clear_refresh_timer(&self) {
        self.inner.scheduler.cancel();
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    /// Silently renew the tokens
    ///
    /// Returns `true` only when a new user with an access token was stored.
    /// A call made while another refresh is in flight returns `false` without
    /// contacting the provider. A failure carrying `login_required` clears the
    /// whole session and the identity client's user; any other failure leaves
    /// the current state in place.
    pub async fn refresh_tokens(&self) -> bool {
        let (refresh_token, generation) = {
            let mut state = self.inner.state.lock();
            if state.is_refreshing {
                debug!("Token refresh already in progress");
                return false;
            }

            let Some(refresh_token) = state
                .token_info
                .as_ref()
                .and_then(|t| t.refresh_token.clone())
                .filter(|t| !t.is_empty())
            else {
                warn!("No refresh token available, cannot refresh");
                return false;
            };

            state.is_refreshing = true;
            (refresh_token, self.generation())
        };

        info!(generation, "Refreshing tokens");
        let outcome = self.inner.identity.signin_silent(&refresh_token).await;

        if self.generation() != generation {
            debug!(
                started = generation,
                current = self.generation(),
                "Session cleared during refresh, discarding result"
            );
            return false;
        }

        match outcome {
            Ok(Some(user)) if !user.access_token.is_empty() => {
                self.set_user(Some(user));
                let now = self.now();
                {
                    let mut state = self.inner.state.lock();
                    state.last_refresh_time = Some(now);
                    state.is_refreshing = false;
                }
                self.persist();
                info!(last_refresh_time = now, "Tokens refreshed");
                true
            }
            Ok(_) => {
                warn!("Silent renewal returned no usable user");
                self.finish_failed_refresh(SessionError::Refresh(
                    "silent renewal returned no user".into(),
                ));
                false
            }
            Err(err) => {
                let session_err = SessionError::refresh_failure(err.to_string());
                let requires_login = session_err.requires_login() || err.requires_login();
                self.finish_failed_refresh(session_err);

                if requires_login {
                    warn!(error = %err, "Provider requires interactive login, clearing session");
                    self.clear_state();
                    if let Err(err) = self.inner.identity.remove_user().await {
                        warn!(error = %err, "Failed to remove identity client user");
                    }
                } else {
                    warn!(
                        error = %err,
                        retryable = err.is_retryable(),
                        severity = %err.severity(),
                        "Token refresh failed"
                    );
                }
                false
            }
        }
    }

    fn finish_failed_refresh(&self, error: SessionError) {
        let mut state = self.inner.state.lock();
        state.is_refreshing = false;
        state.error = Some(error);
    }

    /// A usable access token, or `None`
    ///
    /// Expired tokens are refreshed before returning. Tokens inside the
    /// refresh leeway are returned as-is while a background refresh runs, so
    /// the next call may see a newer token.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        let (access_token, expired, expiring) = {
            let state = self.inner.state.lock();
            let info = state.token_info.as_ref()?;
            let now = self.now();
            (
                info.access_token.clone(),
                info.is_expired(now),
                info.expires_within(now, self.inner.refresh_leeway_secs),
            )
        };

        if expired {
            debug!("Access token expired, refreshing before use");
            if self.refresh_tokens().await {
                return self.inner.state.lock().token_info.as_ref().map(|t| t.access_token.clone());
            }
            return None;
        }

        if expiring {
            debug!("Access token expiring soon, refreshing in background");
            let weak = self.downgrade();
            spawn_detached(async move {
                if let Some(store) = weak.upgrade() {
                    store.refresh_tokens().await;
                }
            });
        }

        Some(access_token)
    }

    /// Reset every field, cancel the timer, and drop the persisted blob
    pub fn clear_state(&self) {
        self.clear_refresh_timer();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.state.lock() = SessionState::default();

        if let Err(err) = self.inner.durable.remove_item(DURABLE_STORAGE_KEY) {
            warn!(error = %err, "Failed to remove persisted session");
        }
        info!(generation, "Session state cleared");
    }

    /// Populate the session from the identity client's stored user
    ///
    /// # Errors
    /// Returns [`SessionError::Initialization`] when the identity client
    /// cannot be read; the error is also stored.
    pub async fn load_user(&self) -> Result<bool, SessionError> {
        self.set_loading(true);
        match self.inner.identity.get_user().await {
            Ok(user) => {
                self.set_user(user);
                self.set_loading(false);
                Ok(self.is_authenticated())
            }
            Err(err) => {
                let err = SessionError::Initialization(err.to_string());
                warn!(error = %err, "Failed to load user");
                let mut state = self.inner.state.lock();
                state.error = Some(err.clone());
                state.is_loading = false;
                Err(err)
            }
        }
    }

    /// Fetch the backend profile for the current token
    ///
    /// Returns `None` when unauthenticated, when no profile endpoint is
    /// configured, or on failure (stored as [`SessionError::Profile`]).
    pub async fn load_user_info(&self) -> Option<UserInfo> {
        let access_token = self.inner.state.lock().token_info.as_ref()?.access_token.clone();
        let Some(profile) = self.inner.profile.clone() else {
            debug!("No profile client configured");
            return None;
        };

        let generation = self.generation();
        match profile.fetch_user_info(&access_token).await {
            Ok(info) => {
                if self.generation() != generation {
                    debug!("Session cleared during profile fetch, discarding result");
                    return None;
                }
                self.inner.state.lock().user_info = Some(info.clone());
                self.persist();
                Some(info)
            }
            Err(err) => {
                warn!(error = %err, "Failed to load user info");
                self.set_error(Some(SessionError::Profile(err.to_string())));
                None
            }
        }
    }

    fn spawn_user_info_fetch(&self, access_token: String) {
        let Some(profile) = self.inner.profile.clone() else {
            return;
        };
        let generation = self.generation();
        let weak = self.downgrade();

        spawn_detached(async move {
            let result = profile.fetch_user_info(&access_token).await;
            let Some(store) = weak.upgrade() else {
                return;
            };
            if store.generation() != generation {
                debug!("Session cleared during profile fetch, discarding result");
                return;
            }
            match result {
                Ok(info) => {
                    {
                        let mut state = store.inner.state.lock();
                        // The user may have changed while the request was out
                        if state.token_info.as_ref().map(|t| t.access_token.as_str())
                            != Some(access_token.as_str())
                        {
                            return;
                        }
                        state.user_info = Some(info);
                    }
                    store.persist();
                    debug!("User info loaded");
                }
                Err(err) => warn!(error = %err, "Background user info fetch failed"),
            }
        });
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn persist(&self) {
        let blob = self.inner.state.lock().to_persisted();
        let json = match serde_json::to_string(&blob) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "Failed to serialize session");
                return;
            }
        };
        if let Err(err) = self.inner.durable.set_item(DURABLE_STORAGE_KEY, &json) {
            warn!(error = %err, "Failed to persist session");
        }
    }

    /// Restore the persisted session
    ///
    /// Re-arms exactly one refresh timer when the restored session is
    /// authenticated. Unreadable blobs are ignored. Returns whether the
    /// restored session is authenticated.
    pub fn rehydrate(&self) -> bool {
        let raw = match self.inner.durable.get_item(DURABLE_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted session");
                return false;
            }
            Err(err) => {
                warn!(error = %err, "Failed to read persisted session");
                return false;
            }
        };

        let blob: PersistedSession = match serde_json::from_str(&raw) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable persisted session");
                return false;
            }
        };

        let is_authenticated =
            blob.is_authenticated && blob.user.is_some() && blob.token_info.is_some();
        {
            let mut state = self.inner.state.lock();
            state.user = blob.user;
            state.user_info = blob.user_info;
            state.token_info = if is_authenticated { blob.token_info } else { None };
            state.is_authenticated = is_authenticated;
            state.last_refresh_time = blob.last_refresh_time;
        }

        if is_authenticated {
            self.schedule_token_refresh();
        }
        info!(is_authenticated, "Session rehydrated");
        is_authenticated
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().is_authenticated
    }

    pub fn token_info(&self) -> Option<TokenInfo> {
        self.inner.state.lock().token_info.clone()
    }

    pub fn user(&self) -> Option<VendorUser> {
        self.inner.state.lock().user.clone()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.inner.state.lock().user_info.clone()
    }

    pub fn error(&self) -> Option<SessionError> {
        self.inner.state.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().is_loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().is_refreshing
    }

    pub fn last_refresh_time(&self) -> Option<i64> {
        self.inner.state.lock().last_refresh_time
    }

    /// Seconds until the access token expires, negative once expired
    pub fn access_token_expires_in(&self) -> Option<i64> {
        let now = self.now();
        self.inner.state.lock().token_info.as_ref().map(|t| t.seconds_until_expiry(now))
    }

    pub fn is_token_expiring_soon(&self) -> bool {
        let now = self.now();
        self.inner
            .state
            .lock()
            .token_info
            .as_ref()
            .is_some_and(|t| t.expires_within(now, self.inner.refresh_leeway_secs))
    }

    /// Incremented on every `clear_state`
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn set_error(&self, error: Option<SessionError>) {
        self.inner.state.lock().error = error;
    }

    pub fn set_loading(&self, loading: bool) {
        self.inner.state.lock().is_loading = loading;
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &state.is_authenticated)
            .field("is_refreshing", &state.is_refreshing)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

/// Spawn on the current runtime, or log and drop the task without one
fn spawn_detached<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => debug!("No async runtime available, background task skipped"),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::store.
    use std::time::Duration;

    use crmchat_common::time::MockClock;

    use super::*;
    use crate::ports::IdentityError;
    use crate::testing::{MemoryKeyValueStore, MockIdentityClient, MockProfileClient};

    const NOW: i64 = 1_700_000_000;

    struct Harness {
        store: SessionStore,
        identity: Arc<MockIdentityClient>,
        profile: Arc<MockProfileClient>,
        durable: Arc<MemoryKeyValueStore>,
    }

    fn harness() -> Harness {
        let identity = Arc::new(MockIdentityClient::new());
        let profile = Arc::new(MockProfileClient::new());
        let durable = Arc::new(MemoryKeyValueStore::new());
        let store = SessionStore::new(SessionStoreDeps {
            identity: identity.clone(),
            profile: Some(profile.clone()),
            durable: durable.clone(),
            clock: Arc::new(MockClock::at_unix_seconds(NOW)),
        });
        Harness { store, identity, profile, durable }
    }

    fn user(access: &str, expires_at: i64) -> VendorUser {
        VendorUser::new(access)
            .with_refresh_token("r1")
            .with_expires_at(expires_at)
            .with_scope("openid profile")
    }

    /// Validates `SessionStore::set_user` behavior for a valid user.
    ///
    /// Assertions:
    /// - Ensures the session is authenticated with parsed scopes.
    /// - Ensures a refresh timer is armed and the blob is persisted.
    /// - Confirms the background profile fetch stores user info.
    #[tokio::test(start_paused = true)]
    async fn test_set_user_authenticates_and_arms() {
        let h = harness();
        h.store.set_user(Some(user("abc", NOW + 3_600)));

        assert!(h.store.is_authenticated());
        assert_eq!(h.store.token_info().unwrap().scopes, vec!["openid", "profile"]);
        assert!(h.store.is_refresh_scheduled());
        assert!(h.durable.get(DURABLE_STORAGE_KEY).unwrap().contains("\"isAuthenticated\":true"));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.profile.calls(), 1);
        assert_eq!(h.store.user_info().map(|i| i.id), Some("user-1".to_string()));
    }

    /// Validates `SessionStore::set_user` behavior for a user without an
    /// access token.
    ///
    /// Assertions:
    /// - Ensures the session is unauthenticated with no token record.
    /// - Ensures no timer remains armed.
    #[tokio::test(start_paused = true)]
    async fn test_set_user_without_token_is_unauthenticated() {
        let h = harness();
        h.store.set_user(Some(user("abc", NOW + 3_600)));
        h.store.set_user(Some(VendorUser::default().with_refresh_token("r1")));

        assert!(!h.store.is_authenticated());
        assert!(h.store.token_info().is_none());
        assert!(!h.store.is_refresh_scheduled());
    }

    /// Validates `SessionStore::refresh_tokens` behavior for a recoverable
    /// failure.
    ///
    /// Assertions:
    /// - Confirms the call returns false and stores a `Refresh` error.
    /// - Ensures the token record is untouched and the lock released.
    #[tokio::test(start_paused = true)]
    async fn test_recoverable_refresh_failure_keeps_state() {
        let h = harness();
        h.store.set_user(Some(user("abc", NOW + 3_600)));
        h.identity.push_silent_result(Err(IdentityError::Transport("timeout".into())));

        assert!(!h.store.refresh_tokens().await);
        assert_eq!(h.store.token_info().unwrap().access_token, "abc");
        assert!(matches!(h.store.error(), Some(SessionError::Refresh(_))));
        assert!(!h.store.is_refreshing());
    }

    /// Validates that a refresh completing after `clear_state` is discarded.
    ///
    /// Assertions:
    /// - Confirms the stale refresh returns false.
    /// - Ensures the store stays cleared.
    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_discarded() {
        let h = harness();
        h.store.set_user(Some(user("abc", NOW + 3_600)));
        h.identity.set_silent_delay(Duration::from_secs(5));
        h.identity.push_silent_result(Ok(Some(user("fresh", NOW + 7_200))));

        let store = h.store.clone();
        let pending = tokio::spawn(async move { store.refresh_tokens().await });
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(h.store.is_refreshing());

        h.store.clear_state();
        assert!(!pending.await.unwrap());

        assert!(h.store.user().is_none());
        assert!(!h.store.is_authenticated());
        assert_eq!(h.store.generation(), 1);
        assert!(h.durable.get(DURABLE_STORAGE_KEY).is_none());
    }

    /// Validates `SessionStore::get_valid_access_token` behavior for the
    /// expiring-soon branch.
    ///
    /// Assertions:
    /// - Confirms the current token is returned immediately.
    /// - Confirms a later read observes the refreshed token.
    #[tokio::test(start_paused = true)]
    async fn test_expiring_token_returned_then_refreshed() {
        let h = harness();
        h.store.set_user(Some(user("soon", NOW + 120)));
        h.store.clear_refresh_timer();
        h.identity.push_silent_result(Ok(Some(user("fresh", NOW + 3_600))));

        assert_eq!(h.store.get_valid_access_token().await.as_deref(), Some("soon"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.identity.silent_calls(), 1);
        assert_eq!(h.store.get_valid_access_token().await.as_deref(), Some("fresh"));
        assert_eq!(h.store.last_refresh_time(), Some(NOW));
    }

    /// Validates token reads for a stored `expires_at` at the edge of `i64`.
    ///
    /// Assertions:
    /// - Ensures the expiry getters saturate instead of overflowing.
    /// - Confirms the expired token is renewed before it is returned.
    #[tokio::test(start_paused = true)]
    async fn test_extreme_expiry_is_renewed() {
        let h = harness();
        h.store.set_user(Some(user("ancient", i64::MIN)));
        h.store.clear_refresh_timer();
        h.identity.push_silent_result(Ok(Some(user("fresh", i64::MAX))));

        assert_eq!(h.store.access_token_expires_in(), Some(i64::MIN));
        assert!(h.store.is_token_expiring_soon());
        assert_eq!(h.store.get_valid_access_token().await.as_deref(), Some("fresh"));
        assert_eq!(h.store.access_token_expires_in(), Some(i64::MAX - NOW));
        assert!(!h.store.is_token_expiring_soon());
        h.store.clear_refresh_timer();
    }

    /// Validates `SessionStore::rehydrate` behavior for an unreadable blob.
    ///
    /// Assertions:
    /// - Confirms rehydrate reports unauthenticated and arms nothing.
    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_ignores_garbage() {
        let h = harness();
        h.durable.set_item(DURABLE_STORAGE_KEY, "{not json").unwrap();
        assert!(!h.store.rehydrate());
        assert!(!h.store.is_refresh_scheduled());
    }

    /// Validates `SessionStore::load_user_info` behavior for a failing
    /// endpoint.
    ///
    /// Assertions:
    /// - Confirms `None` is returned and a `Profile` error is stored.
    #[tokio::test(start_paused = true)]
    async fn test_load_user_info_failure_sets_error() {
        let h = harness();
        h.store.set_user(Some(user("abc", NOW + 3_600)));
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.profile.fail_with(crate::ports::ProfileError::Status { status: 500, body: "boom".into() });

        assert!(h.store.load_user_info().await.is_none());
        assert!(matches!(h.store.error(), Some(SessionError::Profile(_))));
    }
}
