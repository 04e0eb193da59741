//! Test doubles for the session ports
//!
//! Scripted, in-process implementations used by the unit tests here and by
//! the integration suites of downstream crates.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crmchat_domain::{UserInfo, VendorUser};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::ports::{
    IdentityClient, IdentityError, IdentityEvent, KeyValueStorage, Navigator, ProfileClient,
    ProfileError, StorageError,
};

/// Scripted identity client
///
/// `signin_silent` pops results pushed with
/// [`push_silent_result`](Self::push_silent_result); an empty queue answers
/// with a transport error.
pub struct MockIdentityClient {
    silent_results: Mutex<VecDeque<Result<Option<VendorUser>, IdentityError>>>,
    silent_delay: Mutex<Duration>,
    silent_calls: AtomicUsize,
    silent_tokens: Mutex<Vec<String>>,
    callback_result: Mutex<Option<Result<VendorUser, IdentityError>>>,
    redirect_error: Mutex<Option<IdentityError>>,
    redirect_calls: AtomicUsize,
    signout_calls: AtomicUsize,
    stored_user: Mutex<Option<VendorUser>>,
    get_user_error: Mutex<Option<IdentityError>>,
    events: broadcast::Sender<IdentityEvent>,
}

impl MockIdentityClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            silent_results: Mutex::new(VecDeque::new()),
            silent_delay: Mutex::new(Duration::ZERO),
            silent_calls: AtomicUsize::new(0),
            silent_tokens: Mutex::new(Vec::new()),
            callback_result: Mutex::new(None),
            redirect_error: Mutex::new(None),
            redirect_calls: AtomicUsize::new(0),
            signout_calls: AtomicUsize::new(0),
            stored_user: Mutex::new(None),
            get_user_error: Mutex::new(None),
            events,
        }
    }

    pub fn push_silent_result(&self, result: Result<Option<VendorUser>, IdentityError>) {
        self.silent_results.lock().push_back(result);
    }

    /// Make every `signin_silent` call wait this long before answering
    pub fn set_silent_delay(&self, delay: Duration) {
        *self.silent_delay.lock() = delay;
    }

    pub fn silent_calls(&self) -> usize {
        self.silent_calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens passed to `signin_silent`, in call order
    pub fn silent_tokens(&self) -> Vec<String> {
        self.silent_tokens.lock().clone()
    }

    pub fn set_callback_result(&self, result: Result<VendorUser, IdentityError>) {
        *self.callback_result.lock() = Some(result);
    }

    pub fn fail_redirects_with(&self, error: IdentityError) {
        *self.redirect_error.lock() = Some(error);
    }

    pub fn redirect_calls(&self) -> usize {
        self.redirect_calls.load(Ordering::SeqCst)
    }

    pub fn signout_calls(&self) -> usize {
        self.signout_calls.load(Ordering::SeqCst)
    }

    pub fn set_stored_user(&self, user: Option<VendorUser>) {
        *self.stored_user.lock() = user;
    }

    pub fn fail_get_user_with(&self, error: IdentityError) {
        *self.get_user_error.lock() = Some(error);
    }

    /// Broadcast an event to subscribers; returns the receiver count
    pub fn emit(&self, event: IdentityEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for MockIdentityClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn signin_redirect(&self, state: Option<&str>) -> Result<String, IdentityError> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.redirect_error.lock().clone() {
            return Err(err);
        }
        Ok(format!(
            "https://id.example.test/authorize?client_id=crmchat&state={}",
            state.unwrap_or("mock-state")
        ))
    }

    async fn signin_redirect_callback(
        &self,
        _callback_url: &str,
    ) -> Result<VendorUser, IdentityError> {
        let result = self
            .callback_result
            .lock()
            .take()
            .unwrap_or_else(|| Err(IdentityError::InvalidCallback("no scripted callback".into())));
        if let Ok(user) = &result {
            *self.stored_user.lock() = Some(user.clone());
        }
        result
    }

    async fn signin_silent(
        &self,
        refresh_token: &str,
    ) -> Result<Option<VendorUser>, IdentityError> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);
        self.silent_tokens.lock().push(refresh_token.to_string());

        let delay = *self.silent_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .silent_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(IdentityError::Transport("no scripted response".into())));
        if let Ok(Some(user)) = &result {
            *self.stored_user.lock() = Some(user.clone());
        }
        result
    }

    async fn signout_redirect(&self, id_token_hint: Option<&str>) -> Result<String, IdentityError> {
        self.signout_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.redirect_error.lock().clone() {
            return Err(err);
        }
        Ok(match id_token_hint {
            Some(hint) => format!("https://id.example.test/logout?id_token_hint={hint}"),
            None => "https://id.example.test/logout".to_string(),
        })
    }

    async fn get_user(&self) -> Result<Option<VendorUser>, IdentityError> {
        if let Some(err) = self.get_user_error.lock().clone() {
            return Err(err);
        }
        Ok(self.stored_user.lock().clone())
    }

    async fn remove_user(&self) -> Result<(), IdentityError> {
        *self.stored_user.lock() = None;
        let _ = self.events.send(IdentityEvent::UserUnloaded);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.events.subscribe()
    }
}

/// Profile endpoint double answering with a fixed `UserInfo`
pub struct MockProfileClient {
    response: Mutex<Result<UserInfo, ProfileError>>,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl MockProfileClient {
    pub fn new() -> Self {
        Self::with_user_info(UserInfo {
            id: "user-1".into(),
            email: Some("ada@example.com".into()),
            nickname: Some("ada".into()),
            ..UserInfo::default()
        })
    }

    pub fn with_user_info(info: UserInfo) -> Self {
        Self { response: Mutex::new(Ok(info)), calls: AtomicUsize::new(0), last_token: Mutex::new(None) }
    }

    pub fn fail_with(&self, error: ProfileError) {
        *self.response.lock() = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }
}

impl Default for MockProfileClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileClient for MockProfileClient {
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock() = Some(access_token.to_string());
        self.response.lock().clone()
    }
}

/// Key/value store kept in a `HashMap`, with optional write failures
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a key without going through the trait
    pub fn get(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    pub fn set_failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl KeyValueStorage for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Navigator that records every target
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visits.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visits.lock().push(url.to_string());
    }
}
