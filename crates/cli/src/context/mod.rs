//! Application context - dependency injection container

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crmchat_common::time::SystemClock;
use crmchat_core::{
    AuthService, CallbackFlow, KeyValueStorage, ProfileClient, SessionStore, SessionStoreDeps,
};
use crmchat_domain::Config;
use crmchat_infra::{config, FileKeyValueStore, HttpIdentityClient, HttpProfileClient};
use tracing::{debug, info};

use crate::navigator::ConsoleNavigator;

/// Subdirectory of the state dir standing in for per-tab session storage
const SESSION_STORAGE_DIR: &str = "session";

/// Resolve the configuration for one invocation
///
/// An explicit file wins; otherwise environment variables, then the standard
/// file locations. `state_dir` overrides whatever the source says.
///
/// # Errors
/// Returns an error if no source yields a valid configuration.
pub fn load_config(path: Option<PathBuf>, state_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => config::load_from_file(Some(path))?,
        None => config::load()?,
    };
    if let Some(state_dir) = state_dir {
        config.storage.state_dir = state_dir;
    }
    config.oidc.validate().context("invalid OIDC configuration")?;
    Ok(config)
}

/// Application context - holds the session service and its adapters
pub struct AppContext {
    pub config: Config,
    pub auth: AuthService,
    pub session_storage: Arc<dyn KeyValueStorage>,
    pub navigator: Arc<ConsoleNavigator>,
}

impl AppContext {
    /// Wire the HTTP adapters and file storage into a session store
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let state_dir = config.storage.state_dir.clone();
        let durable: Arc<dyn KeyValueStorage> = Arc::new(FileKeyValueStore::new(&state_dir));
        let session_storage: Arc<dyn KeyValueStorage> =
            Arc::new(FileKeyValueStore::new(state_dir.join(SESSION_STORAGE_DIR)));

        let identity = Arc::new(
            HttpIdentityClient::new(config.oidc.clone(), Arc::clone(&durable), Arc::new(SystemClock))
                .context("failed to build identity client")?,
        );

        let profile = match config.oidc.profile_endpoint.as_deref() {
            Some(endpoint) => {
                let client =
                    HttpProfileClient::new(endpoint).context("failed to build profile client")?;
                Some(Arc::new(client) as Arc<dyn ProfileClient>)
            }
            None => {
                debug!("No profile endpoint configured");
                None
            }
        };

        let store = SessionStore::new(SessionStoreDeps {
            identity,
            profile,
            durable,
            clock: Arc::new(SystemClock),
        })
        .with_refresh_leeway(config.session.refresh_leeway_secs);
        let auth = AuthService::new(store, Arc::clone(&session_storage));

        info!(state_dir = %state_dir.display(), "Application context ready");
        Ok(Self {
            config,
            auth,
            session_storage,
            navigator: Arc::new(ConsoleNavigator::new()),
        })
    }

    /// Restore the session for a one-shot command
    ///
    /// A command refreshes on demand, so the background refresh timer armed
    /// by the restore is cancelled before anything else can run.
    ///
    /// # Errors
    /// Returns an error if the identity client's stored user cannot be read.
    pub async fn initialize(&self) -> Result<bool> {
        let authenticated = self.auth.initialize().await?;
        self.auth.store().clear_refresh_timer();
        Ok(authenticated)
    }

    pub fn callback_flow(&self) -> CallbackFlow {
        CallbackFlow::new(
            self.auth.store().clone(),
            Arc::clone(&self.session_storage),
            self.navigator.clone(),
            self.config.session.clone(),
        )
    }

    pub fn shutdown(&self) {
        self.auth.shutdown();
    }
}
