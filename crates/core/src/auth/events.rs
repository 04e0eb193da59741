//! Identity event dispatch
//!
//! One subscription per store, attached at initialization. Handlers only log,
//! touch the error slot, or clear the session; nothing is re-emitted.

use crmchat_domain::SessionError;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::ports::IdentityEvent;

/// Attach the store to an identity event stream
///
/// Returns `None` when the store already has a listener or no runtime is
/// available. The task ends when the stream closes or the store is dropped.
pub fn spawn_event_listener(
    store: &SessionStore,
    mut receiver: broadcast::Receiver<IdentityEvent>,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        warn!("No async runtime available, identity events not attached");
        return None;
    };
    if !store.mark_events_attached() {
        debug!("Identity event listener already attached");
        return None;
    }

    let weak = store.downgrade();
    Some(runtime.spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(store) = weak.upgrade() else {
                        break;
                    };
                    handle_event(&store, event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Identity event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Identity event listener stopped");
    }))
}

/// Apply one identity event to the store
pub fn handle_event(store: &SessionStore, event: IdentityEvent) {
    match event {
        IdentityEvent::UserLoaded(user) => {
            info!(subject = user.subject().unwrap_or("unknown"), "User loaded");
            store.set_error(None);
        }
        IdentityEvent::UserUnloaded => {
            info!("User unloaded");
            store.clear_state();
        }
        IdentityEvent::AccessTokenExpiring => {
            info!(expires_in = store.access_token_expires_in(), "Access token expiring");
        }
        IdentityEvent::AccessTokenExpired => {
            warn!("Access token expired");
        }
        IdentityEvent::SilentRenewError(message) => {
            warn!(error = %message, "Silent renew error");
            store.set_error(Some(SessionError::refresh_failure(message)));
        }
        IdentityEvent::UserSignedOut => {
            info!("User signed out at the provider");
            store.clear_state();
        }
    }
}
