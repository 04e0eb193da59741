//! Client-side OIDC session management
//!
//! Leaf to root: token-info extraction, refresh scheduler, session store,
//! identity event dispatch, callback flow, and the [`AuthService`] façade.

pub mod callback;
pub mod events;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod token_info;

pub use callback::{take_return_url, CallbackFlow};
pub use events::{handle_event, spawn_event_listener};
pub use scheduler::{refresh_delay, RefreshScheduler};
pub use service::AuthService;
pub use store::{SessionState, SessionStore, SessionStoreDeps, WeakSessionStore};
pub use token_info::extract_token_info;
