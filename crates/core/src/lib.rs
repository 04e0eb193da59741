//! # CrmChat Core
//!
//! Session business logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the identity provider, profile endpoint, storage
//!   and navigation
//! - The session store, refresh scheduler and callback flow
//! - The [`AuthService`] façade used by applications
//!
//! ## Architecture Principles
//! - Only depends on `crmchat-common` and `crmchat-domain`
//! - No HTTP, filesystem, or platform code
//! - All external dependencies via traits
//! - Collaborators are injected; there is no global store

pub mod auth;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use auth::{AuthService, CallbackFlow, SessionState, SessionStore, SessionStoreDeps};
pub use ports::{
    IdentityClient, IdentityError, IdentityEvent, KeyValueStorage, Navigator, ProfileClient,
    ProfileError, StorageError,
};
