//! # CrmChat Infrastructure
//!
//! Infrastructure implementations of the session ports.
//!
//! This crate contains:
//! - The HTTP OIDC identity client (PKCE, refresh grant, end-session)
//! - The backend profile client
//! - File key/value storage
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `crmchat-core`
//! - Depends on `crmchat-domain` and `crmchat-core`
//! - Contains all "impure" code (HTTP, filesystem, environment)

pub mod config;
pub mod errors;
pub mod identity;
pub mod observability;
pub mod profile;
pub mod storage;

// Re-export commonly used items
pub use errors::{InfraError, InfraResult};
pub use identity::HttpIdentityClient;
pub use observability::init_tracing;
pub use profile::HttpProfileClient;
pub use storage::FileKeyValueStore;
