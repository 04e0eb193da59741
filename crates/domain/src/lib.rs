//! # CrmChat Domain
//!
//! Data model for the CrmChat client-side OIDC session.
//!
//! This crate contains:
//! - Session data types (VendorUser, TokenInfo, UserInfo, PersistedSession)
//! - The session error taxonomy and Result alias
//! - Configuration structures
//! - Storage keys and timing constants
//!
//! ## Architecture
//! - Depends only on `crmchat-common` for error classification
//! - No I/O, no async; pure data and small helpers

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
