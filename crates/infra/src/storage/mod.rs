//! Key/value storage adapters
//!
//! [`FileKeyValueStore`] backs both the durable store (session blob,
//! identity client user) and the per-session directory.

pub mod file;

pub use file::FileKeyValueStore;
