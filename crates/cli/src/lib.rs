//! # CrmChat Auth CLI
//!
//! Wires the session store to the HTTP identity and profile clients with
//! file-backed storage, and exposes it as the `crmchat-auth` command.
//!
//! Durable state (the identity client's user, the pending sign-in and the
//! persisted session) lives under the configured state directory, so a
//! login started by one invocation can be completed by the next.

pub mod cli;
pub mod commands;
pub mod context;
pub mod navigator;

pub use cli::{Cli, Command};
pub use commands::{execute, Report};
pub use context::{load_config, AppContext};
pub use navigator::ConsoleNavigator;
