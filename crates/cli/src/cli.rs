//! Command-line surface of `crmchat-auth`

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sign in to CrmChat and manage the local OIDC session.
#[derive(Debug, Parser)]
#[command(name = "crmchat-auth", version, about)]
pub struct Cli {
    /// Configuration file (TOML or JSON).
    ///
    /// Without it, `CRMCHAT_OIDC_*` variables are used when complete, then
    /// `crmchat.toml` or `crmchat.json` is searched near the working directory.
    #[arg(long, global = true, env = "CRMCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted session.
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start a login and print the authorization URL to open.
    Login {
        /// Where to continue once the login completes.
        #[arg(long)]
        return_to: Option<String>,
    },
    /// Complete a login from the URL the browser was redirected to.
    Callback {
        /// Full redirect URL including `code` and `state`.
        url: String,
    },
    /// Print a valid access token, refreshing it first when needed.
    Token {
        /// Print an `Authorization` header value instead of the bare token.
        #[arg(long)]
        header: bool,
    },
    /// Show the current session.
    Status,
    /// Renew the tokens now.
    Refresh,
    /// End the session and print the provider's end-session URL.
    Logout,
}
