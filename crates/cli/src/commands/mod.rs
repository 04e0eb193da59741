//! Subcommand handlers
//!
//! Each handler returns a [`Report`]; `main` decides whether to print the
//! text or the JSON form.

pub mod session;
pub mod token;

use serde_json::Value;

use crate::cli::Command;
use crate::context::AppContext;

/// What a command has to say on stdout
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub text: String,
    pub json: Value,
}

impl Report {
    pub fn new(text: impl Into<String>, json: Value) -> Self {
        Self { text: text.into(), json }
    }

    pub fn render(&self, as_json: bool) -> String {
        if as_json {
            self.json.to_string()
        } else {
            self.text.clone()
        }
    }
}

/// Dispatch one parsed subcommand
///
/// # Errors
/// Propagates the handler's error.
pub async fn execute(ctx: &AppContext, command: Command) -> anyhow::Result<Report> {
    match command {
        Command::Login { return_to } => session::login(ctx, return_to.as_deref()).await,
        Command::Callback { url } => session::callback(ctx, &url).await,
        Command::Logout => session::logout(ctx).await,
        Command::Token { header } => token::token(ctx, header).await,
        Command::Status => token::status(ctx).await,
        Command::Refresh => token::refresh(ctx).await,
    }
}
