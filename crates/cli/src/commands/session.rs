//! `login`, `callback` and `logout`

use anyhow::{bail, Result};
use crmchat_domain::CallbackStatus;
use serde_json::json;
use tracing::info;

use super::Report;
use crate::context::AppContext;

pub async fn login(ctx: &AppContext, return_to: Option<&str>) -> Result<Report> {
    ctx.initialize().await?;
    let url = ctx.auth.login(return_to).await?;
    info!("Authorization URL issued");

    Ok(Report::new(
        format!(
            "Open this URL in a browser to sign in:\n{url}\n\nThen run: crmchat-auth callback '<redirect URL>'"
        ),
        json!({ "authorization_url": url, "return_to": return_to }),
    ))
}

pub async fn callback(ctx: &AppContext, url: &str) -> Result<Report> {
    ctx.initialize().await?;
    let status = ctx.callback_flow().run(url).await;
    let target = ctx.navigator.last().unwrap_or_else(|| ctx.config.session.default_return_url.clone());

    match status {
        CallbackStatus::Success => {
            let info = ctx.auth.load_user_info().await;
            let name = info
                .as_ref()
                .map(|i| i.display_name().to_string())
                .or_else(|| ctx.auth.user().and_then(|u| u.subject().map(str::to_string)))
                .unwrap_or_else(|| "unknown user".into());

            Ok(Report::new(
                format!("Signed in as {name}\nContinue at {target}"),
                json!({
                    "status": "success",
                    "user": name,
                    "user_info": info,
                    "redirect": target,
                    "expires_in": ctx.auth.access_token_expires_in(),
                }),
            ))
        }
        CallbackStatus::Error(message) => bail!("login failed: {message} (returning to {target})"),
        CallbackStatus::Processing => bail!("login callback did not complete"),
    }
}

pub async fn logout(ctx: &AppContext) -> Result<Report> {
    ctx.initialize().await?;
    let url = ctx.auth.logout().await?;

    Ok(Report::new(
        format!("Signed out locally. Finish at the provider:\n{url}"),
        json!({ "end_session_url": url }),
    ))
}
