//! `token`, `status` and `refresh`

use anyhow::{anyhow, bail, Result};
use serde_json::json;

use super::Report;
use crate::context::AppContext;

const NOT_SIGNED_IN: &str = "not signed in; run `crmchat-auth login` first";

pub async fn token(ctx: &AppContext, header: bool) -> Result<Report> {
    if !ctx.initialize().await? {
        bail!(NOT_SIGNED_IN);
    }

    // A one-shot process cannot wait for a background renewal
    if ctx.auth.is_token_expiring_soon() {
        ctx.auth.refresh_tokens().await;
    }

    let value = if header {
        ctx.auth.authorization_header().await
    } else {
        ctx.auth.get_valid_access_token().await
    };
    let Some(value) = value else {
        return Err(match ctx.auth.error() {
            Some(err) => anyhow!("no valid access token: {err}"),
            None => anyhow!(NOT_SIGNED_IN),
        });
    };

    Ok(Report::new(
        value.clone(),
        json!({
            "token": value,
            "expires_in": ctx.auth.access_token_expires_in(),
        }),
    ))
}

pub async fn status(ctx: &AppContext) -> Result<Report> {
    let authenticated = ctx.initialize().await?;
    let state = ctx.auth.store().snapshot();

    let Some(token) = state.token_info.filter(|_| authenticated) else {
        return Ok(Report::new(
            "Not signed in",
            json!({
                "authenticated": false,
                "error": state.error.map(|e| e.to_string()),
            }),
        ));
    };

    let subject = state.user.as_ref().and_then(|u| u.subject()).map(str::to_string);
    let name = state.user_info.as_ref().map(|i| i.display_name().to_string());
    let expires_in = ctx.auth.access_token_expires_in();
    let expiring = ctx.auth.is_token_expiring_soon();
    let expires_at = token.expires_at_utc().map(|t| t.to_rfc3339());
    let has_refresh_token = token.has_refresh_token();

    let mut lines = vec![format!(
        "Signed in as {}",
        name.as_deref().or(subject.as_deref()).unwrap_or("unknown user")
    )];
    match expires_in {
        Some(secs) if secs <= 0 => lines.push("Access token expired".into()),
        Some(secs) if expiring => lines.push(format!("Access token expires in {secs}s (renewal due)")),
        Some(secs) => lines.push(format!("Access token expires in {secs}s")),
        None => {}
    }
    if !token.scopes.is_empty() {
        lines.push(format!("Scopes: {}", token.scopes.join(" ")));
    }
    lines.push(format!(
        "Refresh token: {}",
        if has_refresh_token { "present" } else { "absent" }
    ));
    if let Some(err) = &state.error {
        lines.push(format!("Last error: {err}"));
    }

    Ok(Report::new(
        lines.join("\n"),
        json!({
            "authenticated": true,
            "subject": subject,
            "user": name,
            "expires_at": expires_at,
            "expires_in": expires_in,
            "expiring_soon": expiring,
            "scopes": token.scopes,
            "has_refresh_token": has_refresh_token,
            "last_refresh_time": state.last_refresh_time,
            "error": state.error.map(|e| e.to_string()),
        }),
    ))
}

pub async fn refresh(ctx: &AppContext) -> Result<Report> {
    if !ctx.initialize().await? {
        bail!(NOT_SIGNED_IN);
    }

    if !ctx.auth.refresh_tokens().await {
        let reason = ctx.auth.error().map_or_else(|| "unknown error".into(), |e| e.to_string());
        if ctx.auth.is_authenticated() {
            bail!("token refresh failed: {reason}");
        }
        bail!("session ended ({reason}); run `crmchat-auth login` again");
    }

    let expires_in = ctx.auth.access_token_expires_in();
    Ok(Report::new(
        format!("Tokens refreshed, access token expires in {}s", expires_in.unwrap_or_default()),
        json!({ "refreshed": true, "expires_in": expires_in }),
    ))
}
