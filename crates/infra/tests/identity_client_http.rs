//! HTTP tests for the OIDC identity client against a `wiremock` provider.
//!
//! The provider publishes a discovery document and a token endpoint; the
//! tests walk authorization, code exchange, refresh and logout, then run the
//! same client underneath the session store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use crmchat_common::time::MockClock;
use crmchat_core::testing::{MemoryKeyValueStore, RecordingNavigator};
use crmchat_core::{
    AuthService, CallbackFlow, IdentityClient, IdentityError, KeyValueStorage, SessionStore,
    SessionStoreDeps,
};
use crmchat_domain::{CallbackStatus, OidcConfig, SessionConfig};
use crmchat_infra::identity::PENDING_SIGNIN_KEY;
use crmchat_infra::{HttpIdentityClient, HttpProfileClient};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000;
const CALLBACK: &str = "http://localhost:3010/oidc/callback";

fn id_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

async fn provider() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "end_session_endpoint": format!("{base}/logout"),
            "userinfo_endpoint": format!("{base}/userinfo")
        })))
        .mount(&server)
        .await;
    server
}

async fn mount_code_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "id_token": id_token(&json!({"sub": "user-1", "email": "ada@example.com"})),
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "openid profile"
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn oidc_config(server: &MockServer) -> OidcConfig {
    OidcConfig {
        authority: server.uri(),
        client_id: "crmchat".into(),
        redirect_uri: CALLBACK.into(),
        post_logout_redirect_uri: Some("http://localhost:3010/".into()),
        profile_endpoint: Some(format!("{}/api/me", server.uri())),
        ..OidcConfig::default()
    }
}

fn client_for(server: &MockServer, store: Arc<MemoryKeyValueStore>) -> Arc<HttpIdentityClient> {
    Arc::new(
        HttpIdentityClient::new(
            oidc_config(server),
            store,
            Arc::new(MockClock::at_unix_seconds(NOW)),
        )
        .expect("identity client"),
    )
}

fn state_of(authorize_url: &str) -> String {
    let url = Url::parse(authorize_url).expect("authorization URL");
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
    params.get("state").cloned().expect("state parameter")
}

/// Validates the authorization code flow end to end.
///
/// Assertions:
/// - Confirms the authorization URL uses the discovered endpoint.
/// - Confirms `expires_at` is the clock plus `expires_in` seconds.
/// - Confirms ID token claims become the user profile.
/// - Confirms a second client over the same storage sees the user.
#[tokio::test]
async fn test_authorization_code_flow_with_discovery() {
    let server = provider().await;
    mount_code_exchange(&server).await;
    let store = Arc::new(MemoryKeyValueStore::new());
    let client = client_for(&server, store.clone());

    let authorize_url = client.signin_redirect(None).await.unwrap();
    assert!(authorize_url.starts_with(&format!("{}/authorize?", server.uri())));
    let state = state_of(&authorize_url);

    let user = client
        .signin_redirect_callback(&format!("{CALLBACK}?code=auth-code&state={state}"))
        .await
        .unwrap();

    assert_eq!(user.access_token, "at-1");
    assert_eq!(user.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(user.expires_at, Some(NOW + 3_600));
    assert_eq!(user.scope.as_deref(), Some("openid profile"));
    assert_eq!(user.subject(), Some("user-1"));
    assert!(store.get_item(PENDING_SIGNIN_KEY).unwrap().is_none());

    let restarted = client_for(&server, store);
    assert_eq!(restarted.get_user().await.unwrap(), Some(user));
}

/// Validates the refresh-token grant.
///
/// Assertions:
/// - Confirms the previous refresh token is kept when none is returned.
/// - Confirms the new expiry is computed from the new `expires_in`.
#[tokio::test]
async fn test_refresh_grant_keeps_refresh_token() {
    let server = provider().await;
    mount_code_exchange(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .and(body_string_contains("client_id=crmchat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-2",
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryKeyValueStore::new()));
    let state = state_of(&client.signin_redirect(None).await.unwrap());
    client
        .signin_redirect_callback(&format!("{CALLBACK}?code=auth-code&state={state}"))
        .await
        .unwrap();

    let renewed = client.signin_silent("rt-1").await.unwrap().expect("renewed user");
    assert_eq!(renewed.access_token, "at-2");
    assert_eq!(renewed.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(renewed.expires_at, Some(NOW + 1_800));
    assert_eq!(renewed.subject(), Some("user-1"));
}

/// Validates the mapping of OAuth error bodies on refresh.
///
/// Assertions:
/// - Confirms `login_required` arrives as a provider error that requires an
///   interactive login.
/// - Confirms `invalid_grant` does not.
#[tokio::test]
async fn test_refresh_errors_carry_oauth_code() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=expired-session"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "login_required",
            "error_description": "The session has ended"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=revoked"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryKeyValueStore::new()));

    let err = client.signin_silent("expired-session").await.unwrap_err();
    assert_eq!(err, IdentityError::provider("login_required", Some("The session has ended".into())));
    assert!(err.requires_login());

    let err = client.signin_silent("revoked").await.unwrap_err();
    assert!(!err.requires_login());
    assert_eq!(err.to_string(), "invalid_grant");
}

/// Validates that a server error without an OAuth body is an unexpected
/// response, not a provider error.
#[tokio::test]
async fn test_token_endpoint_outage_is_invalid_response() {
    let server = provider().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryKeyValueStore::new()));
    let err = client.signin_silent("rt-1").await.unwrap_err();

    assert!(matches!(err, IdentityError::InvalidResponse(ref msg) if msg.contains("503")));
}

/// Validates that discovery happens once per client.
#[tokio::test]
async fn test_discovery_is_cached() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemoryKeyValueStore::new()));
    client.signin_redirect(None).await.unwrap();
    client.signin_redirect(None).await.unwrap();

    let err = client.signout_redirect(Some("idt")).await.unwrap_err();
    assert!(matches!(err, IdentityError::NotConfigured(_)));
}

/// Validates the session store running on the HTTP client: login through
/// the callback flow, then a refresh rejected with `login_required`.
///
/// Assertions:
/// - Confirms the callback routes to the stashed URL and fetches the profile.
/// - Confirms `login_required` clears the session and the stored user.
/// - Confirms logout returns the provider's end-session URL.
#[tokio::test]
async fn test_session_store_over_http_client() {
    let server = provider().await;
    mount_code_exchange(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "nickname": "ada"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "login_required"})))
        .mount(&server)
        .await;

    let durable = Arc::new(MemoryKeyValueStore::new());
    let session = Arc::new(MemoryKeyValueStore::new());
    let identity = client_for(&server, durable.clone());
    let profile = Arc::new(HttpProfileClient::new(format!("{}/api/me", server.uri())).unwrap());
    let store = SessionStore::new(SessionStoreDeps {
        identity: identity.clone(),
        profile: Some(profile),
        durable,
        clock: Arc::new(MockClock::at_unix_seconds(NOW)),
    });
    let service = AuthService::new(store.clone(), session.clone());
    assert!(!service.initialize().await.unwrap());

    let authorize_url = service.login(Some("/chat/inbox")).await.unwrap();
    let state = state_of(&authorize_url);

    let navigator = Arc::new(RecordingNavigator::new());
    let settings = SessionConfig { success_redirect_delay_ms: 0, ..SessionConfig::default() };
    let flow = CallbackFlow::new(store.clone(), session, navigator.clone(), settings);
    let status = flow.run(&format!("{CALLBACK}?code=auth-code&state={state}")).await;

    assert_eq!(status, CallbackStatus::Success);
    assert_eq!(navigator.visits(), vec!["/chat/inbox"]);
    assert!(service.is_authenticated());
    assert_eq!(service.load_user_info().await.map(|i| i.id).as_deref(), Some("user-1"));

    assert!(!service.refresh_tokens().await);
    assert!(!service.is_authenticated());
    assert!(service.user().is_none());
    assert!(!store.is_refresh_scheduled());
    assert!(identity.get_user().await.unwrap().is_none());

    let logout_url = service.logout().await.unwrap();
    assert!(logout_url.starts_with(&format!("{}/logout?", server.uri())));
    assert!(logout_url.contains("client_id=crmchat"));
    assert!(identity.get_user().await.unwrap().is_none());
    service.shutdown();
}

/// Validates that logging out while a refresh grant is in flight does not
/// bring the session back.
///
/// Assertions:
/// - Confirms the late refresh result is dropped by the store.
/// - Ensures the renewed user is never written to storage.
/// - Ensures a fresh service over the same storage starts signed out.
#[tokio::test]
async fn test_logout_during_refresh_keeps_user_removed() {
    let server = provider().await;
    mount_code_exchange(&server).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "at-late",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let durable = Arc::new(MemoryKeyValueStore::new());
    let identity = client_for(&server, durable.clone());
    let state = state_of(&identity.signin_redirect(None).await.unwrap());
    identity
        .signin_redirect_callback(&format!("{CALLBACK}?code=auth-code&state={state}"))
        .await
        .unwrap();

    let deps = |identity: Arc<HttpIdentityClient>| SessionStoreDeps {
        identity,
        profile: None,
        durable: durable.clone(),
        clock: Arc::new(MockClock::at_unix_seconds(NOW)),
    };
    let store = SessionStore::new(deps(identity.clone()));
    let service = AuthService::new(store.clone(), Arc::new(MemoryKeyValueStore::new()));
    assert!(service.initialize().await.unwrap());
    store.clear_refresh_timer();

    let refreshing = {
        let store = store.clone();
        tokio::spawn(async move { store.refresh_tokens().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.logout().await.unwrap();

    assert!(!refreshing.await.unwrap());
    assert!(!service.is_authenticated());
    assert!(identity.get_user().await.unwrap().is_none());
    service.shutdown();

    let restarted = client_for(&server, durable.clone());
    assert!(restarted.get_user().await.unwrap().is_none());
    let reloaded = AuthService::new(
        SessionStore::new(deps(restarted)),
        Arc::new(MemoryKeyValueStore::new()),
    );
    assert!(!reloaded.initialize().await.unwrap());
    reloaded.shutdown();
}
