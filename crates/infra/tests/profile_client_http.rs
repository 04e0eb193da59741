//! HTTP tests for the backend profile client against a `wiremock` server.

use std::net::TcpListener;

use crmchat_core::{ProfileClient, ProfileError};
use crmchat_infra::HttpProfileClient;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> HttpProfileClient {
    HttpProfileClient::new(format!("{}/api/me", server.uri())).expect("profile client")
}

#[tokio::test]
async fn test_fetches_profile_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": "ada@example.com",
            "nickname": "ada",
            "avatar": "https://cdn.example.test/ada.png",
            "roles": ["agent", "admin"],
            "tenantId": "t-9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client_for(&server).await.fetch_user_info("abc").await.expect("user info");

    assert_eq!(info.id, "user-1");
    assert_eq!(info.display_name(), "ada");
    assert_eq!(info.roles, vec!["agent", "admin"]);
    assert_eq!(info.extra.get("tenantId"), Some(&json!("t-9")));
}

#[tokio::test]
async fn test_non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.fetch_user_info("stale").await.unwrap_err();

    assert_eq!(err, ProfileError::Status { status: 401, body: "token expired".into() });
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.fetch_user_info("abc").await.unwrap_err();

    assert!(matches!(err, ProfileError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // release the port so that requests fail with ECONNREFUSED

    let client = HttpProfileClient::new(format!("http://{addr}/api/me")).expect("profile client");
    let err = client.fetch_user_info("abc").await.unwrap_err();

    assert!(matches!(err, ProfileError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_empty_endpoint_is_not_configured() {
    let client = HttpProfileClient::new("").expect("profile client");
    assert_eq!(client.fetch_user_info("abc").await.unwrap_err(), ProfileError::NotConfigured);
}
