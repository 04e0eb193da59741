use std::time::Duration;

use async_trait::async_trait;
use crmchat_core::{ProfileClient, ProfileError};
use crmchat_domain::UserInfo;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::debug;

use crate::errors::{InfraError, InfraResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// `GET <endpoint>` with the access token as bearer credentials
#[derive(Debug, Clone)]
pub struct HttpProfileClient {
    endpoint: String,
    http: Client,
}

impl HttpProfileClient {
    /// # Errors
    /// Returns [`InfraError`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> InfraResult<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .no_proxy()
            .user_agent(concat!("crmchat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(endpoint, http))
    }

    pub fn with_http_client(endpoint: impl Into<String>, http: Client) -> Self {
        Self { endpoint: endpoint.into(), http }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, ProfileError> {
        if self.endpoint.is_empty() {
            return Err(ProfileError::NotConfigured);
        }

        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(InfraError::from)?;
        debug!(status = status.as_u16(), "Profile endpoint responded");

        if !status.is_success() {
            return Err(ProfileError::Status { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| ProfileError::Decode(e.to_string()))
    }
}
