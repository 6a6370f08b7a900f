//! Client-credentials token exchange.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{Credentials, Endpoints};
use crate::http::{body_snippet, with_timeout};
use crate::{Error, Result};

/// Bearer token returned by the token endpoint. Fetched once per run and
/// shared read-only afterwards.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: None,
            token_type: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.access_token
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Exchange client credentials for an app access token.
pub async fn fetch_token(
    client: &Client,
    endpoints: &Endpoints,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<AccessToken> {
    debug!(url = %endpoints.token_url, client_id = %credentials.client_id, "Requesting access token");

    let request = client.post(&endpoints.token_url).query(&[
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", "client_credentials"),
    ]);
    let response = with_timeout(request, timeout)
        .send()
        .await
        .map_err(|e| Error::auth(format!("request to {} failed: {e}", endpoints.token_url)))?;

    let status = response.status();
    if !status.is_success() {
        let body = body_snippet(response).await;
        return Err(Error::auth(format!(
            "{} answered HTTP {status}: {body}",
            endpoints.token_url
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::auth(format!("failed to read token response: {e}")))?;
    let token: AccessToken = serde_json::from_str(&body)
        .map_err(|e| Error::auth(format!("token response has no usable access_token: {e}")))?;

    if token.secret().is_empty() {
        return Err(Error::auth("token response has an empty access_token"));
    }

    info!(
        expires_in = ?token.expires_in(),
        token_type = token.token_type().unwrap_or("unknown"),
        "Access token acquired"
    );
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        crate::http::create_client(&Default::default()).unwrap()
    }

    fn endpoints(server: &MockServer) -> Endpoints {
        Endpoints {
            token_url: format!("{}/oauth2/token", server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_token_sends_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(query_param("client_id", "id"))
            .and(query_param("client_secret", "secret"))
            .and(query_param("grant_type", "client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 5000,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = fetch_token(
            &client(),
            &endpoints(&server),
            &Credentials::new("id", "secret"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(token.secret(), "tok");
        assert_eq!(token.bearer(), "Bearer tok");
        assert_eq!(token.expires_in(), Some(Duration::from_secs(5000)));
        assert_eq!(token.token_type(), Some("bearer"));
    }

    #[tokio::test]
    async fn test_fetch_token_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid client secret"))
            .mount(&server)
            .await;

        let err = fetch_token(
            &client(),
            &endpoints(&server),
            &Credentials::new("id", "wrong"),
            Duration::ZERO,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("invalid client secret"));
    }

    #[tokio::test]
    async fn test_fetch_token_requires_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_in": 10 })),
            )
            .mount(&server)
            .await;

        let err = fetch_token(
            &client(),
            &endpoints(&server),
            &Credentials::new("id", "secret"),
            Duration::ZERO,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
    }

    #[test]
    fn test_debug_hides_token() {
        let token = AccessToken::new("very-secret");
        assert!(!format!("{token:?}").contains("very-secret"));
    }
}
