//! HTTP implementation of the authorization gateway.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;

use super::credentials::{CredentialCache, CredentialSource};
use super::{AuthorizationGateway, CodeDispatch, CodeRequest, GatewayError, StatusRequest, StatusReport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = "averba-core/gateway-client";

/// Production gateway client over the partner's JSON API.
///
/// Bearer-authenticated through an injected [`CredentialCache`]; a 401 or
/// 403 from the partner maps to [`GatewayError::CredentialExpired`] so the
/// caller can redirect to re-authentication.
pub struct HttpGateway<S> {
    base_url: String,
    client: reqwest::Client,
    credentials: CredentialCache<S>,
}

impl<S: CredentialSource> HttpGateway<S> {
    /// Creates a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is empty or the HTTP client
    /// cannot be initialized.
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialCache<S>,
    ) -> Result<Self, GatewayError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(GatewayError::Protocol("base URL must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| GatewayError::Transport {
                status: None,
                message: error.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let token = self.credentials.get_or_refresh(Utc::now()).await?;
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| GatewayError::Transport {
                status: None,
                message: error.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            self.credentials.invalidate().await;
            return Err(GatewayError::CredentialExpired);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(GatewayError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|error| GatewayError::Protocol(error.to_string()))
    }
}

#[async_trait]
impl<S: CredentialSource> AuthorizationGateway for HttpGateway<S> {
    async fn request_code(&self, request: &CodeRequest) -> Result<CodeDispatch, GatewayError> {
        self.post_json("/autorizacao/solicitar", request).await
    }

    async fn check_authorization(
        &self,
        request: &StatusRequest,
    ) -> Result<StatusReport, GatewayError> {
        self.post_json("/autorizacao/consultar", request).await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::super::credentials::StaticCredentialSource;
    use super::*;

    fn cache() -> CredentialCache<StaticCredentialSource> {
        CredentialCache::new(StaticCredentialSource::new(SecretString::from(
            "test-token".to_string(),
        )))
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let result = HttpGateway::new("  ", cache());
        assert!(matches!(result, Err(GatewayError::Protocol(_))));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let gateway = HttpGateway::new("https://gw.example.com/api/", cache()).unwrap();
        assert_eq!(gateway.base_url, "https://gw.example.com/api");
    }
}
