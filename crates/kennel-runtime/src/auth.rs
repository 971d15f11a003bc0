//! Token introspection against the remote authorization service.

use async_trait::async_trait;
use kennel_core::ports::keys;
use kennel_core::{AuthError, ConfigProvider, TokenInfo, TokenIntrospector};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::error;

/// Raw introspection reply.
#[derive(Debug, Default, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    server_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl IntrospectionResponse {
    fn into_token_info(self) -> Result<TokenInfo, AuthError> {
        if let Some(err) = self.error {
            error!(error = %err, "Authorization service rejected introspection");
            return Err(AuthError::Service(
                "Failed to parse auth server response".to_string(),
            ));
        }
        Ok(TokenInfo {
            active: self.active,
            server_id: self.server_id,
            scopes: self
                .scope
                .as_deref()
                .unwrap_or_default()
                .split(' ')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// [`TokenIntrospector`] posting tokens to the `infoserver` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenIntrospector {
    client: Client,
    endpoint: String,
    auth_token: String,
}

impl HttpTokenIntrospector {
    /// `auth_token` is the daemon's own bearer credential.
    pub fn new(endpoint: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Build from `infoserver` and `authtoken`. `None` when either is unset.
    pub fn from_config(config: &dyn ConfigProvider) -> Option<Self> {
        let endpoint = config.get(keys::INFO_SERVER)?;
        let auth_token = config.get(keys::AUTH_TOKEN)?;
        Some(Self::new(endpoint, auth_token))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenIntrospector for HttpTokenIntrospector {
    async fn introspect(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.auth_token)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error talking to auth server");
                AuthError::Service(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = %status, "Unexpected response code from auth server");
            return Err(AuthError::Service(format!("Received response {status}")));
        }

        let body: IntrospectionResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Error parsing response from auth server");
            AuthError::Service("Failed to parse auth server response".to_string())
        })?;
        body.into_token_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::StaticConfig;

    fn parse(json: &str) -> Result<TokenInfo, AuthError> {
        serde_json::from_str::<IntrospectionResponse>(json)
            .unwrap()
            .into_token_info()
    }

    #[test]
    fn test_scope_is_split_on_spaces() {
        let info = parse(
            r#"{"active": true, "server_id": "alpha", "scope": "server.start server.console"}"#,
        )
        .unwrap();
        assert!(info.active);
        assert_eq!(info.server_id.as_deref(), Some("alpha"));
        assert_eq!(info.scopes, vec!["server.start", "server.console"]);
    }

    #[test]
    fn test_inactive_reply_without_fields() {
        let info = parse(r#"{"active": false}"#).unwrap();
        assert_eq!(info, TokenInfo::default());
    }

    #[test]
    fn test_error_body_is_a_service_error() {
        assert!(matches!(
            parse(r#"{"error": "invalid_request"}"#),
            Err(AuthError::Service(_))
        ));
    }

    #[test]
    fn test_from_config_needs_endpoint_and_token() {
        let partial = StaticConfig::new().with(keys::INFO_SERVER, "http://auth.local/introspect");
        assert!(HttpTokenIntrospector::from_config(&partial).is_none());

        let full = partial.with(keys::AUTH_TOKEN, "secret");
        let introspector = HttpTokenIntrospector::from_config(&full).unwrap();
        assert_eq!(introspector.endpoint(), "http://auth.local/introspect");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_service_error() {
        let introspector = HttpTokenIntrospector::new("http://127.0.0.1:1/introspect", "secret");
        assert!(matches!(
            introspector.introspect("abc").await,
            Err(AuthError::Service(_))
        ));
    }
}
