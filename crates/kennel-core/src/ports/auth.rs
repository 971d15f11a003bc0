//! Authorization boundary.
//!
//! Access tokens are validated by a remote authorization service. The core
//! only needs to know whether a token is live, which program it is bound to,
//! and which scopes it carries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Introspection result for an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Whether the authorization service considers the token live.
    pub active: bool,
    /// Program the token was issued for.
    pub server_id: Option<String>,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

/// Authorization failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The token is expired, revoked or unknown.
    #[error("Token is not active")]
    Inactive,

    /// The token belongs to a different program.
    #[error("Token is not valid for program {0}")]
    WrongServer(String),

    /// A required scope was not granted.
    #[error("Token is missing scope {0}")]
    MissingScope(String),

    /// The authorization service could not be reached or answered badly.
    #[error("Authorization service error: {0}")]
    Service(String),
}

/// Port for the remote token introspection endpoint.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Ask the authorization service about `token`.
    async fn introspect(&self, token: &str) -> Result<TokenInfo, AuthError>;
}

/// Check that `info` grants `required_scopes` on `program_id`.
pub fn authorize(
    info: &TokenInfo,
    program_id: &str,
    required_scopes: &[&str],
) -> Result<(), AuthError> {
    if !info.active {
        return Err(AuthError::Inactive);
    }
    if info.server_id.as_deref() != Some(program_id) {
        return Err(AuthError::WrongServer(program_id.to_string()));
    }
    for scope in required_scopes {
        if !info.scopes.iter().any(|s| s == scope) {
            return Err(AuthError::MissingScope((*scope).to_string()));
        }
    }
    Ok(())
}
