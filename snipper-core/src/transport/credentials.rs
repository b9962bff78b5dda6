//! Bearer credential capability injected into the transport.
//!
//! Acquiring and refreshing tokens is somebody else's job; the transport only
//! asks for the current token right before each request.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::TransportError;

/// A bearer token that never shows up in logs.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Create a new token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token.
    ///
    /// Only the transport should need this, when building the header.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken([REDACTED])")
    }
}

impl From<String> for BearerToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for BearerToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Source of the bearer token attached to every request.
///
/// Returning `Ok(None)` sends the request without an `Authorization` header.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<Option<BearerToken>, TransportError>;
}

/// Credential provider holding a fixed token (or none at all).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<BearerToken>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<BearerToken>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider that never attaches a token.
    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<Option<BearerToken>, TransportError> {
        Ok(self.token.clone())
    }
}
