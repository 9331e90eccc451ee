use std::fmt;

use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};

/// Transient login/register input. Lives only for the duration of the
/// request; never serialized or written anywhere.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token grant returned by the `/token` endpoint
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
}

/// The login/register boundary. The session manager only talks to this
/// trait, so tests can drive state transitions without a server.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;
    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError>;
}

/// `AuthGateway` backed by the HTTP API
pub struct HttpAuthGateway {
    api: ApiClient,
}

impl HttpAuthGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        self.api.login(&credentials.email, &credentials.password).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.api.register(&credentials.email, &credentials.password).await
    }
}
