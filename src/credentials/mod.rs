//! Access to the credential server that owns the OAuth exchange.
//!
//! The engine never performs the OAuth dance itself. It asks a
//! [`CredentialSource`] whether a token is available and which bank it
//! belongs to, and tells it when the session is over.

mod http;

pub use http::HttpCredentialSource;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;

/// What the credential server knows about the current user.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_token: Option<SecretString>,
    /// Discriminator selecting the bank provider (e.g. `"monzo"`).
    pub current_bank: Option<String>,
}

impl Credentials {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            access_token: Some(access_token),
            current_bank: None,
        }
    }

    pub fn with_bank(mut self, bank: impl Into<String>) -> Self {
        self.current_bank = Some(bank.into());
        self
    }
}

/// Source of access tokens for the sync engine.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the current credentials. An unauthorised user yields
    /// `Credentials::default()`, not an error.
    async fn credentials(&self) -> Result<Credentials>;

    /// Tear down the server-side session. Fire-and-forget: implementations
    /// must not block on the response.
    fn logout(&self);
}

/// Credentials supplied up front (CLI flag, environment variable, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    credentials: Credentials,
}

impl StaticCredentialSource {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn unauthorized() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }

    fn logout(&self) {
        tracing::debug!("static credentials have no server session to end");
    }
}
