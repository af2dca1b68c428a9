use std::fmt;

use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

/// Wraps the provider access token into request headers.
///
/// A missing token still produces a header (`Bearer ` with nothing after
/// it). Callers decide whether a request is worth making without one.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<SecretString>,
}

impl AuthContext {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }

    pub fn bearer(token: SecretString) -> Self {
        Self { token: Some(token) }
    }

    /// Request descriptor for `method`.
    pub fn request(&self, method: Method) -> RequestDescriptor {
        let token = self
            .token
            .as_ref()
            .map(|t| t.expose_secret())
            .unwrap_or_default();
        RequestDescriptor {
            method,
            authorization: format!("Bearer {token}"),
        }
    }

    /// Descriptor for the default read method.
    pub fn get(&self) -> RequestDescriptor {
        self.request(Method::GET)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// HTTP method plus `Authorization` header value.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub authorization: String,
}

impl RequestDescriptor {
    pub fn build(&self, client: &Client, url: &str) -> RequestBuilder {
        client
            .request(self.method.clone(), url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("authorization", &"Bearer [REDACTED]")
            .finish()
    }
}
