use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use super::{CredentialSource, Credentials};

/// Credential server reached over HTTP.
///
/// `GET /credentials` returns a JSON object. An empty object means the user
/// has not authorised yet; otherwise `access_token` carries the bearer token
/// and `current_bank` names the provider.
pub struct HttpCredentialSource {
    base_url: String,
    client: Client,
}

impl HttpCredentialSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn credentials(&self) -> Result<Credentials> {
        let url = format!("{}/credentials", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Credential request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Credential server returned {status}");
        }

        let body: serde_json::Map<String, serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse credential response")?;

        if body.is_empty() {
            return Ok(Credentials::default());
        }

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(|token| SecretString::from(token.to_string()));
        let current_bank = body
            .get("current_bank")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Credentials {
            access_token,
            current_bank,
        })
    }

    fn logout(&self) {
        let url = format!("{}/logout", self.base_url);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.get(&url).send().await {
                tracing::debug!(error = %err, "server logout request failed");
            }
        });
    }
}
