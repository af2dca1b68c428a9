use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::{SyncError, SyncResult};

use super::auth::RequestDescriptor;

/// Issue `request` against `url` and decode a JSON body.
///
/// Any non-success status is an auth rejection: provider APIs answer an
/// expired or revoked token with 401/403, and the engine treats every
/// refusal the same way.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    request: &RequestDescriptor,
) -> SyncResult<T> {
    let endpoint = endpoint_for_errors(url);

    let response = request
        .build(client, url)
        .send()
        .await
        .map_err(|source| SyncError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::AuthRejected { endpoint, status });
    }

    let body = response.text().await.map_err(|source| SyncError::Transport {
        endpoint: endpoint.clone(),
        source,
    })?;

    serde_json::from_str(&body).map_err(|source| SyncError::Decode { endpoint, source })
}

/// Send `request` without waiting for the outcome.
pub(crate) fn fire_and_forget(client: &Client, url: String, request: RequestDescriptor) {
    let client = client.clone();
    tokio::spawn(async move {
        match request.build(&client, &url).send().await {
            Ok(response) => tracing::debug!(
                status = %response.status(),
                url = %endpoint_for_errors(&url),
                "logout sent"
            ),
            Err(err) => tracing::debug!(error = %err, "logout request failed"),
        }
    });
}

// Query strings carry account ids and cursors; keep them out of errors and logs.
fn endpoint_for_errors(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
