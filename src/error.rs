use reqwest::StatusCode;

/// Failures that abort an active sync session.
///
/// Only [`SyncError::AuthRejected`] triggers a forced logout; every other
/// variant is reported to the consumer as-is.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{endpoint} rejected the access token ({status})")]
    AuthRejected { endpoint: String, status: StatusCode },

    #[error("{provider}: no account matches {predicate}")]
    NoMatchingAccount {
        provider: &'static str,
        predicate: &'static str,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown bank provider: {0}")]
    UnknownProvider(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SyncError {
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
