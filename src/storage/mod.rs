//! Persistence for the accepted-transaction snapshot.
//!
//! The store is a flat key/value space. [`TravelStore`] layers the two
//! well-known keys on top of it.

mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::{Context, Result};

use crate::models::Transaction;

/// Key holding the JSON array of accepted transactions.
pub const TRAVEL_TRANSACTIONS_KEY: &str = "travelTransactions";
/// Key holding the JSON string `created` of the last accepted transaction.
pub const TRAVEL_LAST_DATE_KEY: &str = "travelTransactionsLastDate";

/// Key/value storage addressed by fixed string keys.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove every key this store holds.
    async fn clear(&self) -> Result<()>;
}

/// What a previous session left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedTravel {
    pub transactions: Vec<Transaction>,
    pub last_date: Option<String>,
}

/// Typed access to the persisted travel snapshot.
pub struct TravelStore<'a> {
    storage: &'a dyn Storage,
}

impl<'a> TravelStore<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Load the snapshot, or `None` if nothing has been persisted.
    pub async fn load(&self) -> Result<Option<PersistedTravel>> {
        let Some(raw) = self.storage.get(TRAVEL_TRANSACTIONS_KEY).await? else {
            return Ok(None);
        };

        let transactions: Vec<Transaction> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {TRAVEL_TRANSACTIONS_KEY}"))?;

        // Older snapshots hold `false` here when nothing had been accepted.
        let last_date = match self.storage.get(TRAVEL_LAST_DATE_KEY).await? {
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw)
                .with_context(|| format!("Failed to parse {TRAVEL_LAST_DATE_KEY}"))?
            {
                serde_json::Value::String(date) => Some(date),
                _ => None,
            },
            None => None,
        };

        Ok(Some(PersistedTravel {
            transactions,
            last_date,
        }))
    }

    /// Persist the full accepted collection and its last `created` value.
    pub async fn save(&self, transactions: &[Transaction]) -> Result<()> {
        let content =
            serde_json::to_string(transactions).context("Failed to serialize transactions")?;
        self.storage.set(TRAVEL_TRANSACTIONS_KEY, &content).await?;

        if let Some(last) = transactions.last() {
            let last_date =
                serde_json::to_string(&last.created).context("Failed to serialize last date")?;
            self.storage.set(TRAVEL_LAST_DATE_KEY, &last_date).await?;
        }

        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.clear().await
    }
}
