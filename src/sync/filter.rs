use crate::models::{Id, PageTransaction};

use super::dedup::DedupStore;

/// Decides whether a page transaction is transit spend on the active
/// account.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    account_id: Id,
    category: String,
    marker: String,
}

impl TransactionFilter {
    /// `marker` is matched case-insensitively against the description.
    pub fn new(account_id: Id, category: impl Into<String>, marker: &str) -> Self {
        Self {
            account_id,
            category: category.into(),
            marker: marker.to_lowercase(),
        }
    }

    /// Account, category, and merchant checks. Ignores duplicates.
    pub fn matches(&self, tx: &PageTransaction) -> bool {
        tx.account_id == self.account_id
            && tx.category == self.category
            && tx.description.to_lowercase().contains(&self.marker)
    }

    /// Full acceptance test, including the duplicate check.
    pub fn accepts(&self, tx: &PageTransaction, dedup: &DedupStore) -> bool {
        self.matches(tx) && !dedup.has(&tx.id)
    }
}
