use std::collections::HashSet;

use crate::models::Id;

/// Ids of transactions already accepted. Grows monotonically.
#[derive(Debug, Clone, Default)]
pub struct DedupStore {
    seen: HashSet<Id>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previously persisted snapshot.
    pub fn seeded<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Id>,
    {
        Self {
            seen: ids.into_iter().collect(),
        }
    }

    pub fn has(&self, id: &Id) -> bool {
        self.seen.contains(id)
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn add(&mut self, id: Id) -> bool {
        self.seen.insert(id)
    }
}
