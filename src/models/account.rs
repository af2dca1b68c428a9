use super::Id;

/// The provider account a sync session is bound to.
///
/// Resolved once by account discovery and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub id: Id,
    /// Provider-specific sub-ledger needed to address the transaction feed
    /// (Starling's default category). Monzo has no such concept.
    pub category: Option<Id>,
}

impl AccountIdentity {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<Id>) -> Self {
        self.category = Some(category.into());
        self
    }
}
