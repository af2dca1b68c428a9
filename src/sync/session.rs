//! State owned by one sync session.
//!
//! [`SyncSession`] is held mutably by the sync loop. [`SessionHandle`] is
//! the read side shared with the aggregation tick and the supervisor: it
//! exposes the accepted collection as an immutable snapshot, the
//! completion flag, and the cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::models::{AccountIdentity, PageTransaction, Transaction};
use crate::storage::{PersistedTravel, Storage, TravelStore};

use super::cursor::DateCursor;
use super::dedup::DedupStore;
use super::filter::TransactionFilter;

struct SessionShared {
    window_start: DateTime<Utc>,
    // Replaced wholesale on every append so readers never observe a
    // partially extended collection.
    accepted: RwLock<Arc<Vec<Transaction>>>,
    loading_complete: AtomicBool,
    cancelled: AtomicBool,
}

/// Cheap, cloneable read view of a session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    fn new(window_start: DateTime<Utc>) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                window_start,
                accepted: RwLock::new(Arc::new(Vec::new())),
                loading_complete: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.shared.window_start
    }

    /// Snapshot of the accepted collection at this instant.
    pub fn transactions(&self) -> Arc<Vec<Transaction>> {
        let guard = self
            .shared
            .accepted
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn loading_complete(&self) -> bool {
        self.shared.loading_complete.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop before its next iteration.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Whether both handles view the same session.
    pub fn is_same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn mark_complete(&self) {
        self.shared.loading_complete.store(true, Ordering::SeqCst);
    }

    fn append(&self, batch: &[Transaction]) {
        if batch.is_empty() {
            return;
        }
        let mut guard = self
            .shared
            .accepted
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = Vec::with_capacity(guard.len() + batch.len());
        next.extend_from_slice(&guard);
        next.extend_from_slice(batch);
        *guard = Arc::new(next);
    }

    fn replace(&self, transactions: Vec<Transaction>) {
        let mut guard = self
            .shared
            .accepted
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(transactions);
    }
}

/// One account, one cursor, one dedup index, one accepted collection.
pub struct SyncSession {
    account: Option<AccountIdentity>,
    cursor: DateCursor,
    dedup: DedupStore,
    handle: SessionHandle,
}

impl SyncSession {
    /// Fresh session whose window starts `lookback_months` before now.
    pub fn new(clock: &dyn Clock, lookback_months: u32) -> Self {
        let cursor = DateCursor::from_clock(clock, lookback_months);
        let handle = SessionHandle::new(cursor.window_start());
        Self {
            account: None,
            cursor,
            dedup: DedupStore::new(),
            handle,
        }
    }

    /// New session seeded from whatever a previous session persisted.
    pub async fn open(
        storage: &dyn Storage,
        clock: &dyn Clock,
        lookback_months: u32,
    ) -> Result<Self> {
        let mut session = Self::new(clock, lookback_months);
        if let Some(persisted) = TravelStore::new(storage).load().await? {
            tracing::info!(
                transactions = persisted.transactions.len(),
                last_date = persisted.last_date.as_deref().unwrap_or("-"),
                "seeding session from persisted snapshot"
            );
            session.seed(persisted);
        }
        Ok(session)
    }

    /// Seed the accepted collection, the dedup index, and the cursor.
    pub fn seed(&mut self, persisted: PersistedTravel) {
        self.dedup = DedupStore::seeded(persisted.transactions.iter().map(|tx| tx.id.clone()));
        if let Some(last_date) = persisted.last_date {
            self.cursor.resume_from(last_date);
        }
        self.handle.replace(persisted.transactions);
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn cursor(&self) -> &DateCursor {
        &self.cursor
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn account(&self) -> Option<&AccountIdentity> {
        self.account.as_ref()
    }

    /// Bind the session to its account. Later calls are ignored.
    pub fn bind_account(&mut self, account: AccountIdentity) {
        if self.account.is_some() {
            tracing::warn!(account = %account.id, "session already bound; ignoring account");
            return;
        }
        self.account = Some(account);
    }

    /// Run one page through the filter and dedup index, append what passes,
    /// and advance the cursor. Returns the newly accepted batch.
    pub fn ingest_page(
        &mut self,
        filter: &TransactionFilter,
        page: &[PageTransaction],
    ) -> Vec<Transaction> {
        let mut batch = Vec::new();
        for tx in page {
            if filter.accepts(tx, &self.dedup) {
                self.dedup.add(tx.id.clone());
                batch.push(tx.accept());
            }
        }

        self.handle.append(&batch);
        self.cursor.advance(page);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::Id;
    use crate::storage::MemoryStorage;

    fn item(id: &str, category: &str, created: &str) -> PageTransaction {
        PageTransaction {
            id: Id::from(id),
            account_id: Id::from("acc"),
            amount: -280,
            created: created.to_string(),
            category: category.to_string(),
            description: "TFL.GOV.UK/CP".to_string(),
        }
    }

    fn session() -> SyncSession {
        SyncSession::new(&FixedClock::at_date(2024, 1, 1).unwrap(), 12)
    }

    fn filter() -> TransactionFilter {
        TransactionFilter::new(Id::from("acc"), "transport", "tfl.gov.uk")
    }

    #[test]
    fn ingest_appends_only_accepted_and_advances_cursor() {
        let mut session = session();
        let batch = session.ingest_page(
            &filter(),
            &[
                item("a", "transport", "2023-01-02T00:00:00Z"),
                item("b", "groceries", "2023-01-03T00:00:00Z"),
            ],
        );

        assert_eq!(batch.len(), 1);
        assert_eq!(session.handle().transactions().len(), 1);
        assert_eq!(session.cursor().last_seen(), Some("2023-01-03T00:00:00Z"));
    }

    #[test]
    fn snapshots_are_stable_while_session_grows() {
        let mut session = session();
        let handle = session.handle();
        session.ingest_page(&filter(), &[item("a", "transport", "2023-01-02T00:00:00Z")]);

        let before = handle.transactions();
        session.ingest_page(&filter(), &[item("b", "transport", "2023-01-03T00:00:00Z")]);

        assert_eq!(before.len(), 1);
        assert_eq!(handle.transactions().len(), 2);
    }

    #[test]
    fn repeated_page_is_not_duplicated() {
        let mut session = session();
        let page = [item("a", "transport", "2023-01-02T00:00:00Z")];
        session.ingest_page(&filter(), &page);
        let second = session.ingest_page(&filter(), &page);

        assert!(second.is_empty());
        assert_eq!(session.handle().transactions().len(), 1);
    }

    #[tokio::test]
    async fn open_seeds_from_storage() -> Result<()> {
        let storage = MemoryStorage::new();
        TravelStore::new(&storage)
            .save(&[Transaction::new("a", "acc", -280, "2023-06-01T08:00:00Z")])
            .await?;

        let clock = FixedClock::at_date(2024, 1, 1).unwrap();
        let session = SyncSession::open(&storage, &clock, 12).await?;

        assert!(session.dedup().has(&Id::from("a")));
        assert_eq!(session.handle().transactions().len(), 1);
        assert_eq!(session.cursor().next_lower_bound(), "2023-06-01T08:00:00Z");
        assert_eq!(session.cursor().since_date(), "2023-01-01T00:00:00Z");
        Ok(())
    }

    #[test]
    fn account_binds_once() {
        let mut session = session();
        session.bind_account(AccountIdentity::new("acc"));
        session.bind_account(AccountIdentity::new("other"));
        assert_eq!(session.account().map(|a| a.id.as_str()), Some("acc"));
    }

    #[test]
    fn cancel_and_complete_flags() {
        let session = session();
        let handle = session.handle();
        assert!(!handle.is_cancelled());
        assert!(!handle.loading_complete());
        handle.cancel();
        handle.mark_complete();
        assert!(session.handle().is_cancelled());
        assert!(session.handle().loading_complete());
    }
}
