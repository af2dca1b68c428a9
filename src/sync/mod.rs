//! Bank synchronization: provider contract, the paginated fetch loop, and
//! the supervisor that drives it.

mod auth;
mod cursor;
mod dedup;
mod factory;
mod filter;
mod http;
mod pager;
pub mod providers;
mod session;
mod supervisor;
mod url;

pub use auth::{AuthContext, RequestDescriptor};
pub use cursor::DateCursor;
pub use dedup::DedupStore;
pub use factory::{DefaultProviderFactory, ProviderFactory};
pub use filter::TransactionFilter;
pub use pager::{LoopExit, SyncSummary};
pub use providers::{MonzoProvider, StarlingProvider};
pub use session::{SessionHandle, SyncSession};
pub use supervisor::{SupervisorState, SupervisorStatus, SyncSupervisor};
pub use url::url_encode;

use crate::error::SyncResult;
use crate::models::{AccountIdentity, PageTransaction};
use crate::storage::Storage;

/// Transaction-list page size used by paginating providers.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default merchant marker for London transit payments.
pub const TFL_MARKER: &str = "tfl.gov.uk";

/// How a provider pages and what it calls transit spend.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// The provider's tag for the transport spending category.
    pub transport_category: &'static str,
    /// Requested page size. A shorter page ends the loop.
    pub page_size: usize,
    /// The provider returns the whole window in one response, so the first
    /// page always ends the loop.
    pub single_page: bool,
    /// Human-readable account-selection predicate, for errors and logs.
    pub account_predicate: &'static str,
    /// Matched case-insensitively against transaction descriptions.
    pub merchant_marker: String,
}

impl ProviderProfile {
    /// Whether a page of `len` transactions is the last one.
    pub fn is_final_page(&self, len: usize) -> bool {
        self.single_page || len == 0 || len < self.page_size
    }
}

/// A banking data source.
///
/// Implementations supply endpoints, the account predicate, and paging
/// parameters; the fetch loop itself is shared.
#[async_trait::async_trait]
pub trait BankProvider: Send + Sync {
    /// Short lowercase name (`"monzo"`, `"starling"`).
    fn name(&self) -> &'static str;

    fn profile(&self) -> &ProviderProfile;

    /// List accounts and return the first one satisfying the provider's
    /// predicate.
    async fn discover_account(&self, auth: &AuthContext) -> SyncResult<AccountIdentity>;

    /// Fetch one page of transactions starting at `since`.
    async fn fetch_page(
        &self,
        account: &AccountIdentity,
        since: &str,
        auth: &AuthContext,
    ) -> SyncResult<Vec<PageTransaction>>;

    /// Revoke the token with the provider. Fire-and-forget.
    fn logout(&self, auth: &AuthContext);

    /// Filter for transit spend on `account`.
    fn filter_for(&self, account: &AccountIdentity) -> TransactionFilter {
        let profile = self.profile();
        TransactionFilter::new(
            account.id.clone(),
            profile.transport_category,
            &profile.merchant_marker,
        )
    }

    /// Page through the account's transactions until a termination
    /// condition fires. An auth rejection also cancels the session.
    async fn sync_loop(
        &self,
        session: &mut SyncSession,
        auth: &AuthContext,
        storage: &dyn Storage,
    ) -> SyncResult<SyncSummary> {
        pager::run(self, session, auth, storage).await
    }
}
