//! The paginated fetch loop shared by every provider.

use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::storage::{Storage, TravelStore};

use super::auth::AuthContext;
use super::session::SyncSession;
use super::BankProvider;

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A page ended the window; `loading_complete` is set.
    Complete,
    /// The session was cancelled before the loop reached the end of the window.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub exit: LoopExit,
    pub pages: usize,
    pub fetched: usize,
    pub accepted: usize,
}

#[derive(Clone, Copy)]
enum Step {
    Fetch,
    Finished(LoopExit),
}

/// Run the fetch loop for the account bound to `session`, discovering it
/// first if needed.
///
/// Each iteration fetches from the cursor's lower bound, ingests the page,
/// persists the accepted collection when it grew, and stops once the
/// provider profile says the page was the last. An in-flight request always
/// completes, but a page that arrives after cancellation is neither ingested
/// nor persisted.
///
/// An auth rejection cancels the session before the error is returned.
pub(crate) async fn run<P>(
    provider: &P,
    session: &mut SyncSession,
    auth: &AuthContext,
    storage: &dyn Storage,
) -> SyncResult<SyncSummary>
where
    P: BankProvider + ?Sized,
{
    let handle = session.handle();
    let result = drive(provider, session, auth, storage).await;
    if let Err(err) = &result {
        if err.is_auth_rejected() {
            handle.cancel();
        }
    }
    result
}

async fn drive<P>(
    provider: &P,
    session: &mut SyncSession,
    auth: &AuthContext,
    storage: &dyn Storage,
) -> SyncResult<SyncSummary>
where
    P: BankProvider + ?Sized,
{
    let handle = session.handle();

    let account = match session.account() {
        Some(account) => account.clone(),
        None => {
            let account = provider.discover_account(auth).await?;
            info!(provider = provider.name(), account = %account.id, "account discovered");
            session.bind_account(account.clone());
            account
        }
    };

    let filter = provider.filter_for(&account);
    let profile = provider.profile();
    let mut summary = SyncSummary {
        exit: LoopExit::Complete,
        pages: 0,
        fetched: 0,
        accepted: 0,
    };

    let mut step = Step::Fetch;
    loop {
        match step {
            Step::Finished(exit) => {
                summary.exit = exit;
                break;
            }
            Step::Fetch if handle.is_cancelled() => {
                step = Step::Finished(LoopExit::Cancelled);
            }
            Step::Fetch => {
                let since = session.cursor().next_lower_bound().to_string();
                let page = provider.fetch_page(&account, &since, auth).await?;
                summary.pages += 1;
                summary.fetched += page.len();

                // Cancelled while the request was in flight: drop the page.
                if handle.is_cancelled() {
                    debug!(
                        provider = provider.name(),
                        page = summary.pages,
                        fetched = page.len(),
                        "page discarded after cancellation"
                    );
                    step = Step::Finished(LoopExit::Cancelled);
                    continue;
                }

                let batch = session.ingest_page(&filter, &page);
                summary.accepted += batch.len();

                if !batch.is_empty() {
                    TravelStore::new(storage)
                        .save(&handle.transactions())
                        .await
                        .map_err(SyncError::Storage)?;
                }

                debug!(
                    provider = provider.name(),
                    page = summary.pages,
                    since = %since,
                    fetched = page.len(),
                    accepted = batch.len(),
                    "page processed"
                );

                if profile.is_final_page(page.len()) {
                    handle.mark_complete();
                    step = Step::Finished(LoopExit::Complete);
                }
            }
        }
    }

    info!(
        provider = provider.name(),
        pages = summary.pages,
        fetched = summary.fetched,
        accepted = summary.accepted,
        exit = ?summary.exit,
        "sync loop finished"
    );

    Ok(summary)
}
