//! Session lifecycle: credentials, provider selection, the fetch loop task,
//! and the periodic aggregation tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregate::{monthly_average, AggregateSnapshot, AggregationEngine};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::credentials::CredentialSource;
use crate::error::SyncError;
use crate::storage::{Storage, TravelStore};

use super::auth::AuthContext;
use super::factory::ProviderFactory;
use super::session::{SessionHandle, SyncSession};
use super::BankProvider;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    #[default]
    Idle,
    Authorizing,
    Syncing,
    Complete,
    LoggedOut,
}

/// What the consumer layer sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupervisorStatus {
    pub state: SupervisorState,
    pub snapshot: AggregateSnapshot,
    pub loading_complete: bool,
    /// Pounds per month over the elapsed window.
    pub monthly_average: Decimal,
    /// Last loop failure, verbatim. Cleared when a new session starts.
    pub error: Option<String>,
}

impl SupervisorStatus {
    /// Nothing more will happen without outside action.
    pub fn is_settled(&self) -> bool {
        self.error.is_some()
            || matches!(
                self.state,
                SupervisorState::Idle | SupervisorState::Complete | SupervisorState::LoggedOut
            )
    }
}

struct ActiveSession {
    provider: Arc<dyn BankProvider>,
    auth: AuthContext,
    handle: SessionHandle,
    tick: JoinHandle<()>,
    sync_task: JoinHandle<()>,
}

impl ActiveSession {
    /// Cancel the loop, stop the tick, and revoke the token with the
    /// provider. Returns the loop task so the caller can wait for it.
    fn revoke(self) -> JoinHandle<()> {
        self.handle.cancel();
        self.tick.abort();
        self.provider.logout(&self.auth);
        self.sync_task
    }
}

/// The single session slot. `Starting` is held by one `start` call while it
/// resolves credentials, tagged so a stale call cannot release a newer one.
#[derive(Default)]
enum SessionSlot {
    #[default]
    Vacant,
    Starting(u64),
    Running(ActiveSession),
}

impl SessionSlot {
    fn running(&self) -> Option<&ActiveSession> {
        match self {
            SessionSlot::Running(active) => Some(active),
            SessionSlot::Vacant | SessionSlot::Starting(_) => None,
        }
    }

    /// Vacate the slot, returning the session if one was running. A pending
    /// `start` loses its reservation and gives up before spawning anything.
    fn vacate(&mut self) -> Option<ActiveSession> {
        match std::mem::take(self) {
            SessionSlot::Running(active) => Some(active),
            SessionSlot::Vacant | SessionSlot::Starting(_) => None,
        }
    }
}

/// Releases a `Starting` reservation on every exit from `start` that did not
/// install a session.
struct StartReservation<'a> {
    supervisor: &'a SyncSupervisor,
    id: u64,
}

impl<'a> StartReservation<'a> {
    fn acquire(supervisor: &'a SyncSupervisor) -> Option<Self> {
        let mut slot = supervisor.lock_active();
        if !matches!(*slot, SessionSlot::Vacant) {
            return None;
        }
        let id = supervisor.inner.next_start.fetch_add(1, Ordering::Relaxed);
        *slot = SessionSlot::Starting(id);
        Some(Self { supervisor, id })
    }

    fn is_held(&self, slot: &SessionSlot) -> bool {
        matches!(slot, SessionSlot::Starting(id) if *id == self.id)
    }
}

impl Drop for StartReservation<'_> {
    fn drop(&mut self) {
        let mut slot = self.supervisor.lock_active();
        if self.is_held(&slot) {
            *slot = SessionSlot::Vacant;
        }
    }
}

struct SupervisorInner {
    sync: SyncConfig,
    credentials: Arc<dyn CredentialSource>,
    factory: Arc<dyn ProviderFactory>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    status: watch::Sender<SupervisorStatus>,
    active: Mutex<SessionSlot>,
    next_start: AtomicU64,
}

/// Drives one sync session at a time and publishes aggregates on a watch
/// channel.
#[derive(Clone)]
pub struct SyncSupervisor {
    inner: Arc<SupervisorInner>,
}

impl SyncSupervisor {
    pub fn new(
        sync: SyncConfig,
        credentials: Arc<dyn CredentialSource>,
        factory: Arc<dyn ProviderFactory>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (status, _) = watch::channel(SupervisorStatus::default());
        Self {
            inner: Arc::new(SupervisorInner {
                sync,
                credentials,
                factory,
                storage,
                clock,
                status,
                active: Mutex::new(SessionSlot::Vacant),
                next_start: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorStatus> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> SupervisorStatus {
        self.inner.status.borrow().clone()
    }

    /// Handle of the running session, if any.
    pub fn session(&self) -> Option<SessionHandle> {
        self.lock_active().running().map(|a| a.handle.clone())
    }

    /// Resolve credentials and a provider, then spawn the fetch loop and the
    /// aggregation tick.
    ///
    /// An unauthorised user leaves the supervisor `Idle`. Starting while a
    /// session is active or another `start` is pending is a no-op, and a
    /// logout during startup abandons it.
    pub async fn start(&self) -> Result<()> {
        let Some(reservation) = StartReservation::acquire(self) else {
            debug!("sync session already active or starting");
            return Ok(());
        };

        self.inner.status.send_modify(|status| {
            status.state = SupervisorState::Authorizing;
            status.error = None;
        });

        let credentials = match self.inner.credentials.credentials().await {
            Ok(credentials) => credentials,
            Err(err) => {
                self.publish_failure(&err.to_string());
                return Err(err);
            }
        };

        let Some(token) = credentials.access_token else {
            info!("no access token available; waiting for authorisation");
            self.set_state(SupervisorState::Idle);
            return Ok(());
        };

        let provider: Arc<dyn BankProvider> =
            match self.inner.factory.create(credentials.current_bank.as_deref()) {
                Ok(provider) => Arc::from(provider),
                Err(err) => {
                    self.publish_failure(&err.to_string());
                    return Err(err.into());
                }
            };

        let session = match SyncSession::open(
            self.inner.storage.as_ref(),
            self.inner.clock.as_ref(),
            self.inner.sync.lookback_months,
        )
        .await
        .context("Failed to load persisted transactions")
        {
            Ok(session) => session,
            Err(err) => {
                self.publish_failure(&format!("{err:#}"));
                return Err(err);
            }
        };

        let auth = AuthContext::bearer(token);
        let handle = session.handle();
        info!(
            provider = provider.name(),
            window_start = %handle.window_start(),
            "starting sync session"
        );

        let mut slot = self.lock_active();
        if !reservation.is_held(&slot) {
            info!("logged out during startup; session abandoned");
            return Ok(());
        }

        self.set_state(SupervisorState::Syncing);
        let tick = self.spawn_tick(handle.clone());
        let sync_task = self.spawn_loop(Arc::clone(&provider), session, auth.clone());
        *slot = SessionSlot::Running(ActiveSession {
            provider,
            auth,
            handle,
            tick,
            sync_task,
        });

        Ok(())
    }

    /// End the session: cancel the loop, revoke the token with the provider
    /// and the credential server, wait for any in-flight page to be dropped,
    /// then clear the persisted snapshot. Publishes `LoggedOut`, then resets
    /// to `Idle`.
    pub async fn logout(&self) -> Result<()> {
        let active = self.lock_active().vacate();
        if let Some(active) = active {
            if let Err(err) = active.revoke().await {
                if err.is_panic() {
                    warn!(error = %err, "sync task panicked");
                }
            }
        }
        self.finish_logout().await
    }

    /// Stop the active session without logging out. Persisted data is kept.
    pub fn stop(&self) {
        if let Some(active) = self.lock_active().vacate() {
            active.handle.cancel();
            active.tick.abort();
        }
    }

    /// Wait until the status is settled: `Complete`, `Idle`, `LoggedOut`,
    /// or carrying an error. Returns immediately if it already is.
    pub async fn wait_until_settled(&self) -> Result<SupervisorStatus> {
        let mut rx = self.subscribe();
        let status = rx
            .wait_for(SupervisorStatus::is_settled)
            .await
            .context("Supervisor status channel closed")?;
        Ok(status.clone())
    }

    fn spawn_loop(
        &self,
        provider: Arc<dyn BankProvider>,
        mut session: SyncSession,
        auth: AuthContext,
    ) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let handle = session.handle();
            let result = provider
                .sync_loop(&mut session, &auth, supervisor.inner.storage.as_ref())
                .await;

            match result {
                Ok(summary) => {
                    debug!(provider = provider.name(), exit = ?summary.exit, "sync task done");
                    if handle.loading_complete() {
                        supervisor.publish_tick(&handle);
                    }
                }
                Err(err) if err.is_auth_rejected() => {
                    warn!(
                        provider = provider.name(),
                        error = %err,
                        "provider rejected token; logging out"
                    );
                    supervisor.force_logout(&handle).await;
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "sync loop failed");
                    supervisor.publish_loop_error(&handle, &err);
                }
            }
        })
    }

    fn spawn_tick(&self, handle: SessionHandle) -> JoinHandle<()> {
        let supervisor = self.clone();
        // `interval` panics on a zero period.
        let period = self.inner.sync.tick_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if handle.is_cancelled() {
                    break;
                }
                supervisor.publish_tick(&handle);
            }
        })
    }

    /// Recompute aggregates from the session's current collection.
    fn publish_tick(&self, handle: &SessionHandle) {
        let now = self.inner.clock.now();
        let window_start = Some(handle.window_start());
        let transactions = handle.transactions();
        let snapshot = AggregationEngine::recompute(&transactions, window_start, now);
        let average = monthly_average(snapshot.full_total, window_start, now);
        let loading_complete = handle.loading_complete();

        // Checked under the channel lock so a tick racing a logout cannot
        // overwrite the logged-out status.
        self.inner.status.send_if_modified(|status| {
            if handle.is_cancelled() {
                return false;
            }
            if !matches!(
                status.state,
                SupervisorState::Syncing | SupervisorState::Complete
            ) {
                return false;
            }
            status.snapshot = snapshot;
            status.monthly_average = average;
            status.loading_complete = loading_complete;
            if loading_complete {
                status.state = SupervisorState::Complete;
            }
            true
        });
    }

    fn publish_loop_error(&self, handle: &SessionHandle, err: &SyncError) {
        if !self.is_active(handle) {
            return;
        }
        let message = err.to_string();
        self.inner.status.send_modify(|status| status.error = Some(message));
    }

    /// Log out in response to the provider rejecting the token, unless the
    /// session has already been replaced or ended. Runs on the loop task, so
    /// the loop is already past its last write.
    async fn force_logout(&self, handle: &SessionHandle) {
        let active = {
            let mut slot = self.lock_active();
            let current = slot
                .running()
                .is_some_and(|active| active.handle.is_same_session(handle));
            if !current {
                return;
            }
            slot.vacate()
        };
        if let Some(active) = active {
            // Our own task; dropping the handle detaches it.
            drop(active.revoke());
        }

        if let Err(err) = self.finish_logout().await {
            warn!(error = %err, "forced logout failed to clear storage");
        }
    }

    async fn finish_logout(&self) -> Result<()> {
        self.inner.credentials.logout();

        let cleared = TravelStore::new(self.inner.storage.as_ref()).clear().await;

        self.inner.status.send_replace(SupervisorStatus {
            state: SupervisorState::LoggedOut,
            ..SupervisorStatus::default()
        });
        info!("logged out");
        self.inner.status.send_replace(SupervisorStatus::default());

        cleared.context("Failed to clear persisted transactions")
    }

    fn is_active(&self, handle: &SessionHandle) -> bool {
        self.lock_active()
            .running()
            .is_some_and(|active| active.handle.is_same_session(handle))
    }

    fn set_state(&self, state: SupervisorState) {
        self.inner.status.send_modify(|status| status.state = state);
    }

    fn publish_failure(&self, message: &str) {
        let message = message.to_string();
        self.inner.status.send_modify(|status| {
            status.state = SupervisorState::Idle;
            status.error = Some(message);
        });
    }

    fn lock_active(&self) -> MutexGuard<'_, SessionSlot> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
