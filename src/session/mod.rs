//! Client-side session synchronization.
//!
//! `SessionSync` owns the authenticated-user value and is its only writer.
//! Four sources feed it: the initial/periodic `/auth/me` fetch, explicit
//! login/logout, the cross-tab signal file, and push events from the
//! realtime channel. Consumers read snapshots through a `watch` receiver and
//! listen on the derived [`SyncEvent`] broadcast; they never mutate state or
//! subscribe to the raw push channel themselves.
//!
//! Every write carries a ticket from a monotonic counter, and fetches ticket
//! when the request is *sent*: a response that raced with a newer write gets
//! discarded instead of clobbering it. Push-driven mutations ticket at apply
//! time, so an in-flight poll can never roll back a role change; the
//! reconciling fetch that follows each mutation still lets the server have
//! the last word.

mod signal;

pub use signal::{SignalFile, SignalRecord};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::SessionConfig;
use crate::error::{ClientError, Result};
use crate::realtime::{PushClient, RealtimeEvent};
use crate::types::{PushEvent, Role, Session, SyncEvent};

pub struct SessionSync {
    api: ApiClient,
    config: SessionConfig,
    signal: SignalFile,
    state: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SyncEvent>,
    tickets: AtomicU64,
    applied: Mutex<u64>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionSync {
    pub fn new(api: ApiClient, config: SessionConfig) -> Arc<Self> {
        let signal = SignalFile::new(config.signal_path.clone());
        let (state, _) = watch::channel(None);
        let (events, _) = broadcast::channel(64);

        Arc::new(Self {
            api,
            config,
            signal,
            state,
            events,
            tickets: AtomicU64::new(0),
            applied: Mutex::new(0),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Read-only snapshot stream of the held session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Derived notification stream (see [`SyncEvent`]).
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install `value` unless a newer write already landed. Keeps the bearer
    /// slot consistent with the held session and announces real changes.
    fn apply(&self, ticket: u64, value: Option<Session>) -> bool {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        if ticket <= *applied {
            debug!("discarding stale session write (ticket {} <= {})", ticket, *applied);
            return false;
        }
        *applied = ticket;

        match &value {
            None => self.api.set_bearer(None),
            Some(session) if session.token.is_some() => self.api.set_bearer(session.token.clone()),
            _ => {}
        }

        let old = self.state.send_replace(value.clone());
        if old != value {
            let _ = self.events.send(SyncEvent::SessionReplaced(value));
        }
        true
    }

    fn write_signal(&self) {
        if let Err(err) = self.signal.write() {
            warn!("cross-tab signal write failed: {}", err);
        }
    }

    /// Authoritative session check against `/auth/me`.
    ///
    /// Network and shape failures are fail-closed: the session is treated as
    /// absent rather than left stale, and the next poll tick retries.
    pub async fn fetch_session(self: &Arc<Self>) -> Option<Session> {
        let ticket = self.ticket();
        match self.api.me().await {
            Ok(session) => {
                self.apply(ticket, session.clone());
                session
            }
            Err(ClientError::AccountDeleted) => {
                self.force_logout("account has been deleted by an administrator").await;
                None
            }
            Err(err) => {
                debug!("session check failed, treating as logged out: {}", err);
                self.apply(ticket, None);
                None
            }
        }
    }

    /// Authenticate and hold the returned session. Sibling tabs are told to
    /// revalidate through the signal file.
    pub async fn login(self: &Arc<Self>, email: &str, password: &str) -> Result<Session> {
        let ticket = self.ticket();
        let session = self.api.login(email, password).await?;
        self.apply(ticket, Some(session.clone()));
        self.write_signal();
        Ok(session)
    }

    /// Clear the session locally no matter what the server says about it.
    pub async fn logout(self: &Arc<Self>) {
        if let Err(err) = self.api.logout().await {
            warn!("logout request failed, clearing local session anyway: {}", err);
        }
        let ticket = self.ticket();
        self.apply(ticket, None);
        self.write_signal();
    }

    /// Push-driven role mutation. Applies immediately when the subject is
    /// the current user, then schedules the reconciling fetch.
    pub fn apply_role_change(self: &Arc<Self>, subject_id: &str, new_role: Role) {
        let Some(mut session) = self.current() else { return };
        if session.id != subject_id {
            return;
        }

        info!("role changed: {} -> {}", session.role, new_role);
        session.role = new_role;
        let ticket = self.ticket();
        if self.apply(ticket, Some(session)) {
            let _ = self.events.send(SyncEvent::RoleUpdated(new_role));
        }

        let this = Arc::clone(self);
        let delay = Duration::from_millis(self.config.reconcile_delay_ms);
        self.track(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fetch_session().await;
        }));
    }

    /// Push-driven account removal. Only the affected client logs out.
    pub async fn apply_account_deleted(self: &Arc<Self>, subject_id: &str) {
        let matches = self
            .state
            .borrow()
            .as_ref()
            .map(|session| session.id == subject_id)
            .unwrap_or(false);
        if matches {
            self.force_logout("account has been deleted by an administrator").await;
        }
    }

    async fn force_logout(&self, reason: &str) {
        warn!("forcing logout: {}", reason);
        if let Err(err) = self.api.logout().await {
            debug!("server-side logout failed during forced logout: {}", err);
        }
        let ticket = self.ticket();
        self.apply(ticket, None);
        self.write_signal();
        let _ = self.events.send(SyncEvent::ForcedLogout { reason: reason.to_string() });
    }

    /// Start the background sources: the poll timer, the signal watcher,
    /// and (when a push client is supplied) the push-event pump. All spawned
    /// tasks are owned here and aborted by [`shutdown`](Self::shutdown).
    pub fn start(self: &Arc<Self>, push: Option<&PushClient>) {
        let this = Arc::clone(self);
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        self.track(tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                this.fetch_session().await;
            }
        }));

        let this = Arc::clone(self);
        let signal = self.signal.clone();
        let signal_poll = Duration::from_millis(self.config.signal_poll_ms);
        self.track(tokio::spawn(async move {
            let mut last_seen = signal.load();
            loop {
                tokio::time::sleep(signal_poll).await;
                let Some(record) = signal.load() else { continue };
                if last_seen == Some(record) {
                    continue;
                }
                last_seen = Some(record);
                if signal.is_foreign(&record) {
                    debug!("cross-tab signal changed, revalidating session");
                    this.fetch_session().await;
                }
            }
        }));

        if let Some(push) = push {
            let this = Arc::clone(self);
            let mut receiver = push.subscribe();
            self.track(tokio::spawn(async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) => this.handle_realtime(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed pushes are recovered by a plain refetch
                            warn!("push pump lagged by {} events, revalidating", skipped);
                            this.fetch_session().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }
    }

    async fn handle_realtime(self: &Arc<Self>, event: RealtimeEvent) {
        match event {
            RealtimeEvent::Connected => {
                // Pushes may have been missed while offline
                self.fetch_session().await;
            }
            RealtimeEvent::Disconnected => {}
            RealtimeEvent::Push(PushEvent::RoleChanged { user_id, new_role }) => {
                self.apply_role_change(&user_id, new_role);
            }
            RealtimeEvent::Push(PushEvent::UserCreated { user }) => {
                let _ = self.events.send(SyncEvent::UserListChanged(user));
            }
            RealtimeEvent::Push(PushEvent::UserDeleted { user_id }) => {
                self.apply_account_deleted(&user_id).await;
                let _ = self
                    .events
                    .send(SyncEvent::UserListChanged(serde_json::json!({ "userId": user_id })));
            }
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Stop every background task. Safe to call more than once.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.shutdown();
    }
}
