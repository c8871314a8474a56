//! The live, stateful side of one feed.
//!
//! A [`FeedSession`] combines two sources into one newest-first buffer:
//!
//! ```text
//! PullAdapter  --pages (older)-->  append at the oldest end
//! PushAdapter  --live notes----->  prepend at the newest end
//! ```
//!
//! Every state change happens inside one lock section and is then published
//! as a [`FeedView`] on a watch channel. A generation counter, bumped by
//! [`FeedSession::retry`] and [`FeedSession::dispose`], keeps late pull
//! results and push events from an older generation out of the buffer.
//!
//! Lock order is `live` before `state`. `open`, `retry` and `dispose` hold
//! `live` for their whole run, so generations start and stop one at a time.
//!
//! Notes missed while the push channel is down are not replayed; only the
//! historical side can fill that gap, via [`FeedSession::retry`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{FeedKind, Note};
use crate::feed::buffer::NoteBuffer;
use crate::feed::config::{FeedConfig, InitialPagePolicy};
use crate::feed::dispatcher::FeedRoute;
use crate::feed::FeedError;
use crate::transport::{
    Adapters, PullParams, PushEvent, Subscription, SubscriptionGuard, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Idle,
    Pulling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// Read-only projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    pub notes: Vec<Note>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<FeedError>,
    pub connection: ConnectionState,
}

/// What became of a pull request.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// The page was merged; `received` counts notes in the page
    Applied { received: usize },
    /// The pull failed and `lastError` was set
    Failed(FeedError),
    /// Not issued: already pulling, no more history, or disposed
    Skipped,
    /// Resolved after a retry or dispose and was discarded
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullKind {
    Initial,
    Older,
}

struct PullTicket {
    generation: u64,
    kind: PullKind,
    params: PullParams,
}

struct FeedState {
    buffer: NoteBuffer,
    cursor: Option<String>,
    has_more: bool,
    pull: PullState,
    connection: ConnectionState,
    last_error: Option<FeedError>,
    generation: u64,
    disposed: bool,
}

impl FeedState {
    fn new(dedupe: bool) -> Self {
        Self {
            buffer: NoteBuffer::new(dedupe),
            cursor: None,
            has_more: true,
            pull: PullState::Idle,
            connection: ConnectionState::Disconnected,
            last_error: None,
            generation: 0,
            disposed: false,
        }
    }

    fn view(&self) -> FeedView {
        FeedView {
            notes: self.buffer.to_vec(),
            cursor: self.cursor.clone(),
            has_more: self.has_more,
            is_loading: self.pull == PullState::Pulling,
            error: self.last_error.clone(),
            connection: self.connection,
        }
    }
}

#[derive(Default)]
struct LiveTasks {
    subscription: Option<SubscriptionGuard>,
    pump: Option<JoinHandle<()>>,
    initial_pull: Option<JoinHandle<()>>,
}

impl LiveTasks {
    fn shutdown(&mut self) {
        if let Some(mut guard) = self.subscription.take() {
            guard.dispose();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(pull) = self.initial_pull.take() {
            pull.abort();
        }
    }
}

struct Shared {
    origin: String,
    route: FeedRoute,
    adapters: Adapters,
    initial_page: InitialPagePolicy,
    state: Mutex<FeedState>,
    live: Mutex<LiveTasks>,
    view_tx: watch::Sender<FeedView>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_live(&self) -> MutexGuard<'_, LiveTasks> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FeedState) {
        self.view_tx.send_replace(state.view());
    }

    /// Mark a pull as in flight for the current generation.
    fn ticket(
        &self,
        state: &mut FeedState,
        kind: PullKind,
        cursor: Option<String>,
    ) -> PullTicket {
        state.pull = PullState::Pulling;
        PullTicket {
            generation: state.generation,
            kind,
            params: PullParams {
                cursor,
                extra: self.route.pull_params.clone(),
            },
        }
    }

    /// Open the current generation: channel connecting, first page pulling.
    fn begin_generation(&self, state: &mut FeedState) -> PullTicket {
        if self.route.push.is_some() {
            state.connection = ConnectionState::Connecting;
        }
        self.ticket(state, PullKind::Initial, None)
    }

    fn begin_load_more(&self) -> Option<PullTicket> {
        let mut state = self.lock_state();
        if state.disposed || state.pull == PullState::Pulling || !state.has_more {
            return None;
        }

        // No page has landed yet, so the first page is asked for again
        let ticket = match state.cursor.clone() {
            Some(cursor) => self.ticket(&mut state, PullKind::Older, Some(cursor)),
            None => self.ticket(&mut state, PullKind::Initial, None),
        };
        self.publish(&state);
        Some(ticket)
    }

    async fn run_pull(&self, ticket: PullTicket) -> PullOutcome {
        tracing::debug!(
            "Pulling {} from {} (until {:?})",
            self.route.pull_endpoint,
            self.origin,
            ticket.params.cursor
        );
        let result = self
            .adapters
            .pull
            .pull(self.route.pull_endpoint, &ticket.params)
            .await;
        self.finish_pull(ticket, result)
    }

    fn finish_pull(
        &self,
        ticket: PullTicket,
        result: Result<Vec<Note>, TransportError>,
    ) -> PullOutcome {
        let mut state = self.lock_state();
        if state.disposed || state.generation != ticket.generation {
            tracing::debug!(
                "Discarding stale page for {} feed on {}",
                self.route.kind,
                self.origin
            );
            return PullOutcome::Stale;
        }

        state.pull = PullState::Idle;

        let outcome = match result {
            Ok(page) => {
                let received = page.len();
                let oldest = page.last().map(|note| note.id.clone());

                match ticket.kind {
                    PullKind::Initial => {
                        let merge = self.initial_page == InitialPagePolicy::Merge;
                        if state.buffer.is_empty() || merge {
                            state.buffer.append(page);
                        } else {
                            tracing::debug!(
                                "Live notes arrived first on {}; dropping initial page of {}",
                                self.origin,
                                received
                            );
                        }
                        state.cursor = oldest;
                    }
                    PullKind::Older => {
                        state.buffer.append(page);
                        if oldest.is_some() {
                            state.cursor = oldest;
                        }
                    }
                }

                state.has_more = received > 0;
                // A dropped channel is still dropped after a good page
                if state.connection != ConnectionState::Errored {
                    state.last_error = None;
                }
                tracing::debug!(
                    "Applied {} notes to {} feed on {} ({} held)",
                    received,
                    self.route.kind,
                    self.origin,
                    state.buffer.len()
                );
                PullOutcome::Applied { received }
            }
            Err(e) => {
                let error = FeedError::from(e);
                tracing::warn!(
                    "Pull of {} feed on {} failed: {}",
                    self.route.kind,
                    self.origin,
                    error
                );
                state.last_error = Some(error.clone());
                PullOutcome::Failed(error)
            }
        };

        self.publish(&state);
        outcome
    }

    fn apply_push(&self, generation: u64, event: PushEvent) {
        let mut state = self.lock_state();
        if state.disposed || state.generation != generation {
            return;
        }

        match event {
            PushEvent::Connected => {
                tracing::info!("Stream connected to {}", self.origin);
                state.connection = ConnectionState::Connected;
                state.last_error = None;
            }
            PushEvent::Disconnected => match state.connection {
                ConnectionState::Connected => {
                    tracing::warn!("Stream disconnected from {}", self.origin);
                    state.connection = ConnectionState::Errored;
                    state.last_error = Some(FeedError::ConnectionLost(format!(
                        "Connection lost to {}. Timeline updates may be delayed.",
                        self.origin
                    )));
                }
                ConnectionState::Connecting => {
                    tracing::warn!("Stream to {} failed before connecting", self.origin);
                    state.connection = ConnectionState::Errored;
                    state.last_error = Some(FeedError::Network(format!(
                        "Unable to open stream to {}",
                        self.origin
                    )));
                }
                ConnectionState::Errored | ConnectionState::Disconnected => return,
            },
            PushEvent::Note(note) => {
                let id = note.id.clone();
                if !state.buffer.prepend(note) {
                    tracing::trace!("Skipping duplicate note {}", id);
                    return;
                }
            }
        }

        self.publish(&state);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let live = self.live.get_mut().unwrap_or_else(PoisonError::into_inner);
        live.shutdown();
    }
}

/// One feed's buffer, cursor, and connection. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct FeedSession {
    shared: Arc<Shared>,
}

impl FeedSession {
    /// Create a session and start it: the push subscription and the initial
    /// pull are issued together. Must be called inside a tokio runtime.
    pub fn open(origin: &str, route: FeedRoute, adapters: Adapters, config: &FeedConfig) -> Self {
        let state = FeedState::new(config.dedupe);
        let (view_tx, _) = watch::channel(state.view());

        let session = Self {
            shared: Arc::new(Shared {
                origin: origin.to_string(),
                route,
                adapters,
                initial_page: config.initial_page,
                state: Mutex::new(state),
                live: Mutex::new(LiveTasks::default()),
                view_tx,
            }),
        };

        tracing::debug!("Opening {} feed on {}", session.kind(), origin);
        {
            let mut live = session.shared.lock_live();
            let ticket = {
                let mut state = session.shared.lock_state();
                let ticket = session.shared.begin_generation(&mut state);
                session.shared.publish(&state);
                ticket
            };
            session.launch(&mut live, ticket);
        }
        session
    }

    /// Subscribe and spawn the first pull for the ticket's generation.
    fn launch(&self, live: &mut LiveTasks, ticket: PullTicket) {
        let generation = ticket.generation;

        if let Some(topic) = &self.shared.route.push {
            let Subscription { mut events, guard } = self.shared.adapters.push.subscribe(topic);
            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            let pump = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    let Some(shared) = weak.upgrade() else {
                        break;
                    };
                    shared.apply_push(generation, event);
                }
            });
            live.subscription = Some(guard);
            live.pump = Some(pump);
        }

        let shared = self.shared.clone();
        live.initial_pull = Some(tokio::spawn(async move {
            shared.run_pull(ticket).await;
        }));
    }

    /// Fetch the page older than the current cursor, or the first page again
    /// if none has landed yet.
    ///
    /// A no-op while a pull is in flight or once history is exhausted.
    pub async fn load_more(&self) -> PullOutcome {
        let Some(ticket) = self.shared.begin_load_more() else {
            return PullOutcome::Skipped;
        };

        // Detached: dropping this future must not leave the session pulling
        let shared = self.shared.clone();
        tokio::spawn(async move { shared.run_pull(ticket).await })
            .await
            .unwrap_or(PullOutcome::Stale)
    }

    /// Full resynchronisation: clear everything, then resubscribe and
    /// re-issue the initial pull. In-flight results of the old generation
    /// are discarded.
    pub fn retry(&self) {
        let mut live = self.shared.lock_live();
        let ticket = {
            let mut state = self.shared.lock_state();
            if state.disposed {
                return;
            }
            state.generation += 1;
            state.buffer.clear();
            state.cursor = None;
            state.has_more = true;
            state.last_error = None;
            state.connection = ConnectionState::Disconnected;
            let ticket = self.shared.begin_generation(&mut state);
            self.shared.publish(&state);
            ticket
        };

        tracing::debug!("Retrying {} feed on {}", self.kind(), self.shared.origin);
        live.shutdown();
        self.launch(&mut live, ticket);
    }

    /// Stop the push channel and abandon any in-flight pull. Idempotent.
    pub fn dispose(&self) {
        let mut live = self.shared.lock_live();
        {
            let mut state = self.shared.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.generation += 1;
            state.pull = PullState::Idle;
            state.connection = ConnectionState::Disconnected;
            self.shared.publish(&state);
        }

        tracing::debug!("Disposing {} feed on {}", self.kind(), self.shared.origin);
        live.shutdown();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock_state().disposed
    }

    pub fn view(&self) -> FeedView {
        self.shared.view_tx.borrow().clone()
    }

    /// Subscribe to view updates.
    pub fn watch(&self) -> watch::Receiver<FeedView> {
        self.shared.view_tx.subscribe()
    }

    pub fn kind(&self) -> FeedKind {
        self.shared.route.kind
    }

    pub fn ptr_eq(a: &FeedSession, b: &FeedSession) -> bool {
        Arc::ptr_eq(&a.shared, &b.shared)
    }
}
