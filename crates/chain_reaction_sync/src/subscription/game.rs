//! # Game Subscription
//!
//! Keeps one game's reconciled state and player ledger current.
//!
//! | Task          | Cursor              | Feeds                              |
//! |---------------|---------------------|------------------------------------|
//! | state poller  | current event count | dedup → trigger filter → refresh   |
//! | ledger poller | 0                   | `PlayerLedger`                     |
//! | ticker        | -                   | fallback refresh                   |
//! | actor         | -                   | owns both, publishes `GameView`    |
//!
//! At most one reconciliation runs at a time. A refresh requested while one
//! is in flight runs once more after it completes. Consumer refresh requests
//! bypass the mailbox, so a busy mailbox never loses one.

use std::sync::Arc;

use chain_reaction_core::events::is_refresh_trigger;
use chain_reaction_core::{
    derive_ui_state, Address, Clock, GameState, ParticipantEntry, SyncResult, UiState,
};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use super::{
    decode_event, initial_cursor, poll_events, tick_every, PollOutcome, RunFlag, TaskGroup, MAILBOX,
};
use crate::config::SyncConfig;
use crate::dedup::Deduplicator;
use crate::ledger::PlayerLedger;
use crate::reconciler::Reconciler;
use crate::remote::{EventLog, StateQuery};

/// Consumer-visible snapshot of one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    /// Last reconciled state. Kept when a later refresh fails.
    pub state: Option<GameState>,
    /// Current epoch's participants, by position.
    pub players: Vec<ParticipantEntry>,
    /// Number of participants in `players`.
    pub player_count: usize,
    /// Set until the first reconciliation finishes.
    pub is_loading: bool,
    /// Error of the last reconciliation, if it failed.
    pub error: Option<String>,
}

impl Default for GameView {
    fn default() -> Self {
        Self {
            state: None,
            players: Vec::new(),
            player_count: 0,
            is_loading: true,
            error: None,
        }
    }
}

impl GameView {
    /// UI state at `now_ms`.
    #[must_use]
    pub fn ui_state(&self, now_ms: u64) -> UiState {
        derive_ui_state(self.state.as_ref(), self.is_loading, self.error.as_deref(), now_ms)
    }
}

#[derive(Debug)]
enum GameMsg {
    StateEvents(PollOutcome),
    LedgerEvents(PollOutcome),
    Refresh,
}

/// Live subscription to one game contract.
///
/// Dropping it tears the subscription down.
pub struct GameSubscription {
    address: Address,
    view: watch::Receiver<GameView>,
    refresh: Arc<Notify>,
    tasks: TaskGroup,
}

impl GameSubscription {
    /// Starts watching the game at `address`. Must be called inside a
    /// tokio runtime.
    pub fn spawn<N>(node: Arc<N>, clock: Arc<dyn Clock>, config: &SyncConfig, address: Address) -> Self
    where
        N: StateQuery + EventLog,
    {
        let polling = &config.polling;
        let (mailbox, inbox) = mpsc::channel(MAILBOX);
        let (publisher, view) = watch::channel(GameView::default());
        let refresh = Arc::new(Notify::new());
        let mut tasks = TaskGroup::new();

        let actor = GameActor {
            address: address.clone(),
            reconciler: Reconciler::new(Arc::clone(&node), clock),
            running: tasks.flag(),
            publisher,
            dedup: Deduplicator::new(),
            ledger: PlayerLedger::new(),
            in_flight: JoinSet::new(),
            refresh_pending: false,
        };
        tasks.spawn(actor.run(inbox, Arc::clone(&refresh)));

        let state_poller = {
            let node = Arc::clone(&node);
            let address = address.clone();
            let running = tasks.flag();
            let mailbox = mailbox.clone();
            let period = polling.event_poll();
            async move {
                let start = initial_cursor(&*node, &address).await;
                debug!(address = %address, cursor = start, "state poller subscribed");
                poll_events(node, address, start, period, running, mailbox, GameMsg::StateEvents).await;
            }
        };
        tasks.spawn(state_poller);

        tasks.spawn(poll_events(
            node,
            address.clone(),
            0,
            polling.event_poll(),
            tasks.flag(),
            mailbox.clone(),
            GameMsg::LedgerEvents,
        ));
        tasks.spawn(tick_every(
            polling.fallback_refresh(),
            tasks.flag(),
            mailbox,
            || GameMsg::Refresh,
        ));

        info!(address = %address, "game subscription started");
        Self {
            address,
            view,
            refresh,
            tasks,
        }
    }

    /// Watched contract.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Current snapshot.
    #[must_use]
    pub fn view(&self) -> GameView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<GameView> {
        self.view.clone()
    }

    /// Requests an immediate reconciliation. Requests made before the
    /// actor gets to them collapse into one.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Whether the subscription is still running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.tasks.is_running()
    }

    /// Stops every task. Later results are discarded.
    pub fn cancel(&mut self) {
        if self.tasks.is_running() {
            info!(address = %self.address, "game subscription cancelled");
        }
        self.tasks.shutdown();
    }
}

impl Drop for GameSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// ACTOR
// =============================================================================

struct GameActor<N> {
    address: Address,
    reconciler: Reconciler<N>,
    running: RunFlag,
    publisher: watch::Sender<GameView>,
    dedup: Deduplicator,
    ledger: PlayerLedger,
    in_flight: JoinSet<SyncResult<GameState>>,
    refresh_pending: bool,
}

impl<N: StateQuery> GameActor<N> {
    async fn run(mut self, mut inbox: mpsc::Receiver<GameMsg>, refresh: Arc<Notify>) {
        self.request_refresh();
        loop {
            tokio::select! {
                msg = inbox.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                () = refresh.notified() => self.request_refresh(),
                Some(done) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.finish_refresh(done);
                }
            }
            if !self.running.is_running() {
                break;
            }
        }
    }

    fn handle(&mut self, msg: GameMsg) {
        match msg {
            GameMsg::Refresh => self.request_refresh(),
            GameMsg::StateEvents(PollOutcome::Events(events)) => {
                let mut triggered = false;
                for raw in &events {
                    if self.dedup.admit(raw.identity()) && is_refresh_trigger(&raw.name) {
                        debug!(address = %self.address, event = %raw.name, id = %raw.identity(), "state event");
                        triggered = true;
                    }
                }
                if triggered {
                    self.request_refresh();
                }
            }
            GameMsg::LedgerEvents(PollOutcome::Events(events)) => {
                let mut changed = false;
                for raw in &events {
                    if let Some(event) = decode_event(&self.address, raw) {
                        changed |= self.ledger.apply(&event);
                    }
                }
                if changed {
                    let players = self.ledger.ascending();
                    let player_count = self.ledger.count();
                    self.publish(|view| {
                        view.players = players;
                        view.player_count = player_count;
                        true
                    });
                }
            }
            // Logged by the poller; the next tick retries.
            GameMsg::StateEvents(PollOutcome::Failed(_)) | GameMsg::LedgerEvents(PollOutcome::Failed(_)) => {}
        }
    }

    fn request_refresh(&mut self) {
        if !self.in_flight.is_empty() {
            self.refresh_pending = true;
            return;
        }
        let reconciler = self.reconciler.clone();
        let address = self.address.clone();
        self.in_flight
            .spawn(async move { reconciler.reconcile(&address).await });
    }

    fn finish_refresh(&mut self, done: Result<SyncResult<GameState>, JoinError>) {
        match done {
            Ok(Ok(state)) => self.publish(|view| {
                let modified = view.is_loading || view.error.is_some() || view.state.as_ref() != Some(&state);
                view.state = Some(state);
                view.error = None;
                view.is_loading = false;
                modified
            }),
            Ok(Err(e)) => {
                debug!(address = %self.address, error = %e, "refresh failed, keeping cached state");
                let error = e.to_string();
                self.publish(|view| {
                    let modified = view.is_loading || view.error.as_deref() != Some(error.as_str());
                    view.error = Some(error);
                    view.is_loading = false;
                    modified
                });
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(address = %self.address, error = %e, "refresh task panicked"),
        }

        if self.refresh_pending {
            self.refresh_pending = false;
            self.request_refresh();
        }
    }

    /// `update` returns whether it changed the view.
    fn publish(&self, update: impl FnOnce(&mut GameView) -> bool) {
        if self.running.is_running() {
            self.publisher.send_if_modified(update);
        }
    }
}
