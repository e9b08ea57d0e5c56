//! # Leaderboard Subscription
//!
//! Folds every join and payout ever emitted into per-address statistics.
//! By default it reads the factory's combined stream. It can instead read
//! a fixed set of game contracts, one poller per contract.

use std::collections::HashSet;
use std::sync::Arc;

use chain_reaction_core::{Address, ParticipantStats};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::{decode_event, poll_events, send_after, PollOutcome, RunFlag, TaskGroup, MAILBOX};
use crate::config::SyncConfig;
use crate::leaderboard::{rank, Leaderboard, LeaderboardSort};
use crate::remote::EventLog;

/// Where statistics are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaderboardSource {
    /// One combined stream, normally the factory's.
    Factory(Address),
    /// One stream per game contract.
    Contracts(Vec<Address>),
}

impl LeaderboardSource {
    /// The configured factory's stream.
    #[must_use]
    pub fn factory(config: &SyncConfig) -> Self {
        Self::Factory(config.factory_address.clone())
    }

    fn streams(&self) -> Vec<Address> {
        match self {
            Self::Factory(address) => vec![address.clone()],
            Self::Contracts(addresses) => addresses.clone(),
        }
    }
}

/// Consumer-visible snapshot of the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardView {
    /// Every participant, ranked by net profit.
    pub stats: Vec<ParticipantStats>,
    /// Set until the first events, the first poll failure or the silence
    /// timeout.
    pub is_loading: bool,
    /// Error of the last failing stream, while any stream is failing.
    pub error: Option<String>,
}

impl Default for LeaderboardView {
    fn default() -> Self {
        Self {
            stats: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

impl LeaderboardView {
    /// The statistics in another order.
    #[must_use]
    pub fn ranked(&self, sort: LeaderboardSort) -> Vec<ParticipantStats> {
        let mut stats = self.stats.clone();
        rank(&mut stats, sort);
        stats
    }
}

#[derive(Debug)]
enum LeaderboardMsg {
    Events { source: Address, outcome: PollOutcome },
    LoadingTimeout,
}

/// Live leaderboard.
pub struct LeaderboardSubscription {
    view: watch::Receiver<LeaderboardView>,
    tasks: TaskGroup,
}

impl LeaderboardSubscription {
    /// Starts reading `source`. Must be called inside a tokio runtime.
    pub fn spawn<N: EventLog>(node: Arc<N>, config: &SyncConfig, source: LeaderboardSource) -> Self {
        let polling = &config.polling;
        let streams = source.streams();
        let (mailbox, inbox) = mpsc::channel(MAILBOX);
        let (publisher, view) = watch::channel(LeaderboardView::default());
        let mut tasks = TaskGroup::new();

        let actor = LeaderboardActor {
            running: tasks.flag(),
            publisher,
            leaderboard: Leaderboard::new(),
            failing: HashSet::new(),
        };
        tasks.spawn(actor.run(inbox));

        for stream in &streams {
            let source = stream.clone();
            tasks.spawn(poll_events(
                Arc::clone(&node),
                stream.clone(),
                0,
                polling.event_poll(),
                tasks.flag(),
                mailbox.clone(),
                move |outcome| LeaderboardMsg::Events {
                    source: source.clone(),
                    outcome,
                },
            ));
        }
        tasks.spawn(send_after(
            polling.loading_timeout(),
            tasks.flag(),
            mailbox,
            LeaderboardMsg::LoadingTimeout,
        ));

        info!(streams = streams.len(), "leaderboard subscription started");
        Self { view, tasks }
    }

    /// Current snapshot.
    #[must_use]
    pub fn view(&self) -> LeaderboardView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LeaderboardView> {
        self.view.clone()
    }

    /// Whether the subscription is still running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.tasks.is_running()
    }

    /// Stops every task.
    pub fn cancel(&mut self) {
        self.tasks.shutdown();
    }
}

struct LeaderboardActor {
    running: RunFlag,
    publisher: watch::Sender<LeaderboardView>,
    leaderboard: Leaderboard,
    failing: HashSet<Address>,
}

impl LeaderboardActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<LeaderboardMsg>) {
        while let Some(msg) = inbox.recv().await {
            if !self.running.is_running() {
                break;
            }
            self.handle(msg);
        }
    }

    fn handle(&mut self, msg: LeaderboardMsg) {
        match msg {
            LeaderboardMsg::Events {
                source,
                outcome: PollOutcome::Events(events),
            } => {
                let mut changed = false;
                for raw in &events {
                    if let Some(event) = decode_event(&source, raw) {
                        changed |= self.leaderboard.apply(&source, &event);
                    }
                }
                let recovered = self.failing.remove(&source) && self.failing.is_empty();
                if changed {
                    debug!(source = %source, participants = self.leaderboard.len(), "leaderboard updated");
                }

                let stats = changed.then(|| self.leaderboard.ranked(LeaderboardSort::NetProfit));
                let seen_events = !events.is_empty();
                self.publish(|view| {
                    let mut modified = false;
                    if let Some(stats) = stats {
                        view.stats = stats;
                        modified = true;
                    }
                    if seen_events && view.is_loading {
                        view.is_loading = false;
                        modified = true;
                    }
                    if recovered {
                        view.error = None;
                        modified = true;
                    }
                    modified
                });
            }
            LeaderboardMsg::Events {
                source,
                outcome: PollOutcome::Failed(e),
            } => {
                self.failing.insert(source);
                let error = e.to_string();
                self.publish(|view| {
                    view.error = Some(error);
                    view.is_loading = false;
                    true
                });
            }
            LeaderboardMsg::LoadingTimeout => self.publish(|view| std::mem::replace(&mut view.is_loading, false)),
        }
    }

    /// `update` returns whether it changed the view.
    fn publish(&self, update: impl FnOnce(&mut LeaderboardView) -> bool) {
        if self.running.is_running() {
            self.publisher.send_if_modified(update);
        }
    }
}
