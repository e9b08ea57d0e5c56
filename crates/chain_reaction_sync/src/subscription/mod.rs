//! # Subscriptions
//!
//! Long-lived observers of contract state. Each subscription is a small
//! set of tokio tasks around one actor that owns all mutable state:
//!
//! ```text
//! ┌──────────────┐
//! │ event poller │──┐
//! └──────────────┘  │    ┌──────────┐  refresh   ┌────────────┐
//! ┌──────────────┐  ├──▶ │  actor   │ ─────────▶ │ reconciler │
//! │ event poller │──┤    │ (mpsc)   │ ◀───────── │ (JoinSet)  │
//! └──────────────┘  │    └────┬─────┘   state    └────────────┘
//! ┌──────────────┐  │         │ watch
//! │   ticker     │──┘         ▼
//! └──────────────┘       view receivers
//! ```
//!
//! Dropping or cancelling a subscription stops its run flag and aborts
//! every task. Results that land after that are discarded.

mod game;
mod leaderboard;
mod registry;

pub use game::{GameSubscription, GameView};
pub use leaderboard::{LeaderboardSource, LeaderboardSubscription, LeaderboardView};
pub use registry::{RegistrySubscription, RegistryView};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chain_reaction_core::{Address, ContractEvent, RawEvent, SyncError, SyncResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::remote::EventLog;

/// Actor mailbox depth.
const MAILBOX: usize = 64;

/// Upper bound on pages drained in one poll cycle.
const MAX_PAGES_PER_CYCLE: usize = 64;

// =============================================================================
// RUN FLAG
// =============================================================================

/// Shared "still running" flag, checked before every delivery.
#[derive(Clone, Debug)]
pub(crate) struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tasks owned by one subscription.
pub(crate) struct TaskGroup {
    running: RunFlag,
    handles: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    pub(crate) fn new() -> Self {
        Self {
            running: RunFlag::new(),
            handles: Vec::new(),
        }
    }

    pub(crate) fn flag(&self) -> RunFlag {
        self.running.clone()
    }

    pub(crate) fn spawn(&mut self, task: impl Future<Output = ()> + Send + 'static) {
        self.handles.push(tokio::spawn(task));
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.is_running()
    }

    /// Stops the flag and aborts every task. Idempotent.
    pub(crate) fn shutdown(&mut self) {
        self.running.stop();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Result of one poll cycle.
#[derive(Debug)]
pub(crate) enum PollOutcome {
    /// Events past the cursor, possibly none.
    Events(Vec<RawEvent>),
    /// The cycle failed; the cursor did not move.
    Failed(SyncError),
}

/// Polls `address`'s event log from `start` every `period` and forwards
/// each cycle's outcome. The first cycle runs immediately.
pub(crate) async fn poll_events<N, M, F>(
    node: Arc<N>,
    address: Address,
    start: u64,
    period: Duration,
    running: RunFlag,
    mailbox: mpsc::Sender<M>,
    wrap: F,
) where
    N: EventLog,
    M: Send + 'static,
    F: Fn(PollOutcome) -> M + Send + 'static,
{
    let mut cursor = start;
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !running.is_running() {
            break;
        }

        let outcome = match drain(&*node, &address, &mut cursor).await {
            Ok(events) => PollOutcome::Events(events),
            Err(e) => {
                debug!(address = %address, cursor, error = %e, "event poll failed");
                PollOutcome::Failed(e)
            }
        };

        if !running.is_running() || mailbox.send(wrap(outcome)).await.is_err() {
            break;
        }
    }
}

/// Fetches pages until the log is exhausted. A failure after the first page
/// keeps what was fetched; the next cycle resumes from there.
async fn drain<N: EventLog>(node: &N, address: &Address, cursor: &mut u64) -> SyncResult<Vec<RawEvent>> {
    let mut events = Vec::new();
    for _ in 0..MAX_PAGES_PER_CYCLE {
        match node.fetch_events(address, *cursor).await {
            Ok(page) => {
                let exhausted = page.events.is_empty() || page.next_start <= *cursor;
                *cursor = page.next_start.max(*cursor);
                events.extend(page.events);
                if exhausted {
                    break;
                }
            }
            Err(e) if events.is_empty() => return Err(e),
            Err(_) => break,
        }
    }
    Ok(events)
}

/// Event count at subscription time, so history is not replayed.
pub(crate) async fn initial_cursor<N: EventLog>(node: &N, address: &Address) -> u64 {
    match node.current_event_count(address).await {
        Ok(count) => count,
        Err(e) => {
            debug!(address = %address, error = %e, "event count unavailable, polling from the start");
            0
        }
    }
}

/// Sends `make()` every `period`, starting one period from now.
pub(crate) async fn tick_every<M, F>(period: Duration, running: RunFlag, mailbox: mpsc::Sender<M>, make: F)
where
    M: Send + 'static,
    F: Fn() -> M + Send + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !running.is_running() || mailbox.send(make()).await.is_err() {
            break;
        }
    }
}

/// Sends `message` once after `delay`.
pub(crate) async fn send_after<M: Send + 'static>(delay: Duration, running: RunFlag, mailbox: mpsc::Sender<M>, message: M) {
    time::sleep(delay).await;
    if running.is_running() {
        let _ = mailbox.send(message).await;
    }
}

/// Decodes a raw event, logging and skipping ones that do not fit.
pub(crate) fn decode_event(address: &Address, raw: &RawEvent) -> Option<ContractEvent> {
    match ContractEvent::decode(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(address = %address, event = %raw.name, id = %raw.identity(), error = %e, "undecodable event skipped");
            None
        }
    }
}
