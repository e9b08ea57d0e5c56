//! # Registry Subscription
//!
//! Follows the factory's event stream from the start and keeps every
//! created game listed with its latest state.
//!
//! A discovered game is listed immediately. Its state and asset are filled
//! in by a background reconciliation, and every known game is reconciled
//! again on the registry refresh interval. A failed reconciliation keeps
//! whatever the entry showed before.
//!
//! At most one reconciliation per game runs at a time. A refresh that
//! arrives meanwhile runs once, after the running one finishes, so results
//! are applied in request order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chain_reaction_core::{Address, AssetInfo, Clock, ContractId, GameState, SyncResult};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, info, warn};

use super::{decode_event, poll_events, send_after, tick_every, PollOutcome, RunFlag, TaskGroup, MAILBOX};
use crate::config::SyncConfig;
use crate::reconciler::Reconciler;
use crate::registry::{Registry, RegistryEntry};
use crate::remote::{AssetResolver, EventLog, StateQuery};

/// Consumer-visible snapshot of the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryView {
    /// Known games, newest first.
    pub entries: Vec<RegistryEntry>,
    /// Set until the first discovery, the first poll failure or the
    /// silence timeout.
    pub is_loading: bool,
    /// Error of the last factory poll, if it failed.
    pub error: Option<String>,
}

impl Default for RegistryView {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

#[derive(Debug)]
enum RegistryMsg {
    Factory(PollOutcome),
    RefreshAll,
    LoadingTimeout,
}

type Reconciled = (ContractId, SyncResult<(GameState, AssetInfo)>);

/// Live subscription to the factory.
pub struct RegistrySubscription {
    view: watch::Receiver<RegistryView>,
    tasks: TaskGroup,
}

impl RegistrySubscription {
    /// Starts following the configured factory. Must be called inside a
    /// tokio runtime.
    pub fn spawn<N, A>(node: Arc<N>, assets: Arc<A>, clock: Arc<dyn Clock>, config: &SyncConfig) -> Self
    where
        N: StateQuery + EventLog,
        A: AssetResolver,
    {
        let polling = &config.polling;
        let factory = config.factory_address.clone();
        let (mailbox, inbox) = mpsc::channel(MAILBOX);
        let (publisher, view) = watch::channel(RegistryView::default());
        let mut tasks = TaskGroup::new();

        let actor = RegistryActor {
            factory: factory.clone(),
            reconciler: Reconciler::new(Arc::clone(&node), clock),
            assets,
            running: tasks.flag(),
            publisher,
            registry: Registry::new(),
            in_flight: JoinSet::new(),
            pending: HashMap::new(),
            stale: HashSet::new(),
        };
        tasks.spawn(actor.run(inbox));

        tasks.spawn(poll_events(
            node,
            factory.clone(),
            0,
            polling.event_poll(),
            tasks.flag(),
            mailbox.clone(),
            RegistryMsg::Factory,
        ));
        tasks.spawn(tick_every(
            polling.registry_refresh(),
            tasks.flag(),
            mailbox.clone(),
            || RegistryMsg::RefreshAll,
        ));
        tasks.spawn(send_after(
            polling.loading_timeout(),
            tasks.flag(),
            mailbox,
            RegistryMsg::LoadingTimeout,
        ));

        info!(factory = %factory, "registry subscription started");
        Self { view, tasks }
    }

    /// Current snapshot.
    #[must_use]
    pub fn view(&self) -> RegistryView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<RegistryView> {
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

// =============================================================================
// ACTOR
// =============================================================================

struct RegistryActor<N, A> {
    factory: Address,
    reconciler: Reconciler<N>,
    assets: Arc<A>,
    running: RunFlag,
    publisher: watch::Sender<RegistryView>,
    registry: Registry,
    in_flight: JoinSet<Reconciled>,
    /// Games with a reconciliation running.
    pending: HashMap<ContractId, AbortHandle>,
    /// Games asked to refresh while theirs was running.
    stale: HashSet<ContractId>,
}

impl<N: StateQuery, A: AssetResolver> RegistryActor<N, A> {
    async fn run(mut self, mut inbox: mpsc::Receiver<RegistryMsg>) {
        loop {
            tokio::select! {
                msg = inbox.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                Some(done) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.finish(done);
                }
            }
            if !self.running.is_running() {
                break;
            }
        }
    }

    fn handle(&mut self, msg: RegistryMsg) {
        match msg {
            RegistryMsg::Factory(PollOutcome::Events(events)) => {
                let mut discovered = Vec::new();
                for raw in &events {
                    let Some(event) = decode_event(&self.factory, raw) else {
                        continue;
                    };
                    if let Some(entry) = self.registry.discover(&event) {
                        info!(game_id = entry.game_id, address = %entry.address, "game discovered");
                        discovered.push(entry);
                    }
                }
                for entry in &discovered {
                    self.reconcile(entry.contract_id, entry.address.clone());
                }

                let entries = (!discovered.is_empty()).then(|| self.registry.sorted());
                self.publish(|view| {
                    let mut modified = view.error.take().is_some();
                    if let Some(entries) = entries {
                        view.entries = entries;
                        view.is_loading = false;
                        modified = true;
                    }
                    modified
                });
            }
            RegistryMsg::Factory(PollOutcome::Failed(e)) => {
                let error = e.to_string();
                self.publish(|view| {
                    view.error = Some(error);
                    view.is_loading = false;
                    true
                });
            }
            RegistryMsg::RefreshAll => {
                debug!(games = self.registry.len(), "refreshing registry");
                for (contract_id, address) in self.registry.targets() {
                    self.reconcile(contract_id, address);
                }
            }
            RegistryMsg::LoadingTimeout => self.publish(|view| std::mem::replace(&mut view.is_loading, false)),
        }
    }

    fn reconcile(&mut self, contract_id: ContractId, address: Address) {
        if self.pending.contains_key(&contract_id) {
            self.stale.insert(contract_id);
            return;
        }
        let reconciler = self.reconciler.clone();
        let assets = Arc::clone(&self.assets);
        let task = self.in_flight.spawn(async move {
            let result = load_entry(&reconciler, &*assets, &address).await;
            (contract_id, result)
        });
        self.pending.insert(contract_id, task);
    }

    fn finish(&mut self, done: Result<Reconciled, JoinError>) {
        match done {
            Ok((contract_id, result)) => {
                self.pending.remove(&contract_id);
                match result {
                    Ok((state, asset)) => {
                        if self.registry.update(&contract_id, state, asset) {
                            let entries = self.registry.sorted();
                            self.publish(|view| {
                                view.entries = entries;
                                true
                            });
                        }
                    }
                    Err(e) => {
                        debug!(contract = %contract_id, error = %e, "game refresh failed, keeping previous entry");
                    }
                }
                if self.stale.remove(&contract_id) {
                    if let Some(address) = self.registry.get(&contract_id).map(|e| e.address.clone()) {
                        self.reconcile(contract_id, address);
                    }
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(error = %e, "registry refresh task panicked");
                self.pending.retain(|_, task| !task.is_finished());
            }
        }
    }

    /// `update` returns whether it changed the view.
    fn publish(&self, update: impl FnOnce(&mut RegistryView) -> bool) {
        if self.running.is_running() {
            self.publisher.send_if_modified(update);
        }
    }
}

async fn load_entry<N: StateQuery, A: AssetResolver>(
    reconciler: &Reconciler<N>,
    assets: &A,
    address: &Address,
) -> SyncResult<(GameState, AssetInfo)> {
    let state = reconciler.reconcile(address).await?;
    let asset = assets.resolve(state.fields.asset_id).await;
    Ok((state, asset))
}
