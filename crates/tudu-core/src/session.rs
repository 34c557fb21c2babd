use crate::controller::{Effect, ListState, Msg};
use crate::debounce::SEARCH_DEBOUNCE;
use crate::error::{RemoteError, RemoteResult};
use crate::model::{ItemId, Record};
use crate::store::{RemoteStore, Snapshot, Subscription, DEFAULT_COLLECTION, ORDER_BY_TITLE};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub collection: String,
    pub order_by: String,
    pub search_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            order_by: ORDER_BY_TITLE.to_string(),
            search_delay: SEARCH_DEBOUNCE,
        }
    }
}

/// How a finished mutation ended, for callers that want to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(ItemId),
    Deleted(ItemId),
    Patched(ItemId),
    Failed(RemoteError),
}

/// Drives a [`ListState`] against a [`RemoteStore`].
///
/// The session owns the state and is only touched from one thread. Store
/// calls run as spawned tasks on the ambient tokio runtime and report back
/// through a channel, so completions and snapshots interleave in whatever
/// order they arrive and are applied one message at a time.
pub struct Session {
    store: Arc<dyn RemoteStore>,
    config: SessionConfig,
    state: ListState,
    subscription: Option<Subscription>,
    completions_tx: mpsc::UnboundedSender<Msg>,
    completions_rx: mpsc::UnboundedReceiver<Msg>,
    inflight: JoinSet<()>,
    outcomes: Vec<Outcome>,
    snapshots_seen: u64,
}

impl Session {
    /// Opens the one subscription this session will hold.
    pub async fn start(store: Arc<dyn RemoteStore>, config: SessionConfig) -> RemoteResult<Self> {
        let subscription = store.subscribe(&config.collection, &config.order_by).await?;
        info!(collection = %config.collection, order_by = %config.order_by, "subscribed");
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            store,
            state: ListState::new(config.search_delay),
            config,
            subscription: Some(subscription),
            completions_tx,
            completions_rx,
            inflight: JoinSet::new(),
            outcomes: Vec::new(),
            snapshots_seen: 0,
        })
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshots_seen(&self) -> u64 {
        self.snapshots_seen
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_live)
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Applies one message and issues whatever requests it produced.
    ///
    /// Must be called from within a tokio runtime context.
    pub fn dispatch(&mut self, msg: Msg) {
        self.note(&msg);
        let state = std::mem::take(&mut self.state);
        let (next, effects) = state.update(msg);
        self.state = next;
        for effect in effects {
            self.run(effect);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.dispatch(Msg::Tick(now));
    }

    /// Applies everything already delivered without waiting. Returns the
    /// number of messages applied.
    pub fn process_pending(&mut self) -> usize {
        self.reap();
        let mut applied = 0;
        loop {
            let msg = match self.subscription.as_mut().and_then(Subscription::try_next) {
                Some(snapshot) => Msg::Snapshot(snapshot),
                None => match self.completions_rx.try_recv() {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            self.dispatch(msg);
            applied += 1;
        }
        applied
    }

    /// Waits for the next snapshot or completion and applies it.
    ///
    /// Returns at once when the stream has ended and no request is in
    /// flight, since nothing could ever arrive.
    pub async fn next(&mut self) {
        self.reap();
        let live = self.is_subscribed();
        if !live && self.inflight.is_empty() {
            if let Ok(msg) = self.completions_rx.try_recv() {
                self.dispatch(msg);
            }
            return;
        }
        let msg = tokio::select! {
            snapshot = recv_snapshot(&mut self.subscription), if live => {
                snapshot.map(Msg::Snapshot)
            }
            msg = self.completions_rx.recv() => msg,
        };
        match msg {
            Some(msg) => self.dispatch(msg),
            None => warn!(collection = %self.config.collection, "snapshot stream ended"),
        }
    }

    /// Waits until at least one more snapshot has been applied.
    pub async fn next_snapshot(&mut self) {
        let seen = self.snapshots_seen;
        loop {
            self.reap();
            let stalled = !self.is_subscribed() && self.inflight.is_empty();
            if self.snapshots_seen != seen || stalled {
                break;
            }
            self.next().await;
        }
    }

    /// Waits for every in-flight request to finish, then applies everything
    /// that was delivered meanwhile.
    pub async fn flush(&mut self) {
        loop {
            while let Some(joined) = self.inflight.join_next().await {
                if let Err(err) = joined {
                    warn!(%err, "mutation task did not finish");
                }
            }
            self.process_pending();
            if self.inflight.is_empty() {
                break;
            }
        }
    }

    /// Mutation outcomes collected since the last call.
    pub fn take_outcomes(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.outcomes)
    }

    /// Releases the subscription. Requests already issued keep running.
    pub fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
            info!(collection = %self.config.collection, "unsubscribed");
        }
    }

    fn note(&mut self, msg: &Msg) {
        let outcome = match msg {
            Msg::Snapshot(_) => {
                self.snapshots_seen += 1;
                return;
            }
            Msg::Created { result, .. } => result.clone().map(Outcome::Created),
            Msg::Deleted { id, result } => result.clone().map(|_| Outcome::Deleted(id.clone())),
            Msg::Patched { id, result } => result.clone().map(|_| Outcome::Patched(id.clone())),
            _ => return,
        };
        self.outcomes.push(outcome.unwrap_or_else(Outcome::Failed));
    }

    fn run(&mut self, effect: Effect) {
        debug!(?effect, "issuing");
        let store = Arc::clone(&self.store);
        let done = self.completions_tx.clone();
        let path = self.config.collection.clone();
        match effect {
            Effect::Create { title } => {
                self.inflight.spawn(async move {
                    let result = store.create(&path, Record::new(title.clone())).await;
                    let _ = done.send(Msg::Created { title, result });
                });
            }
            Effect::Delete { id } => {
                self.inflight.spawn(async move {
                    let result = store.delete(&path, &id).await;
                    let _ = done.send(Msg::Deleted { id, result });
                });
            }
            Effect::Patch { id, title } => {
                self.inflight.spawn(async move {
                    let result = store.patch(&path, &id, Record::new(title)).await;
                    let _ = done.send(Msg::Patched { id, result });
                });
            }
        }
    }

    fn reap(&mut self) {
        while let Some(joined) = self.inflight.try_join_next() {
            if let Err(err) = joined {
                warn!(%err, "mutation task did not finish");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // issued requests are not cancellable
        self.inflight.detach_all();
    }
}

async fn recv_snapshot(subscription: &mut Option<Subscription>) -> Option<Snapshot> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => None,
    }
}
