use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tudu_core::{
    ItemId, MemStore, Msg, Operation, Outcome, Record, RemoteError, RemoteResult, RemoteStore,
    Session, SessionConfig, Snapshot, Subscription, Write, DEFAULT_COLLECTION,
};

/// Sends one empty snapshot and then hangs up; every write fails.
struct HangUpStore;

#[async_trait]
impl RemoteStore for HangUpStore {
    async fn subscribe(&self, _path: &str, _order_by: &str) -> RemoteResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Snapshot::absent());
        Ok(Subscription::new(rx))
    }

    async fn create(&self, _path: &str, _record: Record) -> RemoteResult<ItemId> {
        Err(RemoteError::new(Operation::Create, "hung up"))
    }

    async fn delete(&self, _path: &str, _id: &str) -> RemoteResult<()> {
        Err(RemoteError::new(Operation::Delete, "hung up"))
    }

    async fn patch(&self, _path: &str, _id: &str, _record: Record) -> RemoteResult<()> {
        Err(RemoteError::new(Operation::Patch, "hung up"))
    }
}

async fn start(store: &Arc<MemStore>) -> Session {
    let mut session = Session::start(store.clone(), SessionConfig::default())
        .await
        .expect("subscribe");
    session.next_snapshot().await;
    session
}

#[tokio::test]
async fn create_update_delete_round_trip() {
    let store = Arc::new(MemStore::new());
    let mut session = start(&store).await;
    assert!(session.state().items.is_empty());

    session.dispatch(Msg::DraftEdited("Buy milk".into()));
    session.dispatch(Msg::AddRequested);
    session.flush().await;
    let items = &session.state().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Buy milk");
    assert!(!items[0].id.is_empty());
    assert!(session.state().draft_title.is_empty());
    let id = items[0].id.clone();

    session.dispatch(Msg::ItemEdited {
        id: id.clone(),
        title: "Buy oat milk".into(),
    });
    session.flush().await;
    assert_eq!(session.state().items.len(), 1);
    assert_eq!(session.state().items[0].title, "Buy oat milk");

    session.dispatch(Msg::DeleteRequested(id.clone()));
    session.flush().await;
    assert!(session.state().items.is_empty());

    assert_eq!(
        session.take_outcomes(),
        [
            Outcome::Created(id.clone()),
            Outcome::Patched(id.clone()),
            Outcome::Deleted(id.clone()),
        ]
    );
    assert_eq!(store.writes().len(), 3);
}

#[tokio::test]
async fn writes_from_other_clients_show_up() {
    let store = Arc::new(MemStore::new());
    let mut session = start(&store).await;
    let seen = session.snapshots_seen();

    store.seed(DEFAULT_COLLECTION, "walk dog");
    session.next_snapshot().await;
    assert_eq!(session.snapshots_seen(), seen + 1);
    assert_eq!(session.state().items[0].title, "walk dog");
}

#[tokio::test]
async fn failed_create_keeps_the_draft() {
    let store = Arc::new(MemStore::new());
    let mut session = start(&store).await;
    store.set_offline(true);

    session.dispatch(Msg::DraftEdited("Buy milk".into()));
    session.dispatch(Msg::AddRequested);
    session.flush().await;

    assert_eq!(session.state().draft_title, "Buy milk");
    assert!(session.state().items.is_empty());
    let outcomes = session.take_outcomes();
    assert!(matches!(
        outcomes.as_slice(),
        [Outcome::Failed(err)] if err.op == Operation::Create
    ));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn failed_delete_leaves_the_item() {
    let store = Arc::new(MemStore::new());
    let id = store.seed(DEFAULT_COLLECTION, "keep me");
    let mut session = start(&store).await;
    store.set_offline(true);

    session.dispatch(Msg::DeleteRequested(id));
    session.flush().await;
    assert_eq!(session.state().items.len(), 1);
}

#[tokio::test]
async fn keystroke_patches_all_reach_the_store() {
    let store = Arc::new(MemStore::new());
    let id = store.seed(DEFAULT_COLLECTION, "");
    let mut session = start(&store).await;

    for title in ["c", "ca", "cat"] {
        session.dispatch(Msg::ItemEdited {
            id: id.clone(),
            title: title.into(),
        });
    }
    session.flush().await;
    let mut patched: Vec<String> = store
        .writes()
        .into_iter()
        .filter_map(|w| match w {
            Write::Patch { title, .. } => Some(title),
            _ => None,
        })
        .collect();
    // One task per keystroke, so they may land out of order and "ca" can
    // be what sticks. Last write wins.
    let stored = store.items(DEFAULT_COLLECTION)[0].title.clone();
    assert_eq!(patched.last(), Some(&stored));
    patched.sort();
    assert_eq!(patched, ["c", "ca", "cat"]);
}

#[tokio::test]
async fn shutdown_releases_the_subscription() {
    let store = Arc::new(MemStore::new());
    let session = start(&store).await;
    assert!(session.is_subscribed());
    assert_eq!(store.subscriber_count(DEFAULT_COLLECTION), 1);

    session.shutdown();
    assert_eq!(store.subscriber_count(DEFAULT_COLLECTION), 0);
}

#[tokio::test]
async fn next_returns_once_the_stream_is_gone() {
    let mut session = Session::start(Arc::new(HangUpStore), SessionConfig::default())
        .await
        .expect("subscribe");
    session.next_snapshot().await;
    assert_eq!(session.snapshots_seen(), 1);

    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        // observes the hang-up
        session.next().await;
        assert!(!session.is_subscribed());
        // nothing left to wait for
        session.next().await;

        // a request still in flight is waited for
        session.dispatch(Msg::DraftEdited("milk".into()));
        session.dispatch(Msg::AddRequested);
        session.next().await;
        session.next().await;
    })
    .await;
    assert!(waited.is_ok(), "next() blocked after the stream ended");
    assert!(matches!(
        session.take_outcomes().as_slice(),
        [Outcome::Failed(err)] if err.op == Operation::Create
    ));
    assert_eq!(session.state().draft_title, "milk");
}
