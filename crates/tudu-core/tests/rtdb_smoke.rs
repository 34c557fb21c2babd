//! Talks to a real database; skipped unless TUDU_RTDB_URL is set.
#![cfg(feature = "rtdb")]

use std::sync::Arc;
use tudu_core::{Msg, RtdbStore, Session, SessionConfig};

#[tokio::test]
async fn round_trip_against_live_database() {
    let Ok(url) = std::env::var("TUDU_RTDB_URL") else {
        eprintln!("skipping: TUDU_RTDB_URL not set");
        return;
    };
    let auth = std::env::var("TUDU_RTDB_AUTH").ok();
    let store = Arc::new(RtdbStore::new(&url, auth).expect("client"));
    let config = SessionConfig {
        collection: format!("tudu-smoke-{}", std::process::id()),
        ..SessionConfig::default()
    };
    let mut session = Session::start(store, config).await.expect("subscribe");
    session.next_snapshot().await;

    session.dispatch(Msg::DraftEdited("smoke".into()));
    session.dispatch(Msg::AddRequested);
    session.flush().await;
    while session.state().items.is_empty() {
        session.next_snapshot().await;
    }
    let id = session.state().items[0].id.clone();

    session.dispatch(Msg::DeleteRequested(id));
    session.flush().await;
    while !session.state().items.is_empty() {
        session.next_snapshot().await;
    }
    session.shutdown();
}
