//! The remote store seam: a live query plus three fire-and-forget mutations.

use crate::error::RemoteResult;
use crate::model::{Item, ItemId, Record};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_COLLECTION: &str = "todos";
pub const ORDER_BY_TITLE: &str = "title";

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Opens a live query over `path`. The first snapshot is delivered as soon
    /// as it is known, then one full snapshot per committed write.
    async fn subscribe(&self, path: &str, order_by: &str) -> RemoteResult<Subscription>;
    /// Creates a record under a store-generated key and returns that key.
    async fn create(&self, path: &str, record: Record) -> RemoteResult<ItemId>;
    async fn delete(&self, path: &str, id: &str) -> RemoteResult<()>;
    /// Partial write of the fields in `record` at `path/id`.
    async fn patch(&self, path: &str, id: &str, record: Record) -> RemoteResult<()>;
}

/// Full contents of a collection at one point in time, already in store order.
/// `None` is the store's "no value here", which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Option<Vec<(ItemId, Record)>>,
}

impl Snapshot {
    pub fn absent() -> Self {
        Self { entries: None }
    }

    /// Entries must already be in store order; an empty list reads as absent.
    pub fn from_entries(entries: Vec<(ItemId, Record)>) -> Self {
        if entries.is_empty() {
            Self::absent()
        } else {
            Self {
                entries: Some(entries),
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pairs every key with its value, keeping store order.
    pub fn into_items(self) -> Vec<Item> {
        self.entries
            .unwrap_or_default()
            .into_iter()
            .map(|(id, record)| Item {
                id,
                title: record.title,
            })
            .collect()
    }
}

/// Store-native `orderByChild` ordering: entries lacking the child come
/// first, then raw string order of the child value, ties broken by key.
pub(crate) fn order_by_child(mut entries: Vec<(Option<String>, ItemId, Record)>) -> Snapshot {
    entries.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    Snapshot::from_entries(
        entries
            .into_iter()
            .map(|(_, id, record)| (id, record))
            .collect(),
    )
}

/// A live query handle. Dropping it releases the underlying stream.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Snapshot>,
    reader: Option<JoinHandle<()>>,
    ended: bool,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self {
            rx,
            reader: None,
            ended: false,
        }
    }

    /// A subscription fed by a background reader task that is aborted on drop.
    pub fn with_reader(rx: mpsc::UnboundedReceiver<Snapshot>, reader: JoinHandle<()>) -> Self {
        Self {
            rx,
            reader: Some(reader),
            ended: false,
        }
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        let next = self.rx.recv().await;
        if next.is_none() {
            self.ended = true;
        }
        next
    }

    pub fn try_next(&mut self) -> Option<Snapshot> {
        match self.rx.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.ended = true;
                None
            }
        }
    }

    /// False once the producer side has gone away and everything was drained.
    pub fn is_live(&self) -> bool {
        !self.ended
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

pub(crate) fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}
