use crate::error::{Operation, RemoteError, RemoteResult};
use crate::model::{Item, ItemId, Record};
use crate::push_id::{now_ms, PushIdGenerator};
use crate::store::{
    normalize_path, order_by_child, RemoteStore, Snapshot, Subscription, ORDER_BY_TITLE,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;

/// A write the store accepted, in acceptance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create { id: ItemId, title: String },
    Delete { id: ItemId },
    Patch { id: ItemId, title: String },
}

struct Subscriber {
    path: String,
    order_by: String,
    tx: mpsc::UnboundedSender<Snapshot>,
}

/// In-process realtime store. Every accepted write pushes a fresh snapshot to
/// each live subscriber of the touched collection before the write returns.
#[derive(Default)]
pub struct MemStore {
    collections: RwLock<HashMap<String, BTreeMap<ItemId, Record>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    ids: Mutex<PushIdGenerator>,
    journal: Mutex<Vec<Write>>,
    offline: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, as if another client had created it.
    pub fn seed(&self, path: &str, title: &str) -> ItemId {
        let path = normalize_path(path);
        let id = self.ids.lock().expect("poisoned").next_id(now_ms());
        self.collections
            .write()
            .expect("poisoned")
            .entry(path.clone())
            .or_default()
            .insert(id.clone(), Record::new(title));
        self.broadcast(&path);
        id
    }

    /// When offline every mutation fails and nothing is written.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Items of `path` ordered by title, the same order subscribers see.
    pub fn items(&self, path: &str) -> Vec<Item> {
        self.snapshot(&normalize_path(path), ORDER_BY_TITLE)
            .into_items()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.journal.lock().expect("poisoned").clone()
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        let path = normalize_path(path);
        self.subscribers
            .lock()
            .expect("poisoned")
            .iter()
            .filter(|s| s.path == path && !s.tx.is_closed())
            .count()
    }

    fn snapshot(&self, path: &str, order_by: &str) -> Snapshot {
        let collections = self.collections.read().expect("poisoned");
        let Some(records) = collections.get(path) else {
            return Snapshot::absent();
        };
        order_by_child(
            records
                .iter()
                .map(|(id, record)| {
                    let key = (order_by == ORDER_BY_TITLE).then(|| record.title.clone());
                    (key, id.clone(), record.clone())
                })
                .collect(),
        )
    }

    fn broadcast(&self, path: &str) {
        let mut subscribers = self.subscribers.lock().expect("poisoned");
        subscribers.retain(|sub| {
            if sub.path != path {
                return !sub.tx.is_closed();
            }
            sub.tx.send(self.snapshot(path, &sub.order_by)).is_ok()
        });
    }

    fn ensure_online(&self, op: Operation) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::new(op, "store is offline"));
        }
        Ok(())
    }

    fn record(&self, write: Write) {
        self.journal.lock().expect("poisoned").push(write);
    }
}

#[async_trait]
impl RemoteStore for MemStore {
    async fn subscribe(&self, path: &str, order_by: &str) -> RemoteResult<Subscription> {
        let path = normalize_path(path);
        let (tx, rx) = mpsc::unbounded_channel();
        // hold the registry while reading so no write slips between the
        // initial value and registration
        let mut subscribers = self.subscribers.lock().expect("poisoned");
        let _ = tx.send(self.snapshot(&path, order_by));
        subscribers.push(Subscriber {
            path,
            order_by: order_by.to_string(),
            tx,
        });
        Ok(Subscription::new(rx))
    }

    async fn create(&self, path: &str, record: Record) -> RemoteResult<ItemId> {
        self.ensure_online(Operation::Create)?;
        let path = normalize_path(path);
        let id = self.ids.lock().expect("poisoned").next_id(now_ms());
        self.collections
            .write()
            .expect("poisoned")
            .entry(path.clone())
            .or_default()
            .insert(id.clone(), record.clone());
        self.record(Write::Create {
            id: id.clone(),
            title: record.title,
        });
        self.broadcast(&path);
        Ok(id)
    }

    async fn delete(&self, path: &str, id: &str) -> RemoteResult<()> {
        self.ensure_online(Operation::Delete)?;
        let path = normalize_path(path);
        {
            let mut collections = self.collections.write().expect("poisoned");
            if let Some(records) = collections.get_mut(&path) {
                records.remove(id);
                if records.is_empty() {
                    collections.remove(&path);
                }
            }
        }
        self.record(Write::Delete { id: id.to_string() });
        self.broadcast(&path);
        Ok(())
    }

    async fn patch(&self, path: &str, id: &str, record: Record) -> RemoteResult<()> {
        self.ensure_online(Operation::Patch)?;
        let path = normalize_path(path);
        // a partial write to a missing key creates it, as the remote store does
        self.collections
            .write()
            .expect("poisoned")
            .entry(path.clone())
            .or_default()
            .entry(id.to_string())
            .or_default()
            .title = record.title.clone();
        self.record(Write::Patch {
            id: id.to_string(),
            title: record.title,
        });
        self.broadcast(&path);
        Ok(())
    }
}
