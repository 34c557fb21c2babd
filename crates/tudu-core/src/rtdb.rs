//! Firebase Realtime Database backend over its REST API.
//!
//! Mutations are plain JSON requests. The live query is the REST streaming
//! endpoint (`Accept: text/event-stream`): `put` and `patch` events are folded
//! into a local mirror of the collection and every change re-emits the full,
//! ordered snapshot.

use crate::error::{Operation, RemoteError, RemoteResult};
use crate::model::{ItemId, Record};
use crate::store::{normalize_path, order_by_child, RemoteStore, Snapshot, Subscription};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RtdbStore {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Deserialize)]
struct Change {
    path: String,
    data: Value,
}

impl RtdbStore {
    /// `base_url` is the database root, e.g. `https://<db>.firebaseio.com`.
    /// `auth` is sent as the `auth` query parameter (ID token or secret).
    pub fn new(base_url: &str, auth: Option<String>) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::new(Operation::Subscribe, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str, id: Option<&str>) -> String {
        let path = normalize_path(path);
        match id {
            Some(id) => format!("{}/{}/{}.json", self.base_url, path, id),
            None => format!("{}/{}.json", self.base_url, path),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(token) => req.query(&[("auth", token.as_str())]),
            None => req,
        }
    }

    async fn send(
        &self,
        op: Operation,
        req: reqwest::RequestBuilder,
    ) -> RemoteResult<reqwest::Response> {
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| RemoteError::new(op, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::new(op, format!("status {status}: {}", body.trim())));
        }
        Ok(resp)
    }
}

#[async_trait]
impl RemoteStore for RtdbStore {
    async fn subscribe(&self, path: &str, order_by: &str) -> RemoteResult<Subscription> {
        let req = self
            .client
            .get(self.url(path, None))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let resp = self.send(Operation::Subscribe, req).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let order_by = order_by.to_string();
        let path = normalize_path(path);
        let reader = tokio::spawn(async move {
            match read_events(resp, &order_by, tx).await {
                Ok(()) => info!(%path, "realtime stream closed"),
                Err(err) => warn!(%path, %err, "realtime stream failed"),
            }
        });
        Ok(Subscription::with_reader(rx, reader))
    }

    async fn create(&self, path: &str, record: Record) -> RemoteResult<ItemId> {
        let req = self
            .client
            .post(self.url(path, None))
            .json(&record)
            .timeout(REQUEST_TIMEOUT);
        let resp = self.send(Operation::Create, req).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::new(Operation::Create, e))?;
        pushed_key(&body)
    }

    async fn delete(&self, path: &str, id: &str) -> RemoteResult<()> {
        let req = self
            .client
            .delete(self.url(path, Some(id)))
            .timeout(REQUEST_TIMEOUT);
        self.send(Operation::Delete, req).await?;
        Ok(())
    }

    async fn patch(&self, path: &str, id: &str, record: Record) -> RemoteResult<()> {
        let req = self
            .client
            .patch(self.url(path, Some(id)))
            .json(&record)
            .timeout(REQUEST_TIMEOUT);
        self.send(Operation::Patch, req).await?;
        Ok(())
    }
}

/// Reads the `{"name": <key>}` body a push answers with.
fn pushed_key(body: &[u8]) -> RemoteResult<ItemId> {
    let pushed: PushResponse =
        serde_json::from_slice(body).map_err(|e| RemoteError::new(Operation::Create, e))?;
    Ok(pushed.name)
}

async fn read_events(
    resp: reqwest::Response,
    order_by: &str,
    tx: mpsc::UnboundedSender<Snapshot>,
) -> RemoteResult<()> {
    let mut stream = std::pin::pin!(resp.bytes_stream());
    let mut feed = Feed::default();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RemoteError::new(Operation::Subscribe, e))?;
        if !feed.push(&chunk, order_by, &tx)? {
            // subscriber went away
            return Ok(());
        }
    }
    Ok(())
}

/// Stream bytes in, snapshots out.
#[derive(Debug, Default)]
struct Feed {
    decoder: sse::Decoder,
    mirror: Mirror,
}

impl Feed {
    /// Applies every complete event in `chunk` and forwards the resulting
    /// snapshots. Returns false once nobody is listening.
    fn push(
        &mut self,
        chunk: &[u8],
        order_by: &str,
        tx: &mpsc::UnboundedSender<Snapshot>,
    ) -> RemoteResult<bool> {
        for event in self.decoder.push(chunk) {
            if let Some(snapshot) = apply(&mut self.mirror, event, order_by)? {
                if tx.send(snapshot).is_err() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Folds one stream event into the mirror. Data events yield the new
/// snapshot; `cancel` and `auth_revoked` end the stream.
fn apply(mirror: &mut Mirror, event: sse::Event, order_by: &str) -> RemoteResult<Option<Snapshot>> {
    let fail = |detail: String| RemoteError::new(Operation::Subscribe, detail);
    match event.name.as_str() {
        "put" | "patch" => {
            let change: Change = serde_json::from_str(&event.data)
                .map_err(|e| fail(format!("bad {} payload: {e}", event.name)))?;
            if event.name == "put" {
                mirror.put(&change.path, change.data);
            } else {
                mirror.patch(&change.path, change.data);
            }
            Ok(Some(mirror.snapshot(order_by)))
        }
        "keep-alive" => Ok(None),
        "cancel" | "auth_revoked" => Err(fail(format!("server sent {}", event.name))),
        other => {
            debug!(event = other, "ignoring stream event");
            Ok(None)
        }
    }
}

/// Local copy of the subscribed subtree, rebuilt from stream events.
#[derive(Debug, Default)]
struct Mirror {
    root: Value,
}

impl Mirror {
    fn put(&mut self, path: &str, data: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        set_at(&mut self.root, &segments, data);
    }

    fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            self.put(path, data);
            return;
        };
        let base = path.trim_end_matches('/');
        for (key, value) in children {
            self.put(&format!("{base}/{key}"), value);
        }
    }

    fn snapshot(&self, order_by: &str) -> Snapshot {
        let Value::Object(children) = &self.root else {
            return Snapshot::absent();
        };
        order_by_child(
            children
                .iter()
                .map(|(id, value)| {
                    let key = value.get(order_by).and_then(Value::as_str).map(str::to_string);
                    (key, id.clone(), Record::from_value(value))
                })
                .collect(),
        )
    }
}

/// Writes `data` at `segments` below `node`; `null` deletes, and parents left
/// empty disappear the way the database prunes them.
fn set_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if rest.is_empty() {
            if data.is_null() {
                map.remove(*first);
            } else {
                map.insert(first.to_string(), data);
            }
        } else {
            let child = map.entry(first.to_string()).or_insert(Value::Null);
            set_at(child, rest, data);
            if is_empty(child) {
                map.remove(*first);
            }
        }
    }
    if is_empty(node) {
        *node = Value::Null;
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

mod sse {
    /// One dispatched server-sent event.
    #[derive(Debug, PartialEq, Eq)]
    pub(super) struct Event {
        pub name: String,
        pub data: String,
    }

    /// Incremental `text/event-stream` framing. Chunks may split anywhere,
    /// including inside a UTF-8 sequence.
    #[derive(Debug, Default)]
    pub(super) struct Decoder {
        pending: Vec<u8>,
    }

    impl Decoder {
        pub fn push(&mut self, chunk: &[u8]) -> Vec<Event> {
            self.pending.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
            let mut events = Vec::new();
            while let Some(end) = self.pending.windows(2).position(|w| w == b"\n\n") {
                let block: Vec<u8> = self.pending.drain(..end + 2).collect();
                if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                    events.push(event);
                }
            }
            events
        }
    }

    fn parse_block(block: &str) -> Option<Event> {
        let mut name = String::from("message");
        let mut data: Vec<&str> = Vec::new();
        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => name = value.to_string(),
                "data" => data.push(value),
                _ => {}
            }
        }
        if data.is_empty() && name == "message" {
            return None;
        }
        Some(Event {
            name,
            data: data.join("\n"),
        })
    }
}
