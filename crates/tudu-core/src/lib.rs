//! tudu-core: the realtime todo list controller, its store seam, and backends.
//!
//! The controller itself is a pure reducer ([`ListState::update`]). A
//! [`Session`] wires it to a [`RemoteStore`], keeping one live subscription
//! open and running mutations as background tasks. [`MemStore`] is the
//! in-process backend used by tests and offline runs; [`RtdbStore`] talks to a
//! Firebase Realtime Database.

mod controller;
mod debounce;
mod error;
mod mem_store;
mod model;
mod projection;
mod push_id;
#[cfg(feature = "rtdb")]
mod rtdb;
mod session;
mod store;

pub use controller::{Effect, ListState, Msg};
pub use debounce::{Debounce, DebounceState, SEARCH_DEBOUNCE};
pub use error::{Operation, RemoteError, RemoteResult};
pub use mem_store::{MemStore, Write};
pub use model::{Item, ItemId, Record};
pub use projection::{collate, matches_term, project, Collation};
pub use push_id::PushIdGenerator;
#[cfg(feature = "rtdb")]
pub use rtdb::RtdbStore;
pub use session::{Outcome, Session, SessionConfig};
pub use store::{RemoteStore, Snapshot, Subscription, DEFAULT_COLLECTION, ORDER_BY_TITLE};
