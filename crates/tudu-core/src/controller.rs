//! The list controller as a reducer.
//!
//! `ListState::update` consumes the current state and one message and returns
//! the next state plus the remote requests to issue. Nothing here performs
//! I/O; a driver such as [`crate::Session`] executes the effects and feeds
//! their completions back in as messages.

use crate::debounce::Debounce;
use crate::error::RemoteResult;
use crate::model::{Item, ItemId};
use crate::projection::project;
use crate::store::Snapshot;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    /// Last snapshot received, in store order.
    pub items: Vec<Item>,
    pub draft_title: String,
    /// Committed filter; only changes when the debounce fires.
    pub search_term: String,
    pub sort_enabled: bool,
    pub search: Debounce,
}

#[derive(Debug)]
pub enum Msg {
    Snapshot(Snapshot),
    DraftEdited(String),
    AddRequested,
    Created {
        title: String,
        result: RemoteResult<ItemId>,
    },
    DeleteRequested(ItemId),
    Deleted {
        id: ItemId,
        result: RemoteResult<()>,
    },
    /// One keystroke in an item's inline editor; carries the full new title.
    ItemEdited {
        id: ItemId,
        title: String,
    },
    Patched {
        id: ItemId,
        result: RemoteResult<()>,
    },
    SearchEdited {
        value: String,
        at: Instant,
    },
    Tick(Instant),
    SortToggled,
}

/// A remote request the driver must issue, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Create { title: String },
    Delete { id: ItemId },
    Patch { id: ItemId, title: String },
}

impl ListState {
    pub fn new(search_delay: Duration) -> Self {
        Self {
            search: Debounce::new(search_delay),
            ..Self::default()
        }
    }

    pub fn update(mut self, msg: Msg) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        match msg {
            Msg::Snapshot(snapshot) => {
                self.items = snapshot.into_items();
                debug!(items = self.items.len(), "snapshot applied");
            }
            Msg::DraftEdited(text) => self.draft_title = text,
            Msg::AddRequested => {
                if !self.draft_title.is_empty() {
                    effects.push(Effect::Create {
                        title: self.draft_title.clone(),
                    });
                }
            }
            Msg::Created { title, result } => match result {
                Ok(id) => {
                    debug!(%id, "created");
                    self.draft_title.clear();
                }
                Err(err) => error!(%err, %title, "could not add item"),
            },
            Msg::DeleteRequested(id) => effects.push(Effect::Delete { id }),
            Msg::Deleted { id, result } => {
                if let Err(err) = result {
                    error!(%err, %id, "could not delete item");
                }
            }
            Msg::ItemEdited { id, title } => effects.push(Effect::Patch { id, title }),
            Msg::Patched { id, result } => {
                if let Err(err) = result {
                    error!(%err, %id, "could not update item");
                }
            }
            Msg::SearchEdited { value, at } => {
                self.search.input(value, at);
            }
            Msg::Tick(now) => {
                if let Some(term) = self.search.poll(now) {
                    debug!(%term, "search committed");
                    self.search_term = term;
                }
            }
            Msg::SortToggled => self.sort_enabled = !self.sort_enabled,
        }
        (self, effects)
    }

    /// What the list shows right now.
    pub fn visible(&self) -> Vec<&Item> {
        project(&self.items, &self.search_term, self.sort_enabled)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }
}
