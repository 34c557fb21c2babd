use serde::{Deserialize, Serialize};

/// Store-assigned key of an item. Never generated by the controller.
pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
}

impl Item {
    pub fn new<I: Into<ItemId>, S: Into<String>>(id: I, title: S) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Value stored under an item's key. The key itself is the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
}

impl Record {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Lenient decode of a raw stored value: a missing or non-string title
    /// reads as empty rather than rejecting the whole snapshot.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            title: value
                .get("title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}
