//! Todo items: the data model, its repository, and the HTTP handlers.

mod api;
mod repository;

pub use api::routes;
pub use repository::{MemoryRepository, TodoRepository};

use serde::{Deserialize, Serialize};

/// A todo item as stored and as sent on the wire.
///
/// `key` is assigned by the repository on [`TodoRepository::add`]; whatever a
/// client sends there on creation is discarded.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TodoItem {
    pub key: String,
    pub name: String,
    pub is_complete: bool,
}

impl TodoItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}
