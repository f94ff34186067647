//! Todo storage.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::TodoItem;

/// Synchronous CRUD access to todo items.
///
/// Every operation is atomic on its own. Nothing spans two calls: an `add`
/// racing an `all` may or may not be included in the snapshot.
pub trait TodoRepository: Send + Sync + 'static {
    /// Stores `item` under a freshly generated key and writes that key back
    /// into `item.key`. Any key the caller set is discarded.
    fn add(&self, item: &mut TodoItem);

    /// Snapshot of every stored item, in no particular order.
    fn all(&self) -> Vec<TodoItem>;

    fn find(&self, key: &str) -> Option<TodoItem>;

    /// Replaces the record under `item.key` wholesale, inserting it if the
    /// key is unknown. Callers that need "update only if present" check with
    /// [`find`](TodoRepository::find) first.
    fn update(&self, item: TodoItem);

    /// Removes and returns the record under `key`. Absent keys yield `None`.
    fn remove(&self, key: &str) -> Option<TodoItem>;
}

/// In-memory repository over a sharded concurrent map.
pub struct MemoryRepository {
    todos: DashMap<String, TodoItem>,
}

impl MemoryRepository {
    /// A repository seeded with a single item named `"Item1"`.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.add(&mut TodoItem::new("Item1"));
        repo
    }

    pub fn empty() -> Self {
        Self { todos: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self { Self::new() }
}

impl TodoRepository for MemoryRepository {
    fn add(&self, item: &mut TodoItem) {
        item.key = Uuid::new_v4().to_string();
        debug!(key = %item.key, "todo added");
        self.todos.insert(item.key.clone(), item.clone());
    }

    fn all(&self) -> Vec<TodoItem> {
        self.todos.iter().map(|entry| entry.value().clone()).collect()
    }

    fn find(&self, key: &str) -> Option<TodoItem> {
        self.todos.get(key).map(|entry| entry.value().clone())
    }

    fn update(&self, item: TodoItem) {
        self.todos.insert(item.key.clone(), item);
    }

    fn remove(&self, key: &str) -> Option<TodoItem> {
        self.todos.remove(key).map(|(_, item)| item)
    }
}
