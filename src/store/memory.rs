//! In-memory store.

use super::{ChangeNotifier, Store};
use crate::error::Result;
use crate::tree::Node;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// A store that keeps its tree in RAM.
///
/// Useful as a writable top layer whose overrides should not be persisted,
/// and in tests. Every write signals the subscriber, so changes written
/// through a config handle are picked up by the normal reload path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    tree: Mutex<Node>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_node(Node::new())
    }

    /// Start out holding `tree`.
    pub fn from_node(tree: Node) -> Self {
        Self {
            name: "memory".to_string(),
            tree: Mutex::new(tree),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Start out holding `value` stored at `path`.
    pub fn with_value<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<Self> {
        let mut tree = Node::new();
        tree.set(path, value)?;
        Ok(Self::from_node(tree))
    }

    /// Rename the store in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Copy of the held tree.
    pub fn snapshot(&self) -> Node {
        self.tree
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn read(&self) -> Result<Node> {
        Ok(self.snapshot())
    }

    async fn write(&self, tree: &Node) -> Result<()> {
        *self.tree.lock().unwrap_or_else(PoisonError::into_inner) = tree.clone();
        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self, notify: Option<mpsc::Sender<()>>) -> Result<()> {
        self.notifier.set(notify);
        Ok(())
    }
}
