//! Priority-ordered loading of all stores into one tree.
//!
//! Stores are given highest priority first. They are read from the back of
//! the list to the front and deep-merged in that order, so the first store
//! wins wherever layers disagree. Nodes merge key by key; lists and scalars
//! of a higher layer replace the lower one entirely.

use crate::error::Result;
use crate::store::Store;
use crate::tree::Node;
use std::sync::Arc;
use tracing::debug;

/// Read every store and merge the results. Fails on the first unreadable
/// store or the first layer that is not a valid tree.
pub async fn load_all(stores: &[Arc<dyn Store>]) -> Result<Node> {
    let mut tree = Node::new();
    for store in stores.iter().rev() {
        let layer = store.read().await?;
        layer.check()?;
        debug!(store = %store.name(), keys = layer.len(), "Merging store");
        tree.merge(layer);
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use crate::tree::{Number, Value};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct Unreadable;

    #[async_trait]
    impl Store for Unreadable {
        fn name(&self) -> String {
            "unreadable".to_string()
        }

        async fn read(&self) -> Result<Node> {
            Err(Error::store("unreadable", "medium is gone"))
        }

        async fn write(&self, _tree: &Node) -> Result<()> {
            Ok(())
        }

        fn subscribe(&self, _notify: Option<mpsc::Sender<()>>) -> Result<()> {
            Ok(())
        }
    }

    fn memory(tree: Node) -> Arc<dyn Store> {
        Arc::new(MemoryStore::from_node(tree))
    }

    #[tokio::test]
    async fn test_first_store_wins() {
        let stores = vec![
            memory(Node::new().with("server", Node::new().with("port", Number::from(9000)))),
            memory(
                Node::new()
                    .with(
                        "server",
                        Node::new()
                            .with("port", Number::from(8080))
                            .with("host", "localhost"),
                    )
                    .with("features", vec![Value::from("a"), Value::from("b")]),
            ),
        ];

        let tree = load_all(&stores).await.unwrap();
        assert_eq!(tree.get::<u16>(".server.port").unwrap(), 9000);
        assert_eq!(tree.get::<String>(".server.host").unwrap(), "localhost");
        assert_eq!(tree.get::<Vec<String>>(".features").unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_no_stores_is_empty_tree() {
        assert!(load_all(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_layer_fails_whole_load() {
        let stores = vec![memory(Node::new().with("a.b", true))];
        assert!(matches!(load_all(&stores).await, Err(Error::PathInvalid { .. })));
    }

    #[tokio::test]
    async fn test_unreadable_store_fails_whole_load() {
        let stores = vec![memory(Node::new().with("a", true)), Arc::new(Unreadable) as Arc<dyn Store>];
        assert!(matches!(load_all(&stores).await, Err(Error::Store { .. })));
    }
}
