//! The mutation task: serializes writes and reloads.
//!
//! Every `set`/`reset` re-reads the first store, applies the change to that
//! layer alone and writes it back, so values of lower layers never leak into
//! the writable one. After a write, and whenever a store signals an external
//! change, all stores are merged again and the result is published on a
//! watch channel. The channel only keeps the newest tree, so a burst of
//! reloads collapses into a single pending tree for the dispatch task.
//!
//! If the dispatch task dies (a listener panicked) the watch channel loses
//! its receiver and this task stops too, so later calls fail with
//! [`Error::Closed`] instead of writing into a config nobody publishes.

use super::loader::load_all;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::tree::{Node, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

pub(crate) enum Request {
    Set {
        path: String,
        value: Value,
        reply: oneshot::Sender<Result<()>>,
    },
    Reset {
        path: String,
        reply: oneshot::Sender<Result<()>>,
    },
}

pub(crate) struct Mutator {
    stores: Vec<Arc<dyn Store>>,
    trees: watch::Sender<Arc<Node>>,
}

impl Mutator {
    pub(crate) fn new(stores: Vec<Arc<dyn Store>>, trees: watch::Sender<Arc<Node>>) -> Self {
        Self { stores, trees }
    }

    /// Process requests and change signals until the request channel closes
    /// or the dispatch task is gone.
    pub(crate) async fn run(
        self,
        mut requests: mpsc::Receiver<Request>,
        mut changes: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                Some(()) = changes.recv() => self.reload().await,
                () = self.trees.closed() => {
                    error!("Dispatch task stopped, rejecting further writes");
                    break;
                }
            }
        }
        requests.close();

        for store in &self.stores {
            if let Err(e) = store.subscribe(None) {
                warn!(store = %store.name(), error = %e, "Unsubscribing from store failed");
            }
        }
        info!("Mutation task stopped");
    }

    async fn handle(&self, request: Request) {
        let (result, reply) = match request {
            Request::Set { path, value, reply } => {
                debug!(path = %path, "Setting value");
                let result = self
                    .write_top(|tree| tree.set_value(&path, value))
                    .await;
                (result, reply)
            }
            Request::Reset { path, reply } => {
                debug!(path = %path, "Resetting value");
                let result = self.write_top(|tree| tree.remove(&path)).await;
                (result, reply)
            }
        };

        let written = result.is_ok();
        // The caller may have given up waiting; the write stands regardless.
        let _ = reply.send(result);
        if written {
            self.reload().await;
        }
    }

    /// Read the first store, change it and write it back.
    async fn write_top(&self, apply: impl FnOnce(&mut Node) -> Result<()>) -> Result<()> {
        let store = self.stores.first().ok_or(Error::NoWritableStore)?;
        let mut tree = store.read().await?;
        apply(&mut tree)?;
        tree.check()?;
        store.write(&tree).await
    }

    /// Merge all stores and hand the tree to the dispatch task. On failure the
    /// previous tree stays in place.
    async fn reload(&self) {
        match load_all(&self.stores).await {
            Ok(tree) => {
                debug!(keys = tree.len(), "Reloaded config tree");
                self.trees.send_replace(Arc::new(tree));
            }
            Err(e) => {
                error!(error = %e, "Reloading config failed, keeping the previous tree");
            }
        }
    }
}
