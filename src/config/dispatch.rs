//! The dispatch task: owns the authoritative tree and notifies listeners.
//!
//! For each tree coming out of the mutation task it diffs against the
//! current tree, swaps the shared snapshot and runs one notification round.
//! All callbacks of a round run concurrently as separate tasks and the round
//! finishes only when every one of them has returned, so rounds never
//! overlap. Listener bookkeeping is owned by this task alone.

use super::Config;
use super::Inner;
use super::listener::{Listener, ListenerId, Listeners};
use crate::tree::{ChangeSet, Node};
use arc_swap::ArcSwap;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

pub(crate) enum Command {
    Register {
        listener: Listener,
        reply: oneshot::Sender<ListenerId>,
    },
    Unregister {
        id: ListenerId,
        reply: oneshot::Sender<()>,
    },
}

pub(crate) struct Dispatcher {
    current: Arc<Node>,
    shared: Arc<ArcSwap<Node>>,
    listeners: Listeners,
    handle: Weak<Inner>,
}

impl Dispatcher {
    pub(crate) fn new(current: Arc<Node>, shared: Arc<ArcSwap<Node>>, handle: Weak<Inner>) -> Self {
        Self {
            current,
            shared,
            listeners: Listeners::default(),
            handle,
        }
    }

    /// Run until the mutation task is gone and every published tree has been handled.
    pub(crate) async fn run(
        mut self,
        mut trees: watch::Receiver<Arc<Node>>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        loop {
            tokio::select! {
                changed = trees.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let tree = trees.borrow_and_update().clone();
                    self.update(tree).await;
                }
                Some(command) = commands.recv() => self.command(command).await,
            }
        }
        info!(listeners = self.listeners.len(), "Dispatch task stopped");
    }

    async fn update(&mut self, tree: Arc<Node>) {
        let changes = self.current.compare(&tree);
        self.shared.store(Arc::clone(&tree));
        self.current = tree;

        if changes.is_empty() {
            debug!("Reloaded tree is unchanged");
            return;
        }
        info!(
            modified = changes.modified.len(),
            added = changes.added.len(),
            removed = changes.removed.len(),
            "Config tree updated"
        );
        self.notify_all(&changes).await;
    }

    /// One round: every listener with matching paths, concurrently.
    async fn notify_all(&self, changes: &ChangeSet) {
        let Some(config) = self.config() else {
            return;
        };

        let mut round = JoinSet::new();
        for listener in self.listeners.iter() {
            let selected = listener.select(changes);
            if !selected.is_empty() {
                round.spawn(listener.call(config.clone(), selected));
            }
        }
        drop(config);

        while let Some(result) = round.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                error!("Listener panicked, shutting the config down");
                std::panic::resume_unwind(e.into_panic());
            }
        }
    }

    async fn command(&mut self, command: Command) {
        match command {
            Command::Register { listener, reply } => {
                let filters = listener.filters().to_vec();
                let id = self.listeners.insert(listener);
                debug!(id, ?filters, "Listener registered");
                let _ = reply.send(id);
                self.bootstrap(id).await;
            }
            Command::Unregister { id, reply } => {
                if self.listeners.remove(id) {
                    debug!(id, "Listener unregistered");
                }
                let _ = reply.send(());
            }
        }
    }

    /// Tell a new listener about everything currently present.
    ///
    /// Always invoked, even when nothing matches its filters.
    async fn bootstrap(&self, id: ListenerId) {
        let (Some(listener), Some(config)) = (self.listeners.get(id), self.config()) else {
            return;
        };
        let changes = Node::new().compare(&self.current);
        listener.call(config, listener.select(&changes)).await;
    }

    fn config(&self) -> Option<Config> {
        self.handle.upgrade().map(|inner| Config { inner })
    }
}
