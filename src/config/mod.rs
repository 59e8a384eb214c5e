//! The config handle: one merged tree over a prioritized list of stores.
//!
//! Two background tasks do all the work:
//! - the mutation task applies `set`/`reset` to the first store one request
//!   at a time and reloads the merged tree after writes and whenever a store
//!   reports an external change;
//! - the dispatch task diffs each reloaded tree against the current one,
//!   publishes it, and runs listener callbacks.
//!
//! Reads never wait on either task: [`Config::get`] loads the latest
//! published tree directly. Because publishing happens after the write has
//! gone through the store and the reload, a `get` right after `set` may still
//! see the old value. Use a listener to observe when a change has landed.
//!
//! # Listener callbacks
//!
//! Callbacks receive a [`Config`] and may `get`, `set` and `reset` through it.
//! They must not call [`Config::register`], [`Config::unregister`] or
//! [`Config::close`]: those wait for the dispatch task, which is waiting for
//! the callback to finish.
//!
//! A callback that panics is not caught. The panic stops the dispatch task,
//! the mutation task follows, and from then on every call except the reads
//! fails with [`Error::Closed`]. [`Config::close`] raises the panic again.

mod dispatch;
mod listener;
mod loader;
mod mutation;
mod options;

pub use listener::ListenerId;
pub use loader::load_all;
pub use options::ConfigOptions;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::tree::{ChangeSet, Node, Value, codec};
use arc_swap::ArcSwap;
use dispatch::{Command, Dispatcher};
use listener::{Callback, Listener, ListenerFuture};
use mutation::{Mutator, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Handle to a running config. Cheap to clone; all clones share the same tree.
#[derive(Clone)]
pub struct Config {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    tree: Arc<ArcSwap<Node>>,
    channels: Mutex<Option<Channels>>,
    /// Held across the join in [`Config::close`] so concurrent closers all wait.
    tasks: tokio::sync::Mutex<Option<Tasks>>,
}

struct Channels {
    requests: mpsc::Sender<Request>,
    commands: mpsc::Sender<Command>,
}

struct Tasks {
    mutation: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

impl Config {
    /// Load all stores and start watching them. Stores are ordered highest
    /// priority first; writes go to the first one.
    pub async fn new(stores: Vec<Arc<dyn Store>>) -> Result<Self> {
        Self::with_options(stores, ConfigOptions::default()).await
    }

    pub async fn with_options(stores: Vec<Arc<dyn Store>>, options: ConfigOptions) -> Result<Self> {
        let tree = Arc::new(load_all(&stores).await?);
        info!(stores = stores.len(), keys = tree.len(), "Config loaded");

        let (change_tx, change_rx) = mpsc::channel(1);
        for store in &stores {
            if let Err(e) = store.subscribe(Some(change_tx.clone())) {
                warn!(store = %store.name(), error = %e, "Store changes will not be picked up");
            }
        }
        drop(change_tx);

        let shared = Arc::new(ArcSwap::new(Arc::clone(&tree)));
        let (tree_tx, tree_rx) = watch::channel(Arc::clone(&tree));
        let (request_tx, request_rx) = mpsc::channel(options.request_capacity.max(1));
        let (command_tx, command_rx) = mpsc::channel(options.command_capacity.max(1));

        let inner = Arc::new(Inner {
            tree: Arc::clone(&shared),
            channels: Mutex::new(Some(Channels {
                requests: request_tx,
                commands: command_tx,
            })),
            tasks: tokio::sync::Mutex::new(None),
        });

        let mutation = tokio::spawn(Mutator::new(stores, tree_tx).run(request_rx, change_rx));
        let dispatch =
            tokio::spawn(Dispatcher::new(tree, shared, Arc::downgrade(&inner)).run(tree_rx, command_rx));
        *inner.tasks.lock().await = Some(Tasks { mutation, dispatch });

        Ok(Self { inner })
    }

    /// Convert the value at `path` into `T`. The root is `""` or `"."`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.inner.tree.load().get(path)
    }

    /// Copy of the untyped value at a non-root `path`.
    pub fn get_value(&self, path: &str) -> Result<Value> {
        self.inner.tree.load().get_value(path).cloned()
    }

    /// The current merged tree.
    pub fn snapshot(&self) -> Arc<Node> {
        self.inner.tree.load_full()
    }

    /// Store `value` at `path` in the first store.
    ///
    /// Conversion happens before anything is sent, so a value that cannot be
    /// represented leaves every store untouched.
    pub async fn set<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let value = codec::to_value(value)?;
        let (reply, result) = oneshot::channel();
        self.request(Request::Set {
            path: path.to_string(),
            value,
            reply,
        })
        .await?;
        result.await.map_err(|_| Error::Closed)?
    }

    /// Remove `path` from the first store, letting lower stores show through.
    pub async fn reset(&self, path: &str) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.request(Request::Reset {
            path: path.to_string(),
            reply,
        })
        .await?;
        result.await.map_err(|_| Error::Closed)?
    }

    /// Add a listener for changes below any of `filters`.
    ///
    /// No filters means the whole tree. The callback is invoked once right
    /// away with every present path that matches as added, then once per
    /// change round in which anything matches.
    pub async fn register<S, F, Fut>(&self, filters: &[S], callback: F) -> Result<ListenerId>
    where
        S: AsRef<str>,
        F: Fn(Config, ChangeSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: Callback = Arc::new(move |config: Config, changes: ChangeSet| -> ListenerFuture {
            Box::pin(callback(config, changes))
        });
        let listener = Listener::new(
            filters.iter().map(|f| f.as_ref().to_string()).collect(),
            callback,
        );
        let (reply, id) = oneshot::channel();
        self.command(Command::Register { listener, reply }).await?;
        id.await.map_err(|_| Error::Closed)
    }

    /// Remove a listener. Unknown ids are ignored.
    pub async fn unregister(&self, id: ListenerId) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.command(Command::Unregister { id, reply }).await?;
        done.await.map_err(|_| Error::Closed)
    }

    /// Stop watching the stores, let both tasks finish their pending work
    /// and wait for them to exit.
    ///
    /// Later calls to `set`, `reset`, `register` and `unregister` fail with
    /// [`Error::Closed`]; `get` keeps returning the last tree. Every caller,
    /// including concurrent ones on other clones, returns only once both
    /// tasks are gone. Closing twice is a no-op.
    pub async fn close(&self) {
        drop(lock(&self.inner.channels).take());
        let mut tasks = self.inner.tasks.lock().await;
        let Some(Tasks { mutation, dispatch }) = tasks.take() else {
            return;
        };

        for task in [mutation, dispatch] {
            if let Err(e) = task.await
                && e.is_panic()
            {
                std::panic::resume_unwind(e.into_panic());
            }
        }
        info!("Config closed");
    }

    async fn request(&self, request: Request) -> Result<()> {
        let sender = lock(&self.inner.channels)
            .as_ref()
            .map(|c| c.requests.clone())
            .ok_or(Error::Closed)?;
        sender.send(request).await.map_err(|_| Error::Closed)
    }

    async fn command(&self, command: Command) -> Result<()> {
        let sender = lock(&self.inner.channels)
            .as_ref()
            .map(|c| c.commands.clone())
            .ok_or(Error::Closed)?;
        sender.send(command).await.map_err(|_| Error::Closed)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("keys", &self.inner.tree.load().len())
            .field("closed", &lock(&self.inner.channels).is_none())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
