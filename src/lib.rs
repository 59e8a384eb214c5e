//! cfgtree: a hierarchical configuration tree merged from prioritized stores.
//!
//! A [`Config`] reads every [`Store`] once, merges them with the first store
//! winning, and keeps the result up to date as stores change. Values are read
//! and written at dot-separated paths (`.server.port`) through serde, writes
//! land in the first store, and listeners are told which paths were
//! modified, added or removed.
//!
//! ```no_run
//! use cfgtree::{Config, FileStore, Store};
//! use std::sync::Arc;
//!
//! # async fn demo() -> cfgtree::Result<()> {
//! let stores: Vec<Arc<dyn Store>> = vec![
//!     Arc::new(FileStore::open("local.yaml")),
//!     Arc::new(FileStore::open("defaults.json")),
//! ];
//! let config = Config::new(stores).await?;
//!
//! config.set(".server.port", &8080).await?;
//! config
//!     .register(&[".server"], |_config, changes| async move {
//!         println!("server changed: {:?}", changes.modified);
//!     })
//!     .await?;
//!
//! let host: String = config.get(".server.host")?;
//! # let _ = host;
//! config.close().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod tree;

pub use config::{Config, ConfigOptions, ListenerId};
pub use error::{Error, Result};
pub use store::{FileFormat, FileStore, MemoryStore, Store, WatcherConfig};
pub use tree::{ChangeSet, Node, Number, Value};
