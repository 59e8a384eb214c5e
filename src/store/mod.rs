//! Backing stores a config tree is merged from.
//!
//! A store holds one whole tree. It is read and written as a unit and can
//! signal "something changed, reload" through a capacity-one channel. The
//! config handle takes an ordered list of stores, highest priority first;
//! the first store is the one writes go to.

mod file;
mod format;
mod memory;

pub use file::{FileStore, WatcherConfig};
pub use format::FileFormat;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::tree::Node;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

/// A backing medium for a config tree.
#[async_trait]
pub trait Store: Send + Sync {
    /// Identifier used in logs and errors.
    fn name(&self) -> String;

    /// Read the whole tree. A medium that does not exist yet reads as an empty tree.
    async fn read(&self) -> Result<Node>;

    /// Replace the whole tree. Implementations should not leave a partially
    /// written medium behind if they fail midway.
    async fn write(&self, tree: &Node) -> Result<()>;

    /// Install the channel that external changes are signalled on, replacing
    /// any previous one. `None` unsubscribes.
    fn subscribe(&self, notify: Option<mpsc::Sender<()>>) -> Result<()>;
}

/// Holds the single change subscriber of a store.
///
/// Signals never block: when the subscriber already has a pending signal
/// the new one is dropped.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    sender: Mutex<Option<mpsc::Sender<()>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subscriber, returning the previous one.
    pub fn set(&self, sender: Option<mpsc::Sender<()>>) -> Option<mpsc::Sender<()>> {
        let mut slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, sender)
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Signal the subscriber, if any.
    pub fn notify(&self) {
        let slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = slot.as_ref()
            && sender.try_send(()).is_err()
        {
            trace!("Change signal dropped, one is already pending");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_coalesces() {
        let notifier = ChangeNotifier::new();
        notifier.notify();

        let (tx, mut rx) = mpsc::channel(1);
        assert!(notifier.set(Some(tx)).is_none());
        assert!(notifier.is_subscribed());

        notifier.notify();
        notifier.notify();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        assert!(notifier.set(None).is_some());
        notifier.notify();
        assert!(rx.try_recv().is_err());
    }
}
