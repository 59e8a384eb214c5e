//! Change listeners and the registry the dispatch task keeps them in.

use super::Config;
use crate::tree::ChangeSet;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Identifies a registered listener.
pub type ListenerId = u64;

pub(crate) type ListenerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub(crate) type Callback = Arc<dyn Fn(Config, ChangeSet) -> ListenerFuture + Send + Sync>;

/// A callback together with the subtrees it is interested in.
#[derive(Clone)]
pub(crate) struct Listener {
    filters: Vec<String>,
    callback: Callback,
}

impl Listener {
    /// Without filters a listener watches the whole tree.
    pub(crate) fn new(filters: Vec<String>, callback: Callback) -> Self {
        let mut filters: Vec<String> = filters
            .into_iter()
            .map(|f| if f == "." { String::new() } else { f })
            .collect();
        if filters.is_empty() {
            filters.push(String::new());
        }
        Self { filters, callback }
    }

    pub(crate) fn filters(&self) -> &[String] {
        &self.filters
    }

    /// The part of `changes` this listener cares about.
    pub(crate) fn select(&self, changes: &ChangeSet) -> ChangeSet {
        changes.filter(&self.filters)
    }

    pub(crate) fn call(&self, config: Config, changes: ChangeSet) -> ListenerFuture {
        (self.callback)(config, changes)
    }
}

/// Listeners by id. Ids are never reused.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: BTreeMap<ListenerId, Listener>,
    next_id: ListenerId,
}

impl Listeners {
    pub(crate) fn insert(&mut self, listener: Listener) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, listener);
        id
    }

    /// Returns `true` if the id was registered.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub(crate) fn get(&self, id: ListenerId) -> Option<&Listener> {
        self.entries.get(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Arc::new(|_config: Config, _changes: ChangeSet| -> ListenerFuture { Box::pin(async {}) })
    }

    #[test]
    fn test_empty_filters_watch_root() {
        let listener = Listener::new(Vec::new(), noop());
        assert_eq!(listener.filters(), &[String::new()]);

        let listener = Listener::new(vec![".".to_string(), ".a".to_string()], noop());
        assert_eq!(listener.filters(), &[String::new(), ".a".to_string()]);
    }

    #[test]
    fn test_select_unions_filters() {
        let listener = Listener::new(vec![".a".to_string(), ".b".to_string()], noop());
        let changes = ChangeSet {
            modified: vec![".a.x".into(), ".c".into()],
            added: vec![".b".into()],
            removed: vec![".bb".into()],
        };
        let selected = listener.select(&changes);
        assert_eq!(selected.modified, vec![".a.x".to_string()]);
        assert_eq!(selected.added, vec![".b".to_string()]);
        assert!(selected.removed.is_empty());
    }

    #[test]
    fn test_registry_ids_not_reused() {
        let mut listeners = Listeners::default();
        let a = listeners.insert(Listener::new(Vec::new(), noop()));
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        let b = listeners.insert(Listener::new(Vec::new(), noop()));
        assert_ne!(a, b);
        assert_eq!(listeners.len(), 1);
        assert!(listeners.get(b).is_some());
    }
}
