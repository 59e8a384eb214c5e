//! Tree operations: navigation, typed get/set, removal, diff, merge and validation.
//!
//! Merge and diff share one rule: where both sides hold a node at a key they
//! recurse, otherwise the new side replaces the old one entirely. Lists are
//! never merged element-wise.

use super::codec;
use super::path::{self, SEPARATOR};
use super::value::{Node, Value};
use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::btree_map::Entry;

/// Paths that differ between two trees.
///
/// Paths are root-relative (`.a.b`). Order is unspecified; treat each list as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.modified.len() + self.added.len() + self.removed.len()
    }

    /// Keep only the paths that lie inside at least one of `filters`.
    pub fn filter<S: AsRef<str>>(&self, filters: &[S]) -> ChangeSet {
        let keep = |paths: &[String]| -> Vec<String> {
            paths
                .iter()
                .filter(|p| filters.iter().any(|f| path::contains(p, f.as_ref())))
                .cloned()
                .collect()
        };
        ChangeSet {
            modified: keep(&self.modified),
            added: keep(&self.added),
            removed: keep(&self.removed),
        }
    }

    /// Sort every list, for stable output.
    pub fn sorted(mut self) -> Self {
        self.modified.sort();
        self.added.sort();
        self.removed.sort();
        self
    }
}

impl Node {
    /// Make sure every node along `path` exists and return the last one.
    ///
    /// Existing non-node values along the way are overwritten with empty nodes.
    pub fn create_path(&mut self, path: &str) -> Result<&mut Node> {
        let keys = path::segments(path)?;
        Ok(self.create_keys(&keys))
    }

    fn create_keys(&mut self, keys: &[&str]) -> &mut Node {
        let mut node = self;
        for key in keys {
            let slot = match node.entry(key) {
                Entry::Vacant(entry) => entry.insert(Value::Node(Node::new())),
                Entry::Occupied(entry) => {
                    let slot = entry.into_mut();
                    if !slot.is_node() {
                        *slot = Value::Node(Node::new());
                    }
                    slot
                }
            };
            node = match slot {
                Value::Node(child) => child,
                _ => unreachable!("slot was just made a node"),
            };
        }
        node
    }

    /// Convert `value` and store it at `path`.
    ///
    /// Writing the root merges the converted node's keys into this node,
    /// keeping unrelated keys; any other path replaces the value at its key.
    pub fn set<T: Serialize + ?Sized>(&mut self, path: &str, value: &T) -> Result<()> {
        let value = codec::to_value(value)?;
        self.set_value(path, value)
    }

    /// Store an already converted value at `path`, with the same rules as [`Node::set`].
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<()> {
        let keys = path::segments(path)?;
        let Some((last, parents)) = keys.split_last() else {
            return match value {
                Value::Node(node) => {
                    for (key, child) in node {
                        self.insert(key, child);
                    }
                    Ok(())
                }
                other => Err(Error::CannotModify {
                    target: "root node".to_string(),
                    kind: other.kind().to_string(),
                }),
            };
        };
        self.create_keys(parents).insert(*last, value);
        Ok(())
    }

    /// Read the value at `path` and convert it into `T`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let keys = path::segments(path)?;
        let result = match keys.split_last() {
            None => codec::from_node(self),
            Some(_) => codec::from_value(self.lookup(path, &keys)?),
        };
        result.map_err(|e| e.at_path(path))
    }

    /// Borrow the value at a non-root `path`.
    pub fn get_value(&self, path: &str) -> Result<&Value> {
        let keys = path::segments(path)?;
        if keys.is_empty() {
            return Err(Error::unexpected_type(path, "node", Some("value below the root")));
        }
        self.lookup(path, &keys)
    }

    fn lookup<'a>(&'a self, path: &str, keys: &[&str]) -> Result<&'a Value> {
        let mut node = self;
        let mut found: Option<&Value> = None;
        for key in keys {
            if let Some(value) = found {
                node = value
                    .as_node()
                    .ok_or_else(|| Error::path_inside_value(path))?;
            }
            found = Some(
                node.child(key)
                    .ok_or_else(|| Error::element_not_found(path))?,
            );
        }
        found.ok_or_else(|| Error::element_not_found(path))
    }

    pub fn get_bool(&self, path: &str, fallback: bool) -> bool {
        self.get(path).unwrap_or(fallback)
    }

    pub fn get_string(&self, path: &str, fallback: &str) -> String {
        self.get(path).unwrap_or_else(|_| fallback.to_string())
    }

    pub fn get_i64(&self, path: &str, fallback: i64) -> i64 {
        self.get(path).unwrap_or(fallback)
    }

    pub fn get_u64(&self, path: &str, fallback: u64) -> u64 {
        self.get(path).unwrap_or(fallback)
    }

    pub fn get_f64(&self, path: &str, fallback: f64) -> f64 {
        self.get(path).unwrap_or(fallback)
    }

    /// Delete the element at `path` from its parent.
    ///
    /// The root cannot be detached, so removing it empties it instead.
    /// Removing a missing element is a no-op.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let keys = path::segments(path)?;
        let Some((last, parents)) = keys.split_last() else {
            self.clear();
            return Ok(());
        };
        let mut node = self;
        for key in parents {
            node = match node.child_mut(key) {
                None => return Ok(()),
                Some(Value::Node(child)) => child,
                Some(_) => return Err(Error::path_inside_value(path)),
            };
        }
        node.remove_child(last);
        Ok(())
    }

    /// Diff this tree against `new`.
    ///
    /// A key whose node turned into a value (or the reverse) is modified, and
    /// every path below the vanished or appeared node is removed or added.
    pub fn compare(&self, new: &Node) -> ChangeSet {
        let mut changes = ChangeSet::default();
        self.compare_into(new, "", &mut changes);
        changes
    }

    fn compare_into(&self, new: &Node, prefix: &str, changes: &mut ChangeSet) {
        for (key, old) in self {
            let at = path::child(prefix, key);
            match (old, new.child(key)) {
                (Value::Node(a), Some(Value::Node(b))) => a.compare_into(b, &at, changes),
                (Value::Node(a), Some(_)) => {
                    a.collect_paths(&at, &mut changes.removed);
                    changes.modified.push(at);
                }
                (_, Some(Value::Node(b))) => {
                    b.collect_paths(&at, &mut changes.added);
                    changes.modified.push(at);
                }
                (a, Some(b)) => {
                    if a != b {
                        changes.modified.push(at);
                    }
                }
                (a, None) => {
                    if let Value::Node(a) = a {
                        a.collect_paths(&at, &mut changes.removed);
                    }
                    changes.removed.push(at);
                }
            }
        }

        for (key, value) in new {
            if self.contains_key(key) {
                continue;
            }
            let at = path::child(prefix, key);
            if let Value::Node(b) = value {
                b.collect_paths(&at, &mut changes.added);
            }
            changes.added.push(at);
        }
    }

    /// Push the path of every descendant below `prefix`.
    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (key, value) in self {
            let at = path::child(prefix, key);
            if let Value::Node(child) = value {
                child.collect_paths(&at, out);
            }
            out.push(at);
        }
    }

    /// Deep-merge `new` into this tree; `new` wins wherever either side is not a node.
    pub fn merge(&mut self, new: Node) {
        for (key, incoming) in new {
            match self.entry(&key) {
                Entry::Vacant(entry) => {
                    entry.insert(incoming);
                }
                Entry::Occupied(mut entry) => match (entry.get_mut(), incoming) {
                    (Value::Node(current), Value::Node(incoming)) => current.merge(incoming),
                    (current, incoming) => *current = incoming,
                },
            }
        }
    }

    /// Deep copy. Nothing is shared with the original.
    pub fn copy(&self) -> Node {
        self.clone()
    }

    /// Validate the whole tree, returning the first violation found.
    ///
    /// Keys must not contain the separator and numbers must be decimal text.
    /// List elements are reported with their index as a pseudo path segment.
    pub fn check(&self) -> Result<()> {
        check_node(self, "")
    }
}

fn check_node(node: &Node, prefix: &str) -> Result<()> {
    for (key, value) in node {
        let at = path::child(prefix, key);
        if key.contains(SEPARATOR) {
            return Err(Error::path_invalid(at, "key contains the separator"));
        }
        check_value(value, &at)?;
    }
    Ok(())
}

fn check_value(value: &Value, at: &str) -> Result<()> {
    match value {
        Value::Node(node) => check_node(node, at),
        Value::List(values) => {
            for (index, value) in values.iter().enumerate() {
                check_value(value, &path::child(at, &index.to_string()))?;
            }
            Ok(())
        }
        Value::Number(number) => number.check().map_err(|e| e.at_path(at)),
        Value::Bool(_) | Value::String(_) | Value::Null => Ok(()),
    }
}
