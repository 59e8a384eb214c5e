//! File-backed store with change watching.
//!
//! The file's parent directory is watched instead of the file itself, and
//! events are filtered by file name. Writes replace the file by renaming a
//! temporary sibling over it, which would otherwise detach a watch placed on
//! the old file. Rapid changes are coalesced by a debouncer.

use super::{ChangeNotifier, FileFormat, Store};
use crate::error::{Error, Result};
use crate::tree::Node;
use async_trait::async_trait;
use notify::RecommendedWatcher;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer};
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
        }
    }
}

/// A tree stored as a JSON or YAML document on disk.
pub struct FileStore {
    path: PathBuf,
    format: FileFormat,
    watcher_config: WatcherConfig,
    watcher: Mutex<Option<Debouncer<RecommendedWatcher>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            watcher_config: WatcherConfig::default(),
            watcher: Mutex::new(None),
        }
    }

    /// Open a file, choosing the format from its extension.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self::new(path, format)
    }

    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileFormat::Json)
    }

    pub fn yaml(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileFormat::Yaml)
    }

    pub fn with_watcher_config(mut self, config: WatcherConfig) -> Self {
        self.watcher_config = config;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn watch_error(&self, source: notify::Error) -> Error {
        Error::Watch {
            path: self.path.clone(),
            source,
        }
    }

    /// Start a debounced watch on the parent directory that signals `notifier`
    /// whenever this store's file changes.
    fn start_watcher(&self, notifier: ChangeNotifier) -> Result<Debouncer<RecommendedWatcher>> {
        let file_name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| self.watch_error(notify::Error::generic("path has no file name")))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let path = self.path.clone();
        let mut debouncer = new_debouncer(
            self.watcher_config.debounce,
            move |result: DebounceEventResult| forward_events(result, &path, &file_name, &notifier),
        )
        .map_err(|e| self.watch_error(e))?;

        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)
            .map_err(|e| self.watch_error(e))?;
        info!(path = %self.path.display(), "Watching config file");

        Ok(debouncer)
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("watcher_config", &self.watcher_config)
            .finish_non_exhaustive()
    }
}

/// Signal `notifier` if a debounced batch touched the watched file.
fn forward_events(
    result: DebounceEventResult,
    path: &Path,
    file_name: &OsString,
    notifier: &ChangeNotifier,
) {
    match result {
        Ok(events) => {
            let touched = events.iter().any(|event| {
                matches!(
                    event.kind,
                    DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                ) && event.path.file_name() == Some(file_name.as_os_str())
            });
            if touched {
                debug!(path = %path.display(), "Config file change detected");
                notifier.notify();
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "File watcher error");
        }
    }
}

#[async_trait]
impl Store for FileStore {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<Node> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Config file missing, reading as empty");
                return Ok(Node::new());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let tree = self.format.decode(&content).map_err(|message| Error::Decode {
            path: self.path.clone(),
            message,
        })?;
        debug!(path = %self.path.display(), keys = tree.len(), "Read config file");
        Ok(tree)
    }

    async fn write(&self, tree: &Node) -> Result<()> {
        let text = self.format.encode(tree).map_err(|message| Error::Encode {
            path: self.path.clone(),
            message,
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, text)
            .await
            .map_err(|source| Error::Write {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| Error::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), "Wrote config file");
        Ok(())
    }

    fn subscribe(&self, notify: Option<mpsc::Sender<()>>) -> Result<()> {
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        // Dropping the debouncer stops the previous watch.
        *watcher = None;

        let Some(sender) = notify else {
            return Ok(());
        };
        let notifier = ChangeNotifier::new();
        notifier.set(Some(sender));
        *watcher = Some(self.start_watcher(notifier)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Number;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::json(dir.path().join("absent.json"));
        assert!(store.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let store = FileStore::open(&path);
        assert_eq!(store.format(), FileFormat::Yaml);

        let tree = Node::new().with("box", Node::new().with("width", Number::from(12)));
        store.write(&tree).await.unwrap();

        assert_eq!(store.read().await.unwrap(), tree);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_decode_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileStore::json(&path).read().await.unwrap_err();
        assert!(matches!(err, Error::Decode { path: ref p, .. } if p == &path));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = FileStore::json("/etc/app/config.json");
        assert_eq!(store.temp_path(), PathBuf::from("/etc/app/config.json.tmp"));
    }
}
