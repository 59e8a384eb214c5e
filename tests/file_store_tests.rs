//! Integration tests for file-backed stores.
//!
//! Tests a config layered over JSON and YAML files in a temp directory:
//! - writes land in the first file and are replaced atomically
//! - external edits are picked up by the watcher and reach listeners
//! - broken files fail the initial load

use cfgtree::{ChangeSet, Config, Error, FileStore, Number, Store, Value, WatcherConfig};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(10);

fn watched(path: &Path) -> Arc<dyn Store> {
    Arc::new(FileStore::open(path).with_watcher_config(WatcherConfig {
        debounce: Duration::from_millis(50),
    }))
}

async fn eventually(check: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !check() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Replace a file the way editors do: write a sibling, then rename it over.
fn replace_file(path: &Path, content: &str) {
    let temp = path.with_extension("edit");
    fs::write(&temp, content).unwrap();
    fs::rename(&temp, path).unwrap();
}

/// Base YAML content shared by the tests.
fn base_yaml() -> &'static str {
    r#"
server:
  host: localhost
  port: 8080
features: [search, upload]
"#
}

#[tokio::test]
async fn test_layered_files_merge() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.json");
    fs::write(&base, base_yaml()).unwrap();
    fs::write(&local, r#"{"server": {"port": 9000}}"#).unwrap();

    let config = Config::new(vec![watched(&local), watched(&base)])
        .await
        .unwrap();
    assert_eq!(config.get::<u16>(".server.port").unwrap(), 9000);
    assert_eq!(config.get::<String>(".server.host").unwrap(), "localhost");
    assert_eq!(
        config.get::<Vec<String>>(".features").unwrap(),
        vec!["search", "upload"]
    );

    config.close().await;
}

#[tokio::test]
async fn test_set_writes_first_file_only() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.json");
    fs::write(&base, base_yaml()).unwrap();

    let config = Config::new(vec![watched(&local), watched(&base)])
        .await
        .unwrap();
    config.set(".server.port", &9100).await.unwrap();
    config.set(".ratio", &1.25).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&local).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!({"server": {"port": 9100}, "ratio": 1.25})
    );
    assert_eq!(fs::read_to_string(&base).unwrap(), base_yaml());
    assert!(!dir.path().join("local.json.tmp").exists());

    eventually(|| config.get::<u16>(".server.port").ok() == Some(9100)).await;
    assert_eq!(config.get::<String>(".server.host").unwrap(), "localhost");

    config.reset(".server").await.unwrap();
    eventually(|| config.get::<u16>(".server.port").ok() == Some(8080)).await;

    config.close().await;
}

#[tokio::test]
async fn test_external_edit_reaches_listener() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, base_yaml()).unwrap();

    let config = Config::new(vec![watched(&path)]).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeSet>();
    config
        .register(&[".server"], move |_config, changes| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(changes.sorted());
            }
        })
        .await
        .unwrap();

    let bootstrap = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        bootstrap.added,
        vec![".server", ".server.host", ".server.port"]
    );

    replace_file(&path, &base_yaml().replace("8080", "8181"));
    let changes = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(changes.modified, vec![".server.port"]);
    assert_eq!(config.get::<u16>(".server.port").unwrap(), 8181);

    config.close().await;
}

#[tokio::test]
async fn test_unrelated_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, base_yaml()).unwrap();

    let config = Config::new(vec![watched(&path)]).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeSet>();
    config
        .register(&[] as &[&str], move |_config, changes| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(changes);
            }
        })
        .await
        .unwrap();
    timeout(WAIT, rx.recv()).await.unwrap().unwrap();

    fs::write(dir.path().join("other.yaml"), "a: 1\n").unwrap();
    sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());

    config.close().await;
}

#[tokio::test]
async fn test_json_file_keeps_number_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers.json");
    fs::write(&path, r#"{"ratio": 0.10, "scale": 1e2}"#).unwrap();

    let config = Config::new(vec![watched(&path)]).await.unwrap();
    let num = |text: &str| Value::Number(Number::parse(text).unwrap());
    assert_eq!(config.get::<Value>(".ratio").unwrap(), num("0.10"));
    assert_eq!(config.get::<Value>(".scale").unwrap(), num("1e2"));

    let long = num("0.12345678901234567890123");
    config.set(".long", &long).await.unwrap();
    config.set(".one", &num("1.0")).await.unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"ratio\": 0.10"));
    assert!(written.contains("\"scale\": 1e2"));
    assert!(written.contains("\"long\": 0.12345678901234567890123"));
    assert!(written.contains("\"one\": 1.0"));

    eventually(|| config.get::<Value>(".one").ok() == Some(num("1.0"))).await;
    assert_eq!(config.get::<Value>(".long").unwrap(), long);

    config.close().await;
}

#[tokio::test]
async fn test_dotted_key_in_file_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dotted.yaml");
    fs::write(&path, "server.port: 8080\n").unwrap();

    let result = Config::new(vec![watched(&path)]).await;
    assert!(matches!(result, Err(Error::Decode { .. })));
}

#[tokio::test]
async fn test_missing_file_is_empty_layer() {
    let dir = TempDir::new().unwrap();
    let config = Config::new(vec![watched(&dir.path().join("absent.yaml"))])
        .await
        .unwrap();
    assert!(config.snapshot().is_empty());
    config.close().await;
}

#[tokio::test]
async fn test_broken_file_fails_initial_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"server\": ").unwrap();

    let result = Config::new(vec![watched(&path)]).await;
    assert!(matches!(result, Err(Error::Decode { .. })));
}
