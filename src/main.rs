//! cfgtree command-line front end.

use anyhow::{Context, Result};
use cfgtree::cli::{Cli, Command, DumpFormat};
use cfgtree::logging::{self, LogTarget};
use cfgtree::{ChangeSet, Config, FileFormat, FileStore, Store, Value};
use clap::Parser;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let stores: Vec<Arc<dyn Store>> = cli
        .stores
        .iter()
        .map(|path| Arc::new(FileStore::open(path)) as Arc<dyn Store>)
        .collect();
    let config = Config::new(stores)
        .await
        .context("Failed to load configuration")?;

    let result = run(&config, cli.command).await;
    config.close().await;
    result
}

async fn run(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Get { path } => run_get(config, &path),
        Command::Set { path, value } => run_set(config, &path, &value).await,
        Command::Reset { path } => {
            config
                .reset(&path)
                .await
                .with_context(|| format!("Failed to reset {path}"))?;
            Ok(())
        }
        Command::Dump { format } => run_dump(config, format),
        Command::Watch { filters } => run_watch(config, filters).await,
    }
}

fn run_get(config: &Config, path: &str) -> Result<()> {
    let value: Value = config
        .get(path)
        .with_context(|| format!("Failed to read {path}"))?;
    print!("{}", serde_yaml::to_string(&value)?);
    Ok(())
}

/// VALUE is YAML. JSON is tried first since it is a subset that keeps
/// number text exactly.
async fn run_set(config: &Config, path: &str, text: &str) -> Result<()> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str(text).with_context(|| format!("Invalid value: {text}"))?,
    };
    debug!(path, kind = value.kind(), "Parsed value");
    config
        .set(path, &value)
        .await
        .with_context(|| format!("Failed to set {path}"))?;
    Ok(())
}

fn run_dump(config: &Config, format: DumpFormat) -> Result<()> {
    let tree = config.snapshot();
    let format = match format {
        DumpFormat::Json => FileFormat::Json,
        DumpFormat::Yaml => FileFormat::Yaml,
    };
    let text = format.encode(&tree).map_err(anyhow::Error::msg)?;
    print!("{text}");
    Ok(())
}

async fn run_watch(config: &Config, filters: Vec<String>) -> Result<()> {
    config
        .register(filters.as_slice(), |_config, changes: ChangeSet| async move {
            let changes = changes.sorted();
            for path in &changes.modified {
                println!("modified {path}");
            }
            for path in &changes.added {
                println!("added    {path}");
            }
            for path in &changes.removed {
                println!("removed  {path}");
            }
        })
        .await?;

    tokio::signal::ctrl_c().await?;
    Ok(())
}
