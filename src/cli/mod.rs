//! CLI command definitions for cfgtree.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output encoding for `dump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DumpFormat {
    Json,
    #[default]
    Yaml,
}

/// Read, change and watch a configuration merged from several files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file, highest priority first; the first one receives writes.
    /// The format follows the extension (.json, otherwise YAML)
    #[arg(short, long = "store", value_name = "FILE", required = true, global = true)]
    pub stores: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value at PATH as YAML
    Get {
        /// Root-relative path such as `.server.port`; `.` is the whole tree
        path: String,
    },

    /// Write VALUE at PATH into the first store
    Set {
        path: String,
        /// Parsed as YAML, so `8080`, `true`, `[a, b]` and `{x: 1}` keep their types
        value: String,
    },

    /// Remove PATH from the first store, uncovering lower stores
    Reset { path: String },

    /// Print the merged tree
    Dump {
        #[arg(short, long, value_enum, default_value_t = DumpFormat::default())]
        format: DumpFormat,
    },

    /// Print every change below the given paths until interrupted
    Watch {
        /// Paths to watch; none means the whole tree
        filters: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let cli = Cli::parse_from([
            "cfgtree", "--store", "local.yaml", "-s", "base.json", "set", ".port", "8080",
        ]);
        assert_eq!(
            cli.stores,
            vec![PathBuf::from("local.yaml"), PathBuf::from("base.json")]
        );
        assert!(matches!(
            cli.command,
            Command::Set { ref path, ref value } if path == ".port" && value == "8080"
        ));
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn test_store_required() {
        assert!(Cli::try_parse_from(["cfgtree", "dump"]).is_err());
    }

    #[test]
    fn test_dump_format() {
        let cli = Cli::parse_from(["cfgtree", "-s", "a.yaml", "dump", "--format", "json"]);
        assert!(matches!(cli.command, Command::Dump { format: DumpFormat::Json }));
    }
}
