//! Error types shared by the tree engine, the stores and the config handle.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by tree navigation, value conversion, stores and the
/// config actors.
#[derive(Debug, Error)]
pub enum Error {
    /// The path has no corresponding entry.
    #[error("element at {path} not found")]
    ElementNotFound { path: String },

    /// The path tries to descend through a non-node value.
    #[error("element at {path} is pointing inside a value")]
    PathInsideValue { path: String },

    /// The path is malformed.
    #[error("path {path:?} is invalid: {reason}")]
    PathInvalid { path: String, reason: String },

    /// A value does not have the expected shape.
    #[error("{}", describe_unexpected(.path, .got, .expected.as_deref()))]
    UnexpectedType {
        path: String,
        got: String,
        expected: Option<String>,
    },

    /// A mapping being converted into a node has a non-string key.
    #[error("key {key} is of type {kind}, only strings are supported")]
    KeyIsNotString { key: String, kind: String },

    /// A write targets something that cannot hold the given value.
    #[error("cannot modify {target} with a value of type {kind}")]
    CannotModify { target: String, kind: String },

    /// Free-form serde failure while converting a typed value.
    #[error("{0}")]
    Codec(String),

    /// `set`/`reset` was called on a config without stores.
    #[error("there are no stores to write to")]
    NoWritableStore,

    /// The config has been closed.
    #[error("config is closed")]
    Closed,

    #[error("reading {} failed: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {} failed: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding {} failed: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("encoding {} failed: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    #[error("watching {} failed: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Failure reported by a custom store implementation.
    #[error("store {store} failed: {message}")]
    Store { store: String, message: String },
}

fn describe_unexpected(path: &str, got: &str, expected: Option<&str>) -> String {
    match (path.is_empty(), expected) {
        (false, Some(expected)) => {
            format!("element at {path} is of type {got} instead of {expected}")
        }
        (false, None) => format!("element at {path} is of unexpected type {got}"),
        (true, Some(expected)) => format!("element is of type {got} instead of {expected}"),
        (true, None) => format!("element is of unexpected type {got}"),
    }
}

impl Error {
    pub fn element_not_found(path: impl Into<String>) -> Self {
        Self::ElementNotFound { path: path.into() }
    }

    pub fn path_inside_value(path: impl Into<String>) -> Self {
        Self::PathInsideValue { path: path.into() }
    }

    pub fn path_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn unexpected_type(
        path: impl Into<String>,
        got: impl Into<String>,
        expected: Option<&str>,
    ) -> Self {
        Self::UnexpectedType {
            path: path.into(),
            got: got.into(),
            expected: expected.map(str::to_string),
        }
    }

    pub fn store(store: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Store {
            store: store.into(),
            message: err.to_string(),
        }
    }

    /// Attach a path to a conversion error that was raised without one.
    pub fn at_path(self, at: &str) -> Self {
        match self {
            Self::UnexpectedType {
                path,
                got,
                expected,
            } if path.is_empty() => Self::UnexpectedType {
                path: at.to_string(),
                got,
                expected,
            },
            other => other,
        }
    }

    /// True for errors that mean "nothing stored at this path".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. })
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Codec(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Codec(msg.to_string())
    }

    fn invalid_type(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        Self::UnexpectedType {
            path: String::new(),
            got: unexp.to_string(),
            expected: Some(exp.to_string()),
        }
    }
}

/// Result type for tree, store and config operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_type_messages() {
        let err = Error::unexpected_type(".a.b", "string", Some("node"));
        assert_eq!(
            err.to_string(),
            "element at .a.b is of type string instead of node"
        );

        let err = Error::unexpected_type("", "list", None);
        assert_eq!(err.to_string(), "element is of unexpected type list");
    }

    #[test]
    fn test_at_path_only_fills_missing_path() {
        let err = Error::unexpected_type("", "string", Some("i64")).at_path(".port");
        assert!(matches!(err, Error::UnexpectedType { ref path, .. } if path == ".port"));

        let err = Error::unexpected_type(".x", "string", None).at_path(".port");
        assert!(matches!(err, Error::UnexpectedType { ref path, .. } if path == ".x"));

        let err = Error::element_not_found(".a").at_path(".b");
        assert!(err.is_not_found());
    }
}
