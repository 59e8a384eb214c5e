//! Dot-separated paths addressing locations in a tree.
//!
//! Paths used with tree operations are root-relative: they start with the
//! separator (`.box.width`). The empty path `""` and `"."` both address the
//! root node. Segments between separators may be empty, which addresses a
//! child with an empty key.

use crate::error::{Error, Result};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Delimits single path segments.
pub const SEPARATOR: char = '.';

static STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.+|\.+$|\r|\n").expect("valid strip pattern"));
static RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid runs pattern"));

/// Concatenate segments with the separator.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a path on the separator.
///
/// An empty string yields a single empty segment, not zero segments.
pub fn split(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).collect()
}

/// True if the segments of `prefix` are a leading run of the segments of `path`.
///
/// Comparison is segment-wise, so `.ab` does not contain `.a`. A path always
/// contains itself, and every root-relative path contains the root filter `""`.
pub fn contains(path: &str, prefix: &str) -> bool {
    let path = split(path);
    let prefix = split(prefix);
    prefix.len() <= path.len() && path.iter().zip(&prefix).all(|(a, b)| a == b)
}

/// Remove leading and trailing separators and line breaks, and collapse runs
/// of separators into one.
pub fn clean(path: &str) -> String {
    let stripped = STRIP.replace_all(path, "");
    RUNS.replace_all(&stripped, ".").into_owned()
}

/// Parse a root-relative path into the keys it walks through.
///
/// Returns no keys for the root path (`""` or `"."`).
pub(crate) fn segments(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() || path == "." {
        return Ok(Vec::new());
    }
    match path.strip_prefix(SEPARATOR) {
        Some(rest) => Ok(split(rest)),
        None => Err(Error::path_invalid(
            path,
            "path must start with the separator",
        )),
    }
}

/// Build the root-relative path of `key` below `parent`.
pub(crate) fn child(parent: &str, key: &str) -> String {
    let mut path = String::with_capacity(parent.len() + key.len() + 1);
    path.push_str(parent);
    path.push(SEPARATOR);
    path.push_str(key);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join(&["foo", "bar"]), "foo.bar");
        assert_eq!(join(&["", "foo", "bar"]), ".foo.bar");
        assert_eq!(join::<&str>(&[]), "");
    }

    #[test]
    fn test_split_empty_is_one_segment() {
        assert_eq!(split(""), vec![""]);
        assert_eq!(split(".a.b"), vec!["", "a", "b"]);
        assert_eq!(split("a..b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_contains_is_segment_wise() {
        assert!(contains(".a.b.c", ".a.b"));
        assert!(contains(".a.b", ".a.b"));
        assert!(contains(".a", ""));
        assert!(!contains(".ab", ".a"));
        assert!(!contains(".a", ".a.b"));
        assert!(!contains(".x.y", ".a"));
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("foo.bar"), "foo.bar");
        assert_eq!(clean(".foo.bar."), "foo.bar");
        assert_eq!(clean(".foo.\n\r.bar."), "foo.bar");
        assert_eq!(clean("...foo...bar"), "foo.bar");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_segments() {
        assert!(segments("").unwrap().is_empty());
        assert!(segments(".").unwrap().is_empty());
        assert_eq!(segments(".a.b").unwrap(), vec!["a", "b"]);
        assert_eq!(segments(".a..b").unwrap(), vec!["a", "", "b"]);
        assert!(matches!(
            segments("a.b"),
            Err(Error::PathInvalid { .. })
        ));
    }

    #[test]
    fn test_child() {
        assert_eq!(child("", "a"), ".a");
        assert_eq!(child(".a", "b"), ".a.b");
    }
}
