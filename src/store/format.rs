//! Text encodings for file stores.
//!
//! JSON files keep every number's exact text. YAML files hold native YAML
//! numbers, so text with more precision than an `f64` (or a non-canonical
//! spelling such as `0.10`) comes back normalized, and numbers beyond the
//! float range cannot be written.

use crate::tree::{Node, Value};
use std::path::Path;

/// Encoding of a file-backed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// Pick a format from the file extension. Anything that is not `.json`
    /// is treated as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Decode file content. Blank content is an empty tree.
    ///
    /// The result must be a valid tree: keys containing the path separator
    /// are rejected here rather than surfacing later as ambiguous paths.
    pub fn decode(self, content: &str) -> Result<Node, String> {
        if content.trim().is_empty() {
            return Ok(Node::new());
        }
        let tree: Node = match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
            FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
        };
        tree.check().map_err(|e| e.to_string())?;
        Ok(tree)
    }

    pub fn encode(self, tree: &Node) -> Result<String, String> {
        match self {
            FileFormat::Json => {
                let json = to_json(&Value::Node(tree.clone()))?;
                let mut text = serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?;
                text.push('\n');
                Ok(text)
            }
            FileFormat::Yaml => serde_yaml::to_string(tree).map_err(|e| e.to_string()),
        }
    }
}

/// Build the JSON document, carrying number text over verbatim.
fn to_json(value: &Value) -> Result<serde_json::Value, String> {
    Ok(match value {
        Value::Node(node) => serde_json::Value::Object(
            node.iter()
                .map(|(key, value)| Ok((key.clone(), to_json(value)?)))
                .collect::<Result<_, String>>()?,
        ),
        Value::List(values) => serde_json::Value::Array(
            values.iter().map(to_json).collect::<Result<_, String>>()?,
        ),
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::Number(n) => serde_json::Value::Number(
            n.as_str()
                .parse()
                .map_err(|e: serde_json::Error| format!("number {n}: {e}"))?,
        ),
        Value::Null => serde_json::Value::Null,
    })
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Json => write!(f, "json"),
            FileFormat::Yaml => write!(f, "yaml"),
        }
    }
}
