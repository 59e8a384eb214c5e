//! The tree value union and its mapping node.
//!
//! The serde impls here are used by the file formats: nodes serialize as
//! maps, lists as sequences, and numbers as the closest native number so
//! YAML files hold real numbers instead of quoted text. Deserializing a
//! `Value` asks for numbers as exact text first; the tree codec and
//! serde_json (with `arbitrary_precision`) provide it, other formats hand
//! over native numbers.

use super::number::{self, Number};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// A single element of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Node(Node),
    List(Vec<Value>),
    Bool(bool),
    String(String),
    Number(Number),
    Null,
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Node(_) => "node",
            Value::List(_) => "list",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Null => "null",
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

/// A mapping from key to child value.
///
/// Keys must not contain the path separator; empty keys are legal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    children: BTreeMap<String, Value>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, key: &str) -> Option<&Value> {
        self.children.get(key)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.children.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    /// Insert or replace a child, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.children.insert(key.into(), value.into())
    }

    /// Builder form of [`Node::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove_child(&mut self, key: &str) -> Option<Value> {
        self.children.remove(key)
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.children.iter()
    }

    pub(crate) fn entry(&mut self, key: &str) -> btree_map::Entry<'_, String, Value> {
        self.children.entry(key.to_string())
    }
}

impl IntoIterator for Node {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.into_iter()
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

impl FromIterator<(String, Value)> for Node {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (key, value) in &self.children {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Node(node) => node.serialize(serializer),
            Value::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Number(n) => n.serialize(serializer),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a bool, number, string, list, map or null")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_i128<E>(self, v: i128) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u128<E>(self, v: u128) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .map_err(|_| E::invalid_value(de::Unexpected::Float(v), &self))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element()? {
            values.push(value);
        }
        Ok(Value::List(values))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut node = Node::new();
        while let Some(key) = map.next_key::<String>()? {
            if node.is_empty() && (key == number::TOKEN || key == number::JSON_TOKEN) {
                let text: String = map.next_value()?;
                return Number::parse(&text)
                    .map(Value::Number)
                    .map_err(de::Error::custom);
            }
            let value: Value = map.next_value()?;
            node.insert(key, value);
        }
        Ok(Value::Node(node))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(number::TOKEN, ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Node {
    /// A document root must be a map; an empty document (`null`) reads as an empty node.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Node(node) => Ok(node),
            Value::Null => Ok(Node::new()),
            other => Err(de::Error::invalid_type(
                de::Unexpected::Other(other.kind()),
                &"a map at the document root",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::new()
            .with("name", "box")
            .with("width", Number::from(12))
            .with("ratio", Number::parse("1.5").unwrap())
            .with("tags", vec![Value::from("a"), Value::Bool(true), Value::Null])
            .with("inner", Node::new().with("flag", false))
    }

    #[test]
    fn test_json_roundtrip() {
        let node = sample();
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(
            text,
            r#"{"inner":{"flag":false},"name":"box","ratio":1.5,"tags":["a",true,null],"width":12}"#
        );
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let node = sample();
        let text = serde_yaml::to_string(&node).unwrap();
        let back: Node = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_json_numbers_keep_their_text() {
        let text = r#"{"x": 0.10, "y": 1e2, "z": 123456789012345678901234567890, "w": -0.0}"#;
        let node: Node = serde_json::from_str(text).unwrap();
        let expected = [
            ("x", "0.10"),
            ("y", "1e2"),
            ("z", "123456789012345678901234567890"),
            ("w", "-0.0"),
        ];
        for (key, expected) in expected {
            assert_eq!(
                node.child(key),
                Some(&Value::Number(Number::parse(expected).unwrap())),
                "key {key}"
            );
        }
    }

    #[test]
    fn test_root_must_be_map() {
        assert!(serde_json::from_str::<Node>("[1, 2]").is_err());
        assert_eq!(serde_json::from_str::<Node>("null").unwrap(), Node::new());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(Node::new()).kind(), "node");
        assert_eq!(Value::from(vec![]).kind(), "list");
    }
}
