//! Conversion between typed Rust values and tree values.
//!
//! [`to_value`] runs any `Serialize` type through a serde `Serializer` that
//! builds a [`Value`]; [`from_value`] and [`from_node`] drive a `Deserialize`
//! type from a borrowed tree. Structs and string-keyed maps become nodes,
//! sequences and tuples become lists, integers and floats become exact
//! number text. Enum variants follow serde's externally tagged layout.
//!
//! Keys must be strings without the path separator. A tree [`Value`] passes
//! through unchanged, numbers included: both directions exchange the exact
//! number text under a private newtype name.

use super::number::{self, Number};
use super::path::SEPARATOR;
use super::value::{Node, Value};
use crate::error::{Error, Result};
use serde::de::value::{MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, Expected, IntoDeserializer, Unexpected,
    VariantAccess, Visitor,
};
use serde::ser::{self, Impossible, Serialize};
use std::fmt::Display;

/// Convert a typed value into its tree representation.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

/// Convert a tree value into `T`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value)
}

/// Convert a whole node into `T`.
pub fn from_node<T: DeserializeOwned>(node: &Node) -> Result<T> {
    T::deserialize(node)
}

/// Serializer producing tree values.
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = ListBuilder;
    type SerializeTuple = ListBuilder;
    type SerializeTupleStruct = ListBuilder;
    type SerializeTupleVariant = VariantListBuilder;
    type SerializeMap = NodeBuilder;
    type SerializeStruct = NodeBuilder;
    type SerializeStructVariant = VariantNodeBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Number::from_f32(v).map(Value::Number)
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Number::from_f64(v).map(Value::Number)
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::List(
            v.iter().map(|b| Value::Number((*b).into())).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value> {
        if name == number::TOKEN {
            let text = value.serialize(TextSerializer::NUMBER)?;
            return Number::parse(&text).map(Value::Number);
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        Ok(Value::Node(Node::new().with(node_key(variant)?, to_value(value)?)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ListBuilder> {
        Ok(ListBuilder {
            values: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<ListBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<ListBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantListBuilder> {
        Ok(VariantListBuilder {
            variant,
            values: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<NodeBuilder> {
        Ok(NodeBuilder::default())
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<NodeBuilder> {
        Ok(NodeBuilder {
            json_number: name == number::JSON_TOKEN,
            ..NodeBuilder::default()
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantNodeBuilder> {
        Ok(VariantNodeBuilder {
            variant,
            node: Node::new(),
        })
    }
}

pub struct ListBuilder {
    values: Vec<Value>,
}

impl ser::SerializeSeq for ListBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.values.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::List(self.values))
    }
}

impl ser::SerializeTuple for ListBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for ListBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

pub struct VariantListBuilder {
    variant: &'static str,
    values: Vec<Value>,
}

impl ser::SerializeTupleVariant for VariantListBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.values.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Node(
            Node::new().with(node_key(self.variant)?, Value::List(self.values)),
        ))
    }
}

#[derive(Default)]
pub struct NodeBuilder {
    node: Node,
    pending_key: Option<String>,
    /// A `serde_json::Number` handing over its text as a one-field struct.
    json_number: bool,
}

impl ser::SerializeMap for NodeBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        let key = key.serialize(TextSerializer::KEY)?;
        node_key(&key)?;
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::Codec("map value serialized before its key".to_string()))?;
        self.node.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Node(self.node))
    }
}

impl ser::SerializeStruct for NodeBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.node.insert(node_key(key)?, to_value(value)?);
        Ok(())
    }

    fn end(mut self) -> Result<Value> {
        if !self.json_number {
            return Ok(Value::Node(self.node));
        }
        match self.node.remove_child(number::JSON_TOKEN) {
            Some(Value::String(text)) => Number::parse(&text).map(Value::Number),
            _ => Err(Error::Codec("malformed serde_json number".to_string())),
        }
    }
}

pub struct VariantNodeBuilder {
    variant: &'static str,
    node: Node,
}

impl ser::SerializeStructVariant for VariantNodeBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.node.insert(node_key(key)?, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Node(Node::new().with(node_key(self.variant)?, self.node)))
    }
}

/// Keys end up as path segments and must not contain the separator.
fn node_key(key: &str) -> Result<&str> {
    if key.contains(SEPARATOR) {
        Err(Error::path_invalid(key, "key contains the separator"))
    } else {
        Ok(key)
    }
}

/// Serializer that only lets strings (and things that serialize as one)
/// through. Used for map keys and for the exact text of numbers.
#[derive(Clone, Copy)]
struct TextSerializer {
    human_readable: bool,
}

impl TextSerializer {
    const KEY: Self = Self {
        human_readable: true,
    };
    const NUMBER: Self = Self {
        human_readable: false,
    };
}

fn key_not_string(key: impl Display, kind: &str) -> Error {
    Error::KeyIsNotString {
        key: key.to_string(),
        kind: kind.to_string(),
    }
}

impl ser::Serializer for TextSerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn is_human_readable(&self) -> bool {
        self.human_readable
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_bool(self, v: bool) -> Result<String> {
        Err(key_not_string(v, "bool"))
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Err(key_not_string(v, "i8"))
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Err(key_not_string(v, "i16"))
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Err(key_not_string(v, "i32"))
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Err(key_not_string(v, "i64"))
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Err(key_not_string(v, "u8"))
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Err(key_not_string(v, "u16"))
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Err(key_not_string(v, "u32"))
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Err(key_not_string(v, "u64"))
    }

    fn serialize_f32(self, v: f32) -> Result<String> {
        Err(key_not_string(v, "f32"))
    }

    fn serialize_f64(self, v: f64) -> Result<String> {
        Err(key_not_string(v, "f64"))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<String> {
        Err(key_not_string(format!("{v:?}"), "bytes"))
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_not_string("None", "option"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String> {
        Err(key_not_string("Some(..)", "option"))
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_not_string("()", "unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String> {
        Err(key_not_string(name, "unit struct"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(key_not_string(format!("{name}::{variant}"), "enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_not_string("[..]", "sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_not_string("(..)", "tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_not_string(name, "tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_not_string(format!("{name}::{variant}"), "enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_not_string("{..}", "map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_not_string(name, "struct"))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_not_string(format!("{name}::{variant}"), "enum variant"))
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Node(_) => Unexpected::Map,
        Value::List(_) => Unexpected::Seq,
        Value::Bool(v) => Unexpected::Bool(*v),
        Value::String(v) => Unexpected::Str(v),
        Value::Number(_) => Unexpected::Other("number"),
        Value::Null => Unexpected::Unit,
    }
}

fn invalid(value: &Value, expected: &dyn Expected) -> Error {
    de::Error::invalid_type(unexpected(value), expected)
}

fn visit_node<'de, V: Visitor<'de>>(node: &'de Node, visitor: V) -> Result<V::Value> {
    let mut map =
        MapDeserializer::<_, Error>::new(node.iter().map(|(key, value)| (key.as_str(), value)));
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

fn visit_list<'de, V: Visitor<'de>>(values: &'de [Value], visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer::<_, Error>::new(values.iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_number<'de, V: Visitor<'de>>(number: &Number, visitor: V) -> Result<V::Value> {
    if number.is_integer() {
        if let Ok(v) = number.as_i64() {
            return visitor.visit_i64(v);
        }
        if let Ok(v) = number.as_u64() {
            return visitor.visit_u64(v);
        }
        if let Ok(v) = number.as_i128() {
            return visitor.visit_i128(v);
        }
        if let Ok(v) = number.as_u128() {
            return visitor.visit_u128(v);
        }
    }
    visitor.visit_f64(number.as_f64()?)
}

impl<'de> IntoDeserializer<'de, Error> for &'de Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $visit:ident($as:ident)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                match self {
                    Value::Number(number) => visitor.$visit(number.$as()?),
                    other => Err(invalid(other, &visitor)),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &'de Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Node(node) => visit_node(node, visitor),
            Value::List(values) => visit_list(values, visitor),
            Value::Bool(v) => visitor.visit_bool(*v),
            Value::String(v) => visitor.visit_borrowed_str(v),
            Value::Number(number) => visit_number(number, visitor),
            Value::Null => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Bool(v) => visitor.visit_bool(*v),
            other => Err(invalid(other, &visitor)),
        }
    }

    deserialize_number! {
        deserialize_i8 => visit_i64(as_i64),
        deserialize_i16 => visit_i64(as_i64),
        deserialize_i32 => visit_i64(as_i64),
        deserialize_i64 => visit_i64(as_i64),
        deserialize_i128 => visit_i128(as_i128),
        deserialize_u8 => visit_u64(as_u64),
        deserialize_u16 => visit_u64(as_u64),
        deserialize_u32 => visit_u64(as_u64),
        deserialize_u64 => visit_u64(as_u64),
        deserialize_u128 => visit_u128(as_u128),
        deserialize_f32 => visit_f64(as_f64),
        deserialize_f64 => visit_f64(as_f64),
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::String(v) => visitor.visit_borrowed_str(v),
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_unit(),
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::Number(n) if name == number::TOKEN => {
                let mut map =
                    MapDeserializer::<_, Error>::new(std::iter::once((number::TOKEN, n.as_str())));
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::List(values) => visit_list(values, visitor),
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Node(node) => visit_node(node, visitor),
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::Node(node) => visit_node(node, visitor),
            Value::List(values) => visit_list(values, visitor),
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::String(variant) => {
                let variant: StrDeserializer<'de, Error> = variant.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Node(node) if node.len() == 1 => match node.iter().next() {
                Some((variant, value)) => visitor.visit_enum(VariantRef { variant, value }),
                None => Err(invalid(self, &visitor)),
            },
            other => Err(invalid(other, &visitor)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

impl<'de> de::Deserializer<'de> for &'de Node {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visit_node(self, visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}

/// An enum written as a single-key node: `{variant: payload}`.
struct VariantRef<'de> {
    variant: &'de str,
    value: &'de Value,
}

impl<'de> EnumAccess<'de> for VariantRef<'de> {
    type Error = Error;
    type Variant = &'de Value;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, &'de Value)> {
        let variant: StrDeserializer<'de, Error> = self.variant.into_deserializer();
        Ok((seed.deserialize(variant)?, self.value))
    }
}

impl<'de> VariantAccess<'de> for &'de Value {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self {
            Value::Null => Ok(()),
            other => Err(invalid(other, &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sub {
        some_string: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Everything {
        some_string: String,
        some_int: i8,
        some_bool: bool,
        #[serde(rename = "somethingRenamed")]
        some_float: f64,
        sub: Sub,
        boxed: Option<Box<Sub>>,
        map: BTreeMap<String, i32>,
        list: Vec<bool>,
        array: [bool; 5],
        nothing: Option<Sub>,
    }

    fn everything() -> Everything {
        Everything {
            some_string: "test".into(),
            some_int: -5,
            some_bool: true,
            some_float: 123.456,
            sub: Sub {
                some_string: "bla".into(),
            },
            boxed: Some(Box::new(Sub {
                some_string: "foo".into(),
            })),
            map: [("a".to_string(), -1), ("b".to_string(), 0), ("c".to_string(), 1)]
                .into_iter()
                .collect(),
            list: vec![true, false, true],
            array: [true, false, true, false, false],
            nothing: None,
        }
    }

    #[test]
    fn test_struct_to_tree_layout() {
        let value = to_value(&everything()).unwrap();
        let node = value.as_node().unwrap();
        assert_eq!(node.child("some_int"), Some(&Value::Number(Number::from(-5i8))));
        assert_eq!(
            node.child("somethingRenamed"),
            Some(&Value::Number(Number::parse("123.456").unwrap()))
        );
        assert_eq!(node.child("nothing"), Some(&Value::Null));
        assert_eq!(
            node.child("array").map(|v| v.kind()),
            Some("list")
        );
        assert!(node.child("boxed").unwrap().is_node());
        node.check().unwrap();
    }

    #[test]
    fn test_struct_roundtrip() {
        let original = everything();
        let value = to_value(&original).unwrap();
        let back: Everything = from_value(&value).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_non_string_map_keys_rejected() {
        let map: HashMap<i32, bool> = [(1, true)].into_iter().collect();
        assert!(matches!(
            to_value(&map),
            Err(Error::KeyIsNotString { ref kind, .. }) if kind == "i32"
        ));
    }

    #[test]
    fn test_enums() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum Mode {
            Off,
            Level(u8),
            Range { low: u8, high: u8 },
        }

        assert_eq!(to_value(&Mode::Off).unwrap(), Value::from("Off"));
        for mode in [Mode::Off, Mode::Level(3), Mode::Range { low: 1, high: 9 }] {
            let value = to_value(&mode).unwrap();
            assert_eq!(from_value::<Mode>(&value).unwrap(), mode);
        }
    }

    #[test]
    fn test_type_mismatch_is_unexpected_type() {
        let err = from_value::<u16>(&Value::from("nope")).unwrap_err();
        assert!(matches!(err, Error::UnexpectedType { .. }));

        let err = from_value::<u8>(&Value::Number(Number::from(300))).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_untyped_targets() {
        let value = Value::from(
            Node::new()
                .with("n", Number::from(7))
                .with("s", "x")
                .with("l", vec![Value::Bool(true)]),
        );
        let json: serde_json::Value = from_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"n": 7, "s": "x", "l": [true]}));

        let node: Node = from_value(&value).unwrap();
        assert_eq!(Value::from(node), value);
    }

    #[test]
    fn test_from_node() {
        let node = Node::new().with("some_string", "root");
        let sub: Sub = from_node(&node).unwrap();
        assert_eq!(sub.some_string, "root");
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(to_value(&f64::NAN).is_err());
    }

    #[test]
    fn test_tree_values_pass_through_exactly() {
        let num = |text: &str| Value::Number(Number::parse(text).unwrap());
        let value = Value::from(
            Node::new()
                .with("one", num("1.0"))
                .with("long", num("0.12345678901234567890123"))
                .with("huge", num("1e400"))
                .with("list", vec![num("2.50"), num("-0")]),
        );

        assert_eq!(to_value(&value).unwrap(), value);
        assert_eq!(from_value::<Value>(&value).unwrap(), value);
        assert_eq!(from_value::<Value>(&num("2.50")).unwrap(), num("2.50"));

        let node = value.as_node().unwrap();
        assert_eq!(&from_node::<Node>(node).unwrap(), node);
    }

    #[test]
    fn test_json_values_keep_number_text() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"ratio": 2.50, "big": 123456789012345678901234567890}"#)
                .unwrap();
        let value = to_value(&json).unwrap();
        let node = value.as_node().unwrap();
        assert_eq!(
            node.child("ratio"),
            Some(&Value::Number(Number::parse("2.50").unwrap()))
        );
        assert_eq!(
            node.child("big"),
            Some(&Value::Number(
                Number::parse("123456789012345678901234567890").unwrap()
            ))
        );
    }

    #[test]
    fn test_keys_with_separator_rejected() {
        let map: BTreeMap<&str, i32> = [("a.b", 1)].into_iter().collect();
        assert!(matches!(to_value(&map), Err(Error::PathInvalid { .. })));

        #[derive(Serialize)]
        struct Dotted {
            #[serde(rename = "x.y")]
            field: bool,
        }
        assert!(matches!(
            to_value(&Dotted { field: true }),
            Err(Error::PathInvalid { .. })
        ));
    }
}
