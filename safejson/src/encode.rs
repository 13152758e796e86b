//! Strict [`Node`] to `serde_json::Value` conversion with a fallback hook.

use serde_json::{Map, Number, Value};

use crate::{
    error::EncodeError,
    node::{Key, Node},
};

// consecutive fallbacks without reaching a native value
pub(crate) const MAX_FALLBACK_CHAIN: usize = 32;

/// Decides how values with no native JSON form are rendered.
///
/// `fallback` is only consulted for sets, timestamps, durations, bytes,
/// records and opaque values. The returned node is encoded in turn; `None`
/// means the value is not serializable.
pub trait Encoder: Send + Sync {
    fn fallback(&self, node: &Node) -> Option<Node>;
}

/// Plain JSON only. The default for saving.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl Encoder for Strict {
    fn fallback(&self, _node: &Node) -> Option<Node> {
        None
    }
}

/// Timestamps as RFC 3339 strings, sets as lists and records as their mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncoder;

impl Encoder for StandardEncoder {
    fn fallback(&self, node: &Node) -> Option<Node> {
        match node {
            Node::DateTime(dt) => Some(Node::String(dt.to_rfc3339())),
            Node::Set(items) => Some(Node::Array(items.clone())),
            Node::Record(record) => Some(record.to_record()),
            _ => None,
        }
    }
}

/// [`StandardEncoder`] that never gives up: durations become their total
/// seconds and anything else a `{"__type", "repr"}` description.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedEncoder;

impl Encoder for ExtendedEncoder {
    fn fallback(&self, node: &Node) -> Option<Node> {
        if let Node::Duration(d) = node {
            return Some(Node::object([
                ("__type", Node::from("duration")),
                ("total_seconds", Node::Float(d.as_secs_f64())),
            ]));
        }

        StandardEncoder.fallback(node).or_else(|| {
            Some(Node::object([
                ("__type", Node::from(node.type_name())),
                ("repr", Node::String(node.to_string())),
            ]))
        })
    }
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn fallback(&self, node: &Node) -> Option<Node> {
        (**self).fallback(node)
    }
}

pub fn to_value(node: &Node, encoder: &dyn Encoder) -> Result<Value, EncodeError> {
    encode(node, encoder, 0)
}

fn encode(node: &Node, encoder: &dyn Encoder, chain: usize) -> Result<Value, EncodeError> {
    match node {
        Node::Null => Ok(Value::Null),
        Node::Bool(b) => Ok(Value::Bool(*b)),
        Node::Int(i) => Ok(Value::from(*i)),
        Node::UInt(u) => Ok(Value::from(*u)),
        Node::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or(EncodeError::NonFiniteFloat(*f)),
        Node::String(s) => Ok(Value::String(s.clone())),
        Node::Array(items) => items
            .iter()
            .map(|item| encode(item, encoder, 0))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let name = key_to_string(key)?;
                // Int(1) and "1" would both land on "1"
                if map.contains_key(&name) {
                    return Err(EncodeError::InvalidKey(name));
                }
                map.insert(name, encode(value, encoder, 0)?);
            }
            Ok(Value::Object(map))
        }
        Node::Set(_)
        | Node::DateTime(_)
        | Node::Duration(_)
        | Node::Bytes(_)
        | Node::Record(_)
        | Node::Opaque { .. } => {
            if chain >= MAX_FALLBACK_CHAIN {
                return Err(EncodeError::FallbackLoop(node.type_name().to_owned()));
            }
            match encoder.fallback(node) {
                Some(substitute) => encode(&substitute, encoder, chain + 1),
                None => Err(EncodeError::Unsupported(node.type_name().to_owned())),
            }
        }
    }
}

/// Object keys must end up as strings; scalars are stringified the way
/// `serde_json` does for its own map keys.
pub fn key_to_string(key: &Key) -> Result<String, EncodeError> {
    match key {
        Key::String(s) => Ok(s.clone()),
        Key::Int(i) => Ok(i.to_string()),
        Key::UInt(u) => Ok(u.to_string()),
        Key::Bool(b) => Ok(b.to_string()),
        Key::Null => Ok("null".to_owned()),
        Key::Float(f) if f.is_finite() => Ok(f.to_string()),
        Key::Float(_) | Key::Composite(_) => Err(EncodeError::InvalidKey(key.to_string())),
    }
}
