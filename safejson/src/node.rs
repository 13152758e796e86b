//! In-memory form of a document that is about to be saved.
//!
//! A [`Node`] can describe everything a caller may hand to the saver, including
//! values that have no JSON representation (sets, timestamps, non-finite floats,
//! records). Whether a node is actually encodable is decided later by an
//! [`Encoder`](crate::Encoder).

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, Utc};

pub mod ser;

pub use ser::to_node;

/// A value that can render itself as a mapping.
///
/// The diagnoser and the standard encoders substitute [`ToRecord::to_record`]
/// for the value. `#[derive(Record)]` implements this for serde types.
pub trait ToRecord: Send + Sync {
    fn type_name(&self) -> &str;

    /// Identifying field shown next to the type name, e.g. an entity id.
    fn identity(&self) -> Option<String> {
        None
    }

    fn to_record(&self) -> Node;

    fn label(&self) -> String {
        match self.identity() {
            Some(identity) => format!("{}: {identity}", self.type_name()),
            None => self.type_name().to_owned(),
        }
    }
}

impl fmt::Debug for dyn ToRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type_name", &self.type_name())
            .field("identity", &self.identity())
            .finish()
    }
}

// records compare by identity of the shared value
impl PartialEq for dyn ToRecord {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(self, other)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Object(Vec<(Key, Node)>),
    Set(Vec<Node>),
    DateTime(DateTime<FixedOffset>),
    Duration(Duration),
    Bytes(Vec<u8>),
    Record(Arc<dyn ToRecord>),
    /// A foreign value known only by its type name and textual form.
    Opaque { type_name: String, repr: String },
}

/// Mapping key. JSON only allows strings, but callers may build others.
#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Null,
    Composite(Box<Node>),
}

impl Node {
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Node>,
    {
        Node::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Node>,
    {
        Node::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Node>,
    {
        Node::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn record<R>(record: R) -> Self
    where
        R: ToRecord + 'static,
    {
        Node::Record(Arc::new(record))
    }

    pub fn opaque(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Node::Opaque {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::UInt(_) => "uint",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
            Node::Set(_) => "set",
            Node::DateTime(_) => "datetime",
            Node::Duration(_) => "duration",
            Node::Bytes(_) => "bytes",
            Node::Record(record) => record.type_name(),
            Node::Opaque { type_name, .. } => type_name,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Key::String(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl Key {
    /// The key as a value, for reporting.
    pub fn to_node(&self) -> Node {
        match self {
            Key::String(s) => Node::String(s.clone()),
            Key::Int(i) => Node::Int(*i),
            Key::UInt(u) => Node::UInt(*u),
            Key::Float(f) => Node::Float(*f),
            Key::Bool(b) => Node::Bool(*b),
            Key::Null => Node::Null,
            Key::Composite(node) => (**node).clone(),
        }
    }
}

impl From<Node> for Key {
    fn from(node: Node) -> Self {
        match node {
            Node::String(s) => Key::String(s),
            Node::Int(i) => Key::Int(i),
            Node::UInt(u) => Key::UInt(u),
            Node::Float(f) => Key::Float(f),
            Node::Bool(b) => Key::Bool(b),
            Node::Null => Key::Null,
            other => Key::Composite(Box::new(other)),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(v: $ty) -> Self {
                    Node::Int(i64::from(v))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Node {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Node::Int(i),
            Err(_) => Node::UInt(v),
        }
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        Node::Float(f64::from(v))
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_owned())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(v: Vec<T>) -> Self {
        Node::array(v)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map_or(Node::Null, Into::into)
    }
}

impl From<DateTime<FixedOffset>> for Node {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Node::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Node {
    fn from(v: DateTime<Utc>) -> Self {
        Node::DateTime(v.fixed_offset())
    }
}

impl From<Duration> for Node {
    fn from(v: Duration) -> Self {
        Node::Duration(v)
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::array(items),
            Value::Object(map) => Node::object(map),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(b) => write!(f, "{b}"),
            Node::Int(i) => write!(f, "{i}"),
            Node::UInt(u) => write!(f, "{u}"),
            Node::Float(v) => write_float(f, *v),
            Node::String(s) => write!(f, "{s:?}"),
            Node::Array(items) => write_items(f, "[", items, "]"),
            Node::Set(items) => write_items(f, "{", items, "}"),
            Node::Object(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match key {
                        Key::String(s) => write!(f, "{s:?}: {value}")?,
                        other => write!(f, "{other}: {value}")?,
                    }
                }
                f.write_str("}")
            }
            Node::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Node::Duration(d) => write!(f, "{d:?}"),
            Node::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Node::Record(record) => write!(f, "<{}>", record.label()),
            Node::Opaque { repr, .. } => f.write_str(repr),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => f.write_str(s),
            Key::Int(i) => write!(f, "{i}"),
            Key::UInt(u) => write!(f, "{u}"),
            Key::Float(v) => write_float(f, *v),
            Key::Bool(b) => write!(f, "{b}"),
            Key::Null => f.write_str("null"),
            Key::Composite(node) => write!(f, "{node}"),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else {
        write!(f, "{v}")
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[Node], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}
