//! Locate the values that keep a [`Node`] from being encoded.
//!
//! This is slow. Only use it to build error messages.

use std::{
    borrow::Cow,
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    encode::{self, Encoder, MAX_FALLBACK_CHAIN, Strict},
    node::{Key, Node, ToRecord},
};

/// Offending values keyed by their path, in breadth-first order.
pub type Report = IndexMap<String, Node>;

pub fn find_unserializable(value: &Node) -> Report {
    Diagnoser::new(&Strict).find_unserializable(value)
}

/// Comma separated `<path>=<value>(<type>)`.
pub fn format_report(report: &Report) -> String {
    report
        .iter()
        .map(|(path, value)| format!("{path}={value}({})", value.type_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct Diagnoser<'e> {
    encoder: &'e dyn Encoder,
}

enum Shape<'a> {
    Record(Arc<dyn ToRecord>),
    Object(Vec<(Cow<'a, Key>, Cow<'a, Node>)>),
    Array(Vec<Cow<'a, Node>>),
    Leaf(Node),
}

impl<'a> From<Cow<'a, Node>> for Shape<'a> {
    fn from(node: Cow<'a, Node>) -> Self {
        match node {
            Cow::Borrowed(Node::Record(record)) => Shape::Record(Arc::clone(record)),
            Cow::Owned(Node::Record(record)) => Shape::Record(record),
            Cow::Borrowed(Node::Object(entries)) => Shape::Object(
                entries
                    .iter()
                    .map(|(k, v)| (Cow::Borrowed(k), Cow::Borrowed(v)))
                    .collect(),
            ),
            Cow::Owned(Node::Object(entries)) => Shape::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (Cow::Owned(k), Cow::Owned(v)))
                    .collect(),
            ),
            Cow::Borrowed(Node::Array(items)) => {
                Shape::Array(items.iter().map(Cow::Borrowed).collect())
            }
            Cow::Owned(Node::Array(items)) => {
                Shape::Array(items.into_iter().map(Cow::Owned).collect())
            }
            leaf => Shape::Leaf(leaf.into_owned()),
        }
    }
}

impl<'e> Diagnoser<'e> {
    /// `encoder` should be the one whose failure is being explained.
    pub fn new(encoder: &'e dyn Encoder) -> Self {
        Self { encoder }
    }

    pub fn find_unserializable(&self, value: &Node) -> Report {
        // the count is how many records in a row were expanded to reach a node
        let mut to_process = VecDeque::from([(Cow::Borrowed(value), String::from("$"), 0)]);
        let mut invalid = Report::new();

        while let Some((node, path, expanded)) = to_process.pop_front() {
            // a subtree that encodes on its own is known good
            if encode::to_value(&node, self.encoder).is_ok() {
                continue;
            }

            match Shape::from(node) {
                Shape::Record(record) if expanded >= MAX_FALLBACK_CHAIN => {
                    invalid.insert(path, Node::Record(record));
                }
                Shape::Record(record) => {
                    let path = format!("{path}({})", record.label());
                    to_process.push_back((Cow::Owned(record.to_record()), path, expanded + 1));
                }
                Shape::Object(entries) => {
                    let mut seen = HashSet::with_capacity(entries.len());
                    for (key, value) in entries {
                        // a key that stringifies like an earlier one is as bad as an unencodable one
                        let unique = encode::key_to_string(&key).is_ok_and(|name| seen.insert(name));
                        if unique {
                            to_process.push_back((value, format!("{path}.{key}"), 0));
                        } else {
                            invalid.insert(format!("{path}<key: {key}>"), key.to_node());
                        }
                    }
                }
                Shape::Array(items) => {
                    for (idx, item) in items.into_iter().enumerate() {
                        to_process.push_back((item, format!("{path}[{idx}]"), 0));
                    }
                }
                Shape::Leaf(leaf) => {
                    invalid.insert(path, leaf);
                }
            }
        }

        invalid
    }
}
