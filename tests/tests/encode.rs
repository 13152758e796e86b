use std::{collections::BTreeMap, time::Duration};

use safejson::{
    EncodeError, Encoder, ExtendedEncoder, Key, Node, StandardEncoder, Strict,
    encode::to_value, save, to_node,
};
use serde::Serialize;
use serde_json::json;
use tests::State;

#[test]
fn strict_rejects_non_json_values() {
    assert!(matches!(
        to_value(&Node::set([1, 2]), &Strict),
        Err(EncodeError::Unsupported(ty)) if ty == "set"
    ));
    assert!(matches!(
        to_value(&Node::Float(f64::NAN), &Strict),
        Err(EncodeError::NonFiniteFloat(_))
    ));
    assert!(matches!(
        to_value(&Node::Object(vec![(Key::Float(f64::INFINITY), Node::Null)]), &Strict),
        Err(EncodeError::InvalidKey(_))
    ));
}

#[test]
fn keys_that_stringify_alike_are_rejected() {
    let value = Node::Object(vec![
        (Key::Int(1), Node::from("first")),
        (Key::from("1"), Node::from("second")),
    ]);

    assert!(matches!(
        to_value(&value, &Strict),
        Err(EncodeError::InvalidKey(key)) if key == "1"
    ));
}

#[test]
fn scalar_keys_are_stringified() {
    let value = Node::Object(vec![
        (Key::Int(-1), Node::from(1)),
        (Key::UInt(u64::MAX), Node::from(2)),
        (Key::Bool(true), Node::from(3)),
        (Key::Null, Node::from(4)),
        (Key::Float(1.5), Node::from(5)),
    ]);

    let encoded = to_value(&value, &Strict).unwrap();

    assert_eq!(
        encoded,
        json!({"-1": 1, "18446744073709551615": 2, "true": 3, "null": 4, "1.5": 5})
    );
}

#[test]
fn standard_encoder_handles_dates_sets_and_records() {
    let stamp = chrono::DateTime::parse_from_rfc3339("2021-01-02T03:04:05+00:00").unwrap();
    let value = Node::object([
        ("when", Node::from(stamp)),
        ("ids", Node::set([3, 1])),
        ("state", Node::record(State::new("light.kitchen", "on"))),
    ]);

    let encoded = to_value(&value, &StandardEncoder).unwrap();

    assert_eq!(
        encoded,
        json!({
            "when": "2021-01-02T03:04:05+00:00",
            "ids": [3, 1],
            "state": {"entity_id": "light.kitchen", "state": "on", "attributes": {}}
        })
    );
    assert!(to_value(&Node::Duration(Duration::from_secs(1)), &StandardEncoder).is_err());
}

#[test]
fn extended_encoder_describes_everything_else() {
    let value = Node::object([
        ("elapsed", Node::from(Duration::from_millis(1500))),
        ("raw", Node::Bytes(b"ab".to_vec())),
        ("handle", Node::opaque("Socket", "<socket fd=3>")),
    ]);

    let encoded = to_value(&value, &ExtendedEncoder).unwrap();

    assert_eq!(
        encoded,
        json!({
            "elapsed": {"__type": "duration", "total_seconds": 1.5},
            "raw": {"__type": "bytes", "repr": "b\"ab\""},
            "handle": {"__type": "Socket", "repr": "<socket fd=3>"}
        })
    );
}

struct Loops;

impl Encoder for Loops {
    fn fallback(&self, node: &Node) -> Option<Node> {
        Some(node.clone())
    }
}

#[test]
fn self_referential_fallback_is_an_error() {
    assert!(matches!(
        to_value(&Node::Bytes(vec![1]), &Loops),
        Err(EncodeError::FallbackLoop(_))
    ));
}

#[test]
fn output_uses_four_space_indent() {
    let value = Node::object([("a", Node::array([1])), ("b", Node::from("x"))]);

    let text = save::to_string(&value, &Strict).unwrap();

    assert_eq!(text, "{\n    \"a\": [\n        1\n    ],\n    \"b\": \"x\"\n}");
}

#[test]
fn key_order_is_preserved() {
    let value = Node::object([("zeta", 1), ("alpha", 2), ("mid", 3)]);

    let text = save::to_string(&value, &Strict).unwrap();

    let zeta = text.find("zeta").unwrap();
    let alpha = text.find("alpha").unwrap();
    let mid = text.find("mid").unwrap();
    assert!(zeta < alpha && alpha < mid);
}

#[derive(Serialize)]
enum Command {
    Stop,
    Move { x: i32 },
    Say(String),
}

#[test]
fn serde_values_are_captured_without_loss() {
    let mut weights = BTreeMap::new();
    weights.insert((1u8, 2u8), f64::NAN);

    let node = to_node(&weights).unwrap();
    let Node::Object(entries) = &node else {
        panic!("expected an object, got {node:?}");
    };
    assert_eq!(entries[0].0, Key::Composite(Box::new(Node::array([1, 2]))));
    assert!(matches!(entries[0].1, Node::Float(f) if f.is_nan()));

    let commands = to_node(&vec![
        Command::Stop,
        Command::Move { x: 4 },
        Command::Say("hi".into()),
    ])
    .unwrap();
    assert_eq!(
        to_value(&commands, &Strict).unwrap(),
        json!(["Stop", {"Move": {"x": 4}}, {"Say": "hi"}])
    );
}
