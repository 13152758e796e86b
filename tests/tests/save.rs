use std::fs;

use safejson::{
    Key, Node, SaveError, SaveOptions, Saver, StandardEncoder, load, save,
};
use serde_json::json;
use tests::{Config, LogBuffer, State, stray_temp_files};
use tracing::Dispatch;

fn capture_logs() -> (Dispatch, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (Dispatch::new(subscriber), buffer)
}

fn bad_document() -> Node {
    Node::object([(
        "a",
        Node::array([
            Node::from(1),
            Node::Set(vec![]),
            Node::object([("b", f64::NAN)]),
        ]),
    )])
}

#[test]
fn saved_document_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("core.config.json");
    let doc = json!({"name": "home", "rooms": [{"id": 1, "lights": true}], "owner": null});

    save::json(&path, &Node::from(doc.clone()), &SaveOptions::new()).unwrap();

    assert_eq!(load::document(&path, None).unwrap(), doc);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "{\n    \"name\": \"home\",\n    \"rooms\": [\n        {\n            \"id\": 1,\n            \"lights\": true\n        }\n    ],\n    \"owner\": null\n}"
    );
}

#[test]
fn saving_twice_is_byte_identical_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let doc = Node::from(json!({"entities": ["light.kitchen", "switch.fan"]}));

    save::json(&path, &doc, &SaveOptions::new()).unwrap();
    let first = fs::read(&path).unwrap();
    save::json(&path, &doc, &SaveOptions::new()).unwrap();
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert!(stray_temp_files(dir.path()).is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[cfg(unix)]
#[test]
fn private_controls_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("auth.json");
    let public = dir.path().join("public.json");
    let doc = Node::from(json!({"token": "abc"}));

    save::json(&secret, &doc, &SaveOptions::new().private(true)).unwrap();
    save::json(&public, &doc, &SaveOptions::new()).unwrap();

    let mode = |p: &std::path::Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&secret), 0o600);
    assert_eq!(mode(&public), 0o644);
}

#[test]
fn options_are_public_unless_asked() {
    assert!(!SaveOptions::new().is_private());
    assert!(SaveOptions::new().private(true).is_private());
    assert!(!SaveOptions::new().private(true).private(false).is_private());
}

#[test]
fn colliding_keys_are_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    let doc = Node::Object(vec![
        (Key::Int(1), Node::from("first")),
        (Key::from("1"), Node::from("second")),
    ]);

    let err = save::json(&path, &doc, &SaveOptions::new()).unwrap_err();

    assert!(matches!(err, SaveError::Serialization { .. }), "{err:?}");
    assert!(err.to_string().ends_with("Bad data at $<key: 1>=\"1\"(string)"), "{err}");
    assert!(!path.exists());
}

#[test]
fn serialization_failure_leaves_existing_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    save::json(&path, &Node::from(json!({"v": 1})), &SaveOptions::new()).unwrap();
    let before = fs::read(&path).unwrap();

    let err = save::json(&path, &bad_document(), &SaveOptions::new()).unwrap_err();

    let SaveError::Serialization { message, .. } = &err else {
        panic!("expected serialization error, got {err:?}");
    };
    assert!(message.starts_with("Failed to serialize to JSON: "));
    assert!(message.ends_with("Bad data at $.a[1]={}(set), $.a[2].b=NaN(float)"));
    assert!(!err.is_retryable());
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(stray_temp_files(dir.path()).is_empty());
}

#[test]
fn serialization_failure_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.json");

    assert!(save::json(&path, &bad_document(), &SaveOptions::new()).is_err());

    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn failed_replace_keeps_target_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    // a non-empty directory cannot be replaced by a file
    let target = dir.path().join("occupied");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep.txt"), "still here").unwrap();

    let err = save::json(&target, &Node::from(json!({"x": 1})), &SaveOptions::new()).unwrap_err();

    assert!(matches!(err, SaveError::Write { .. }), "{err:?}");
    assert!(err.is_retryable());
    assert_eq!(err.path(), target.as_path());
    assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "still here");
    assert!(stray_temp_files(dir.path()).is_empty());
}

#[test]
fn missing_parent_is_a_write_error_unless_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("doc.json");
    let doc = Node::from(json!([1, 2, 3]));

    let err = save::json(&path, &doc, &SaveOptions::new()).unwrap_err();
    assert!(matches!(err, SaveError::Write { .. }));

    save::json(&path, &doc, &SaveOptions::new().create_dirs(true)).unwrap();
    assert_eq!(load::document(&path, None).unwrap(), json!([1, 2, 3]));
}

#[test]
fn typed_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = Config {
        name: "main".into(),
        port: 8123,
        tags: vec!["a".into(), "b".into()],
    };

    save::serialized(&path, &config, &SaveOptions::new().durable(false)).unwrap();

    assert_eq!(load::json_or_default::<_, Config>(&path).unwrap(), config);
}

#[test]
fn typed_value_with_bad_field_is_diagnosed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let state = State::new("sensor.temp", "unknown").with_attribute("temperature", f64::NAN);

    let err = save::serialized(&path, &state, &SaveOptions::new()).unwrap_err();

    assert!(
        err.to_string()
            .ends_with("Bad data at $.attributes.temperature=NaN(float)"),
        "{err}"
    );
}

#[test]
fn records_need_an_encoder_that_knows_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("states.json");
    let doc = Node::array([Node::record(State::new("light.kitchen", "on"))]);

    let err = save::json(&path, &doc, &SaveOptions::new()).unwrap_err();
    assert!(err.to_string().contains("value of type State is not json serializable"));

    save::json(&path, &doc, &SaveOptions::new().encoder(StandardEncoder)).unwrap();
    assert_eq!(
        load::document(&path, None).unwrap(),
        json!([{"entity_id": "light.kitchen", "state": "on", "attributes": {}}])
    );
}

#[test]
fn saver_logs_to_its_own_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logged.json");
    let (dispatch, logs) = capture_logs();
    let saver = Saver::with_dispatch(dispatch);

    saver
        .json(&path, &Node::from(json!({"ok": true})), &SaveOptions::new())
        .unwrap();
    assert!(saver.json(&path, &bad_document(), &SaveOptions::new()).is_err());

    let logs = logs.contents();
    assert!(logs.contains("saved json file"), "{logs}");
    assert!(logs.contains("Failed to serialize to JSON"), "{logs}");
}
