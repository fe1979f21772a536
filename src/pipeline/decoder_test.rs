use serde_json::json;

use super::decoder::decode;
use super::decoder::decode_bytes;
use super::decoder::Record;

fn state_fields(record: Record) -> serde_json::Map<String, serde_json::Value> {
    match record {
        Record::State(fields) => fields,
        other => panic!("expected state record, got {:?}", other),
    }
}

#[test]
fn empty_and_blank_lines_are_noise() {
    assert_eq!(decode(""), Record::Noise);
    assert_eq!(decode("   "), Record::Noise);
    assert_eq!(decode("\t\r"), Record::Noise);
}

#[test]
fn malformed_json_is_noise() {
    assert_eq!(decode("not json"), Record::Noise);
    assert_eq!(decode("{\"x\":"), Record::Noise);
    assert_eq!(decode("🧠 Scanning for MUSE LSL stream..."), Record::Noise);
}

#[test]
fn non_object_json_is_noise() {
    assert_eq!(decode("42"), Record::Noise);
    assert_eq!(decode("[1,2]"), Record::Noise);
    assert_eq!(decode("\"text\""), Record::Noise);
    assert_eq!(decode("null"), Record::Noise);
}

#[test]
fn object_is_state_record_with_fields_verbatim() {
    let fields = state_fields(decode(r#"{"x":1}"#));
    assert_eq!(fields.get("x"), Some(&json!(1)));

    let fields = state_fields(decode(
        r#"  {"ts":"12:00:01","state":"FLOW","powers":{"alpha":0.42}}  "#,
    ));
    assert_eq!(fields.len(), 3);
    assert_eq!(fields["powers"], json!({"alpha": 0.42}));
}

#[test]
fn error_string_is_error_record() {
    assert_eq!(decode(r#"{"error":"boom"}"#), Record::Error("boom".into()));
    assert_eq!(
        decode(r#"{"error":"No MUSE stream found","hint":1}"#),
        Record::Error("No MUSE stream found".into())
    );
}

#[test]
fn falsy_error_indicator_keeps_state_record() {
    for line in [
        r#"{"error":"","x":1}"#,
        r#"{"error":null,"x":1}"#,
        r#"{"error":false,"x":1}"#,
        r#"{"error":0,"x":1}"#,
    ] {
        let fields = state_fields(decode(line));
        assert_eq!(fields["x"], json!(1), "line {line}");
        assert!(fields.contains_key("error"));
    }
}

#[test]
fn non_string_truthy_error_is_rendered_as_json() {
    assert_eq!(decode(r#"{"error":true}"#), Record::Error("true".into()));
    assert_eq!(decode(r#"{"error":503}"#), Record::Error("503".into()));
    assert_eq!(
        decode(r#"{"error":{"code":7}}"#),
        Record::Error(r#"{"code":7}"#.into())
    );
}

#[test]
fn invalid_utf8_is_replaced_before_parsing() {
    let mut line = br#"{"detail":""#.to_vec();
    line.push(0xff);
    line.extend_from_slice(br#""}"#);

    let fields = state_fields(decode_bytes(&line));
    assert_eq!(fields["detail"], json!("\u{fffd}"));
}

#[test]
fn record_kind_labels() {
    assert_eq!(decode("{}").kind(), "state");
    assert_eq!(decode(r#"{"error":"x"}"#).kind(), "error");
    assert!(decode("").is_noise());
}
