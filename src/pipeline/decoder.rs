//! Classification of producer output lines.

use serde_json::Map;
use serde_json::Value;

use crate::constants::ERROR_FIELD;

/// One decoded producer line.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Domain payload, passed through verbatim
    State(Map<String, Value>),
    /// The producer reported a failure
    Error(String),
    /// Blank or undecodable line
    Noise,
}

impl Record {
    pub fn is_noise(&self) -> bool {
        matches!(self, Record::Noise)
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::State(_) => "state",
            Record::Error(_) => "error",
            Record::Noise => "noise",
        }
    }
}

/// Decodes one line of producer output.
///
/// Blank lines, malformed JSON and JSON values that are not objects are all [`Record::Noise`].
/// An object whose `error` field is set to anything truthy becomes [`Record::Error`];
/// every other object is a [`Record::State`] carrying all of its fields.
pub fn decode(line: &str) -> Record {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Record::Noise;
    }

    let fields = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => fields,
        _ => return Record::Noise,
    };

    match fields.get(ERROR_FIELD).and_then(error_message) {
        Some(message) => Record::Error(message),
        None => Record::State(fields),
    }
}

/// Decodes a raw line, replacing invalid UTF-8 sequences.
pub fn decode_bytes(line: &[u8]) -> Record {
    decode(&String::from_utf8_lossy(line))
}

/// `null`, `false`, `0` and `""` mean "no error".
fn error_message(indicator: &Value) -> Option<String> {
    match indicator {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
