use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::constants::ENVELOPE_KIND_KEY;
use crate::pipeline::Record;
use crate::Result;

/// Encoded envelope text, shared by every subscriber of one broadcast.
pub type Frame = Arc<str>;

/// The only two message shapes a subscriber ever receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"kind":"state", ...fields}`
    State(Map<String, Value>),
    /// `{"kind":"error","message":...}`
    Error { message: String },
}

impl Envelope {
    /// Wraps a decoded record; `None` for noise.
    pub fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::State(fields) => Some(Envelope::State(fields)),
            Record::Error(message) => Some(Envelope::Error { message }),
            Record::Noise => None,
        }
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Envelope::State(_))
    }

    /// Renders the envelope as one JSON text frame.
    ///
    /// The `kind` discriminator overrides a domain field of the same name.
    pub fn encode(&self) -> Result<Frame> {
        let object = match self {
            Envelope::State(fields) => {
                let mut object = fields.clone();
                object.insert(ENVELOPE_KIND_KEY.into(), Value::from("state"));
                object
            }
            Envelope::Error { message } => {
                let mut object = Map::new();
                object.insert(ENVELOPE_KIND_KEY.into(), Value::from("error"));
                object.insert("message".into(), Value::from(message.as_str()));
                object
            }
        };
        let text = serde_json::to_string(&Value::Object(object))?;
        Ok(Frame::from(text))
    }
}
