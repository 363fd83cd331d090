//! Event Generator Interface
//!
//! The hub asks a generator for the next payload on every tick. Content is
//! supplied by the embedding application (see [`crate::generators`]); the
//! hub only relies on the contract below.

use serde::Serialize;
use serde_json::{Map, Value};

/// Per-stream progress marker, owned by the stream and opaque to the hub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(u64);

impl Cursor {
    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    pub const fn position(self) -> u64 {
        self.0
    }

    /// The cursor one step further along
    pub const fn advance(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Content of one event, before it is stamped and serialized
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Value of the event's `type` field
    pub kind: String,
    /// Fields flattened into the event object
    pub fields: Map<String, Value>,
}

impl Payload {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Add a field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build a payload from any struct that serializes to a JSON object
    ///
    /// Non-object values are stored under a single `data` field.
    pub fn from_serialize<T: Serialize>(kind: impl Into<String>, body: &T) -> serde_json::Result<Self> {
        let fields = match serde_json::to_value(body)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        Ok(Self {
            kind: kind.into(),
            fields,
        })
    }
}

/// Result of one generator step
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub payload: Payload,
    /// Cursor to hand back on the next call
    pub cursor: Cursor,
    /// The generator is exhausted; this payload is the last one
    pub terminal: bool,
}

impl Generated {
    pub fn next(payload: Payload, cursor: Cursor) -> Self {
        Self {
            payload,
            cursor,
            terminal: false,
        }
    }

    pub fn terminal(payload: Payload, cursor: Cursor) -> Self {
        Self {
            payload,
            cursor,
            terminal: true,
        }
    }
}

/// Produces the payload stream for a broadcast channel
///
/// `next` must be a pure function of the stream id and cursor and must not
/// perform I/O: it runs while the stream's state is locked.
pub trait EventGenerator: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Produce the payload at `cursor` for `stream_id`
    fn next(&self, stream_id: &str, cursor: Cursor) -> Generated;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Reading {
        sensor_name: &'static str,
        value: u32,
    }

    #[test]
    fn test_cursor_advance() {
        let cursor = Cursor::default();
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.advance().advance().position(), 2);
        assert_eq!(Cursor::new(u64::MAX).advance().position(), u64::MAX);
    }

    #[test]
    fn test_payload_builder() {
        let payload = Payload::new("random").field("value", 42).field("label", "x");
        assert_eq!(payload.kind, "random");
        assert_eq!(payload.fields["value"], 42);
        assert_eq!(payload.fields["label"], "x");
    }

    #[test]
    fn test_payload_from_serialize() {
        let payload = Payload::from_serialize(
            "reading",
            &Reading {
                sensor_name: "t1",
                value: 7,
            },
        )
        .unwrap();
        assert_eq!(payload.fields["sensorName"], "t1");
        assert_eq!(payload.fields["value"], 7);

        let scalar = Payload::from_serialize("count", &5).unwrap();
        assert_eq!(scalar.fields["data"], 5);
    }
}
