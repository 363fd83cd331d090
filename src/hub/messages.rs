//! Stream Message Types
//!
//! Defines the events pushed to subscribers and their wire encoding.
//!
//! Every event is a flat JSON object carrying `type`, `streamId` and an
//! ISO-8601 `timestamp`, followed by whatever fields the generator produced.
//! On the wire each event is one SSE frame: `data: <JSON>\n\n`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Event type of the acknowledgement sent to a freshly attached client
pub const CONNECTED: &str = "connected";

/// Keys owned by the envelope; generator fields with these names are dropped
const RESERVED_KEYS: [&str; 3] = ["type", "streamId", "timestamp"];

/// A single event as seen by subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Event type (`connected`, a payload kind, or `summary`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Stream the event belongs to
    pub stream_id: String,
    /// Wall-clock time the event was produced
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Payload fields, flattened into the top-level object
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StreamEvent {
    /// Build an event stamped with the current time
    pub fn new(kind: impl Into<String>, stream_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self::at(kind, stream_id, fields, Utc::now())
    }

    /// Build an event with an explicit timestamp
    pub fn at(
        kind: impl Into<String>,
        stream_id: impl Into<String>,
        mut fields: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        for key in RESERVED_KEYS {
            fields.remove(key);
        }

        Self {
            kind: kind.into(),
            stream_id: stream_id.into(),
            timestamp,
            fields,
        }
    }

    /// The acknowledgement a client receives right after subscribing
    pub fn connected(stream_id: impl Into<String>) -> Self {
        Self::new(CONNECTED, stream_id, Map::new())
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A serialized event, shared by every sink it is fanned out to
///
/// Cloning is a reference-count bump; the JSON is encoded once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Arc<str>,
}

impl Frame {
    /// Serialize an event into a frame
    pub fn encode(event: &StreamEvent) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(Self { data: json.into() })
    }

    /// The JSON body of the frame
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The frame as it appears on an SSE connection
    pub fn to_wire(&self) -> String {
        format!("data: {}\n\n", self.data)
    }

    /// Decode the JSON body back into a generic value
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_connected_event_shape() {
        let frame = Frame::encode(&StreamEvent::connected("abc")).unwrap();
        let value = frame.json().unwrap();

        assert_eq!(value["type"], "connected");
        assert_eq!(value["streamId"], "abc");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_fields_are_flattened() {
        let fields = json!({"speaker": "Agent", "id": 1})
            .as_object()
            .cloned()
            .unwrap();
        let event = StreamEvent::at("transcript", "abc", fields, fixed_time());
        let value = Frame::encode(&event).unwrap().json().unwrap();

        assert_eq!(value["type"], "transcript");
        assert_eq!(value["speaker"], "Agent");
        assert_eq!(value["id"], 1);
        assert_eq!(value["timestamp"], "2024-03-01T12:30:45.000Z");
    }

    #[test]
    fn test_reserved_keys_cannot_be_overridden() {
        let fields = json!({"type": "spoofed", "streamId": "other", "value": 3})
            .as_object()
            .cloned()
            .unwrap();
        let event = StreamEvent::at("random", "r1", fields, fixed_time());
        let value = Frame::encode(&event).unwrap().json().unwrap();

        assert_eq!(value["type"], "random");
        assert_eq!(value["streamId"], "r1");
        assert_eq!(value["value"], 3);
    }

    #[test]
    fn test_wire_format() {
        let event = StreamEvent::at(CONNECTED, "abc", Map::new(), fixed_time());
        let frame = Frame::encode(&event).unwrap();

        assert_eq!(
            frame.to_wire(),
            "data: {\"type\":\"connected\",\"streamId\":\"abc\",\"timestamp\":\"2024-03-01T12:30:45.000Z\"}\n\n"
        );
    }
}
