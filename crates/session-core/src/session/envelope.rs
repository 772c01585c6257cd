//! Fixed-shape message wrapping an event for a bound plugin connection.
//!
//! ```text
//! {"session_id", "conversation_id", "message_id", "app_id", "endpoint_id", "event", "data"}
//! ```

use super::record::SessionRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Event tag carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    Request,
    BackwardsResponse,
}

impl StreamEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEvent::Request => "request",
            StreamEvent::BackwardsResponse => "backwards_response",
        }
    }
}

impl std::fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of the envelope; built per write, never stored.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize + ?Sized> {
    pub session_id: &'a str,
    pub conversation_id: Option<&'a str>,
    pub message_id: Option<&'a str>,
    pub app_id: Option<&'a str>,
    pub endpoint_id: Option<&'a str>,
    pub event: StreamEvent,
    pub data: &'a T,
}

impl<'a, T: Serialize + ?Sized> Envelope<'a, T> {
    pub fn new(record: &'a SessionRecord, event: StreamEvent, data: &'a T) -> Self {
        Self {
            session_id: &record.id,
            conversation_id: record.conversation_id.as_deref(),
            message_id: record.message_id.as_deref(),
            app_id: record.app_id.as_deref(),
            endpoint_id: record.endpoint_id.as_deref(),
            event,
            data,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Encode `data` for `record` as envelope bytes.
pub fn encode<T: Serialize + ?Sized>(
    record: &SessionRecord,
    event: StreamEvent,
    data: &T,
) -> Result<Vec<u8>> {
    Envelope::new(record, event, data).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NewSessionPayload;
    use serde_json::{json, Value};

    fn record() -> SessionRecord {
        SessionRecord::from_payload(
            "s-1".into(),
            &NewSessionPayload {
                tenant_id: "tenant".into(),
                user_id: "user".into(),
                conversation_id: Some("conv".into()),
                app_id: Some("app".into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_envelope_has_exactly_the_correlation_fields() {
        let bytes = encode(&record(), StreamEvent::Request, &json!({"x": 1})).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "app_id",
                "conversation_id",
                "data",
                "endpoint_id",
                "event",
                "message_id",
                "session_id"
            ]
        );
        assert_eq!(value["session_id"], "s-1");
        assert_eq!(value["conversation_id"], "conv");
        assert!(value["message_id"].is_null());
        assert_eq!(value["event"], "request");
        assert_eq!(value["data"], json!({"x": 1}));
    }

    #[test]
    fn test_backwards_response_tag() {
        let bytes = encode(&record(), StreamEvent::BackwardsResponse, "done").unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["event"], "backwards_response");
        assert_eq!(value["data"], "done");
    }
}
