//! Server-Sent Event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single captured SSE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseEvent {
    /// Monotonic per-recording sequence number, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds elapsed since the first event; the first event's value is 0.
    pub relative_ms: u64,
    /// Empty string means the default `message` event type.
    pub event_type: String,
    pub data: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
    pub data_size: u64,
}

impl SseEvent {
    pub(crate) fn new(
        sequence: u64,
        timestamp: DateTime<Utc>,
        relative_ms: u64,
        event_type: String,
        data: String,
        id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
    ) -> Self {
        let data_size = data.len() as u64;
        Self {
            sequence,
            timestamp,
            relative_ms,
            event_type,
            data,
            id,
            retry_ms,
            comment,
            data_size,
        }
    }

    /// The effective event type, substituting `message` for the empty default.
    pub fn effective_type(&self) -> &str {
        if self.event_type.is_empty() {
            "message"
        } else {
            &self.event_type
        }
    }
}

/// The `sse` protocol payload: captured events plus stream lifecycle markers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsePayload {
    pub events: Vec<SseEvent>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_event_type_resolves_to_message() {
        let event = SseEvent::new(
            1,
            Utc::now(),
            0,
            String::new(),
            "{}".into(),
            "1".into(),
            None,
            None,
        );
        assert_eq!(event.effective_type(), "message");
    }

    #[test]
    fn explicit_event_type_is_preserved() {
        let event = SseEvent::new(
            1,
            Utc::now(),
            0,
            "done".into(),
            "[DONE]".into(),
            "2".into(),
            None,
            None,
        );
        assert_eq!(event.effective_type(), "done");
    }

    #[test]
    fn data_size_tracks_byte_length() {
        let event = SseEvent::new(
            1,
            Utc::now(),
            0,
            String::new(),
            "hello".into(),
            "1".into(),
            None,
            None,
        );
        assert_eq!(event.data_size, 5);
    }
}
