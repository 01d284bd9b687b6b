//! WebSocket frame model.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction a frame traveled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server.
    C2s,
    /// Server to client.
    S2c,
}

/// WebSocket message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Binary,
    Ping,
    Pong,
    Close,
}

/// How `data` is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataEncoding {
    Utf8,
    Base64,
}

/// Caller-supplied content for a non-close frame.
///
/// Ping/Pong frames carry no payload in this model; only their occurrence is
/// recorded, since presence rather than content is what downstream consumers
/// care about for heartbeat frames.
#[derive(Debug, Clone)]
pub enum WsFrameInput {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
}

impl WsFrameInput {
    fn message_type(&self) -> MessageType {
        match self {
            Self::Text(_) => MessageType::Text,
            Self::Binary(_) => MessageType::Binary,
            Self::Ping => MessageType::Ping,
            Self::Pong => MessageType::Pong,
        }
    }

    fn encode(&self) -> (String, DataEncoding, u64) {
        match self {
            Self::Text(s) => (s.clone(), DataEncoding::Utf8, s.len() as u64),
            Self::Binary(bytes) => (BASE64.encode(bytes), DataEncoding::Base64, bytes.len() as u64),
            Self::Ping | Self::Pong => (String::new(), DataEncoding::Utf8, 0),
        }
    }
}

/// A single captured WebSocket frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketFrame {
    /// Monotonic per-recording sequence number, starting at 1.
    pub sequence: u64,
    /// Absolute wall-clock time the frame was captured.
    pub timestamp: DateTime<Utc>,
    /// Milliseconds elapsed since the recording's `startTime`.
    pub relative_ms: u64,
    pub direction: Direction,
    pub message_type: MessageType,
    /// UTF-8 string for text/close frames, base64 for binary frames.
    pub data: String,
    pub data_encoding: DataEncoding,
    /// Original byte count before any base64 encoding.
    pub data_size: u64,
    /// Present iff `message_type == Close`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_code: Option<u16>,
    /// Present iff `message_type == Close`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_reason: Option<String>,
}

impl WebSocketFrame {
    pub(crate) fn new(
        sequence: u64,
        timestamp: DateTime<Utc>,
        relative_ms: u64,
        direction: Direction,
        input: WsFrameInput,
    ) -> Self {
        let message_type = input.message_type();
        let (data, data_encoding, data_size) = input.encode();
        Self {
            sequence,
            timestamp,
            relative_ms,
            direction,
            message_type,
            data,
            data_encoding,
            data_size,
            close_code: None,
            close_reason: None,
        }
    }

    pub(crate) fn new_close(
        sequence: u64,
        timestamp: DateTime<Utc>,
        relative_ms: u64,
        direction: Direction,
        code: Option<u16>,
        reason: Option<String>,
    ) -> Self {
        let data = reason.clone().unwrap_or_default();
        let data_size = data.len() as u64;
        Self {
            sequence,
            timestamp,
            relative_ms,
            direction,
            message_type: MessageType::Close,
            data,
            data_encoding: DataEncoding::Utf8,
            data_size,
            close_code: code,
            close_reason: reason,
        }
    }

    /// Decodes `data` back to raw bytes, regardless of encoding.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.data_encoding {
            DataEncoding::Utf8 => Ok(self.data.as_bytes().to_vec()),
            DataEncoding::Base64 => BASE64.decode(&self.data),
        }
    }
}

/// The `websocket` protocol payload: captured frames plus close metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketPayload {
    pub frames: Vec<WebSocketFrame>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub disconnected_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_encodes_as_utf8() {
        let frame = WebSocketFrame::new(
            1,
            Utc::now(),
            0,
            Direction::S2c,
            WsFrameInput::Text("hello".into()),
        );
        assert_eq!(frame.data, "hello");
        assert_eq!(frame.data_encoding, DataEncoding::Utf8);
        assert_eq!(frame.data_size, 5);
    }

    #[test]
    fn binary_frame_encodes_as_base64() {
        let frame = WebSocketFrame::new(
            1,
            Utc::now(),
            0,
            Direction::S2c,
            WsFrameInput::Binary(vec![0xde, 0xad, 0xbe, 0xef]),
        );
        assert_eq!(frame.data_encoding, DataEncoding::Base64);
        assert_eq!(frame.data_size, 4);
        assert_eq!(frame.decoded_bytes().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn close_frame_carries_code_and_reason() {
        let frame = WebSocketFrame::new_close(
            3,
            Utc::now(),
            250,
            Direction::S2c,
            Some(1000),
            Some("bye".into()),
        );
        assert_eq!(frame.message_type, MessageType::Close);
        assert_eq!(frame.close_code, Some(1000));
        assert_eq!(frame.close_reason.as_deref(), Some("bye"));
    }

    #[test]
    fn ping_pong_have_empty_payload() {
        let frame = WebSocketFrame::new(1, Utc::now(), 0, Direction::C2s, WsFrameInput::Ping);
        assert_eq!(frame.data_size, 0);
        assert!(frame.data.is_empty());
    }
}
