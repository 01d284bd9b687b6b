//! Recording data model: the `StreamRecording` aggregate and its protocol payloads.

pub mod http;
pub mod recording;
pub mod sse;
pub mod summary;
pub mod websocket;

pub use http::{HttpRecording, HttpSession, MultiMap};
pub use recording::{
    Protocol, ProtocolPayload, RecordingMetadata, RecordingStats, Status, StreamRecording,
    SyncStatus, CURRENT_VERSION,
};
pub use sse::{SseEvent, SsePayload};
pub use summary::RecordingSummary;
pub use websocket::{DataEncoding, Direction, MessageType, WebSocketFrame, WebSocketPayload, WsFrameInput};
