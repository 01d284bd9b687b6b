//! The `StreamRecording` value type and its invariant-preserving mutators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::RecordingId;

use super::http::HttpSession;
use super::sse::{SseEvent, SsePayload};
use super::summary::RecordingSummary;
use super::websocket::{Direction, WebSocketFrame, WebSocketPayload, WsFrameInput};

/// Format version tag written to every recording file.
pub const CURRENT_VERSION: &str = "1.0";

/// The protocol a recording captured. Selects which payload variant is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    WebSocket,
    Sse,
}

impl Protocol {
    fn as_wire_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::Sse => "sse",
        }
    }

    fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "http" => Some(Self::Http),
            "websocket" => Some(Self::WebSocket),
            "sse" => Some(Self::Sse),
            _ => None,
        }
    }
}

/// Lifecycle status of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Recording,
    Complete,
    Incomplete,
    Corrupted,
}

impl Status {
    fn as_wire_str(self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Corrupted => "corrupted",
        }
    }

    fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "recording" => Some(Self::Recording),
            "complete" => Some(Self::Complete),
            "incomplete" => Some(Self::Incomplete),
            "corrupted" => Some(Self::Corrupted),
            _ => None,
        }
    }
}

/// Future-sync status; defaults to `local` until a sync backend exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Local,
    Pending,
    Synced,
}

/// Request-context metadata captured at `StartRecording` time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub query_params: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_template: Option<String>,
}

/// Aggregate counters kept in sync with the populated payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStats {
    pub frame_count: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub text_frames: u64,
    pub binary_frames: u64,
    pub ping_pongs: u64,
    pub event_count: u64,
    pub file_size_bytes: u64,
}

/// The protocol-specific payload, exactly one variant populated per recording.
///
/// Internally a sum type (so callers can't construct an inconsistent
/// combination); the on-disk JSON keeps the three-nullable-field layout for
/// forward compatibility, handled by [`WireStreamRecording`]'s (de)serialization.
#[derive(Debug, Clone)]
pub enum ProtocolPayload {
    Http(HttpSession),
    WebSocket(WebSocketPayload),
    Sse(SsePayload),
}

impl ProtocolPayload {
    fn protocol(&self) -> Protocol {
        match self {
            Self::Http(_) => Protocol::Http,
            Self::WebSocket(_) => Protocol::WebSocket,
            Self::Sse(_) => Protocol::Sse,
        }
    }

    fn frame_count(&self) -> u64 {
        match self {
            Self::Http(s) => s.recordings.len() as u64,
            Self::WebSocket(w) => w.frames.len() as u64,
            Self::Sse(s) => s.events.len() as u64,
        }
    }
}

/// A persisted capture of network interactions, identified by a ULID.
#[derive(Debug, Clone)]
pub struct StreamRecording {
    pub id: RecordingId,
    pub version: String,
    pub status: Status,
    pub sync_status: SyncStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub metadata: RecordingMetadata,
    pub payload: ProtocolPayload,
    pub stats: RecordingStats,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    /// Set by [`Deserialize`] when the on-disk `id`/`protocol`/`status` didn't
    /// parse as their typed form and had to be coerced to a placeholder;
    /// `validate()` surfaces this so a corrupted file still round-trips into
    /// a degraded value instead of failing to load at all. Always `None` for
    /// a recording built through [`Self::start`].
    structural_error: Option<ValidationError>,
}

impl StreamRecording {
    /// Begins a new recording of the given protocol. Status starts as `recording`.
    #[must_use]
    pub fn start(protocol: Protocol, metadata: RecordingMetadata) -> Self {
        let now = crate::clock::now();
        let payload = match protocol {
            Protocol::Http => ProtocolPayload::Http(HttpSession::default()),
            Protocol::WebSocket => ProtocolPayload::WebSocket(WebSocketPayload::default()),
            Protocol::Sse => ProtocolPayload::Sse(SsePayload::default()),
        };
        Self {
            id: RecordingId::generate(),
            version: CURRENT_VERSION.to_string(),
            status: Status::Recording,
            sync_status: SyncStatus::default(),
            start_time: now,
            end_time: None,
            duration_ms: 0,
            deleted: false,
            deleted_at: None,
            metadata,
            payload,
            stats: RecordingStats::default(),
            name: None,
            description: None,
            tags: Vec::new(),
            updated_at: now,
            structural_error: None,
        }
    }

    /// The protocol tag, derived from the populated payload.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.payload.protocol()
    }

    /// Appends a WebSocket frame, assigning the next sequence number and
    /// computing `relativeMs` against `start_time`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PayloadMismatch`] if this recording's payload
    /// is not `websocket`.
    pub fn add_websocket_frame(
        &mut self,
        direction: Direction,
        input: WsFrameInput,
        now: DateTime<Utc>,
    ) -> Result<&WebSocketFrame, ValidationError> {
        let ws = match &mut self.payload {
            ProtocolPayload::WebSocket(ws) => ws,
            _ => return Err(ValidationError::PayloadMismatch),
        };
        let sequence = ws.frames.last().map_or(1, |f| f.sequence + 1);
        let relative_ms = relative_millis(self.start_time, now);
        let frame = WebSocketFrame::new(sequence, now, relative_ms, direction, input);
        ws.frames.push(frame);
        self.updated_at = now;
        Ok(ws.frames.last().expect("just pushed"))
    }

    /// Appends a close frame and records close metadata on the websocket payload.
    pub fn set_websocket_close(
        &mut self,
        direction: Direction,
        code: Option<u16>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&WebSocketFrame, ValidationError> {
        let ws = match &mut self.payload {
            ProtocolPayload::WebSocket(ws) => ws,
            _ => return Err(ValidationError::PayloadMismatch),
        };
        let sequence = ws.frames.last().map_or(1, |f| f.sequence + 1);
        let relative_ms = relative_millis(self.start_time, now);
        let frame =
            WebSocketFrame::new_close(sequence, now, relative_ms, direction, code, reason.clone());
        ws.frames.push(frame);
        ws.close_code = code;
        ws.close_reason = reason;
        ws.disconnected_at = Some(now);
        self.updated_at = now;
        Ok(ws.frames.last().expect("just pushed"))
    }

    /// Appends an SSE event. The first event's `relativeMs` is 0; subsequent
    /// events are measured against the first event's timestamp.
    pub fn add_sse_event(
        &mut self,
        event_type: String,
        data: String,
        id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&SseEvent, ValidationError> {
        let sse = match &mut self.payload {
            ProtocolPayload::Sse(sse) => sse,
            _ => return Err(ValidationError::PayloadMismatch),
        };
        let sequence = sse.events.last().map_or(1, |e| e.sequence + 1);
        let relative_ms = match sse.events.first() {
            Some(first) => relative_millis(first.timestamp, now),
            None => 0,
        };
        let event = SseEvent::new(
            sequence, now, relative_ms, event_type, data, id, retry_ms, comment,
        );
        sse.events.push(event);
        self.updated_at = now;
        Ok(sse.events.last().expect("just pushed"))
    }

    /// Marks the SSE stream as ended (the remote closed the connection).
    pub fn set_sse_end(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let sse = match &mut self.payload {
            ProtocolPayload::Sse(sse) => sse,
            _ => return Err(ValidationError::PayloadMismatch),
        };
        sse.ended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Transitions to `complete`, sets `endTime`/`duration`, and recomputes stats.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = Status::Complete;
        self.end_time = Some(now);
        self.duration_ms = relative_millis(self.start_time, now);
        self.recompute_stats();
        self.updated_at = now;
    }

    /// Transitions to `incomplete` (e.g. the client disconnected mid-capture).
    pub fn mark_incomplete(&mut self, now: DateTime<Utc>) {
        self.status = Status::Incomplete;
        self.end_time = Some(now);
        self.duration_ms = relative_millis(self.start_time, now);
        self.recompute_stats();
        self.updated_at = now;
    }

    /// Marks the recording corrupted; used by load-time validation failure.
    pub fn mark_corrupted(&mut self, now: DateTime<Utc>) {
        self.status = Status::Corrupted;
        self.updated_at = now;
    }

    /// Tombstones the recording without removing it from disk.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Recomputes `stats` from the populated payload. Safe to call any number
    /// of times; append operations don't need to keep counters incrementally
    /// in sync as long as this runs before the recording is considered final.
    pub fn recompute_stats(&mut self) {
        let mut stats = RecordingStats::default();
        match &self.payload {
            ProtocolPayload::Http(session) => {
                stats.frame_count = session.recordings.len() as u64;
                for rec in &session.recordings {
                    stats.bytes_sent += rec.request_body.len() as u64;
                    stats.bytes_received += rec.response_body.len() as u64;
                }
            }
            ProtocolPayload::WebSocket(ws) => {
                stats.frame_count = ws.frames.len() as u64;
                for frame in &ws.frames {
                    match frame.direction {
                        Direction::C2s => stats.bytes_sent += frame.data_size,
                        Direction::S2c => stats.bytes_received += frame.data_size,
                    }
                    match frame.message_type {
                        super::websocket::MessageType::Text => stats.text_frames += 1,
                        super::websocket::MessageType::Binary => stats.binary_frames += 1,
                        super::websocket::MessageType::Ping
                        | super::websocket::MessageType::Pong => stats.ping_pongs += 1,
                        super::websocket::MessageType::Close => {}
                    }
                }
            }
            ProtocolPayload::Sse(sse) => {
                stats.frame_count = sse.events.len() as u64;
                stats.event_count = sse.events.len() as u64;
                for event in &sse.events {
                    stats.bytes_received += event.data_size;
                }
            }
        }
        stats.file_size_bytes = self.stats.file_size_bytes;
        self.stats = stats;
    }

    /// Records the on-disk file size after a successful write, without
    /// disturbing the rest of `stats`.
    pub fn set_file_size(&mut self, bytes: u64) {
        self.stats.file_size_bytes = bytes;
    }

    /// Checks all invariants from the data model. On success, `self.protocol()`
    /// matches the populated payload and frame/event ordering holds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(err) = self.structural_error.clone() {
            return Err(err);
        }

        match self.status {
            Status::Recording | Status::Complete | Status::Incomplete | Status::Corrupted => {}
        }

        match &self.payload {
            ProtocolPayload::WebSocket(ws) => {
                let mut prev_seq: Option<u64> = None;
                let mut prev_ms: Option<u64> = None;
                let mut close_seen_at: Option<usize> = None;
                for (idx, frame) in ws.frames.iter().enumerate() {
                    if let Some(p) = prev_seq {
                        if frame.sequence <= p {
                            return Err(ValidationError::OutOfOrderSequence);
                        }
                    }
                    if let Some(p) = prev_ms {
                        if frame.relative_ms < p {
                            return Err(ValidationError::OutOfOrderTiming);
                        }
                    }
                    prev_seq = Some(frame.sequence);
                    prev_ms = Some(frame.relative_ms);
                    if frame.message_type == super::websocket::MessageType::Close {
                        if close_seen_at.is_some() {
                            return Err(ValidationError::MisplacedCloseFrame);
                        }
                        close_seen_at = Some(idx);
                    }
                }
                if let Some(idx) = close_seen_at {
                    if idx != ws.frames.len() - 1 {
                        return Err(ValidationError::MisplacedCloseFrame);
                    }
                }
            }
            ProtocolPayload::Sse(sse) => {
                let mut prev_seq: Option<u64> = None;
                let mut prev_ms: Option<u64> = None;
                for event in &sse.events {
                    if let Some(p) = prev_seq {
                        if event.sequence <= p {
                            return Err(ValidationError::OutOfOrderSequence);
                        }
                    }
                    if let Some(p) = prev_ms {
                        if event.relative_ms < p {
                            return Err(ValidationError::OutOfOrderTiming);
                        }
                    }
                    prev_seq = Some(event.sequence);
                    prev_ms = Some(event.relative_ms);
                }
            }
            ProtocolPayload::Http(_) => {}
        }

        if matches!(self.status, Status::Recording) && self.end_time.is_some() {
            return Err(ValidationError::PayloadMismatch);
        }
        if !matches!(self.status, Status::Recording) && self.end_time.is_none() {
            return Err(ValidationError::PayloadMismatch);
        }

        Ok(())
    }

    /// Lightweight listing projection.
    #[must_use]
    pub fn to_summary(&self) -> RecordingSummary {
        RecordingSummary {
            id: self.id,
            protocol: self.protocol(),
            name: self.name.clone(),
            path: self.metadata.path.clone(),
            status: self.status,
            start_time: self.start_time,
            duration_ms: self.duration_ms,
            frame_count: self.payload.frame_count(),
            file_size_bytes: self.stats.file_size_bytes,
            tags: self.tags.clone(),
            sync_status: self.sync_status,
            deleted: self.deleted,
        }
    }
}

fn relative_millis(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// On-disk JSON shape: the three-field nullable layout described in the wire
/// format, kept distinct from the in-memory tagged [`ProtocolPayload`] so a
/// future format version can still read the fields independently of Rust's
/// sum-type representation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStreamRecording {
    #[serde(default)]
    id: String,
    version: String,
    /// Raw wire string rather than [`Protocol`] directly: an unrecognized or
    /// missing value must not fail deserialization outright (spec invariant 6)
    /// - it's resolved permissively here and checked in `validate()` instead.
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    status: String,
    sync_status: SyncStatus,
    start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    end_time: Option<DateTime<Utc>>,
    duration: u64,
    #[serde(default)]
    deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    deleted_at: Option<DateTime<Utc>>,
    metadata: RecordingMetadata,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    http: Option<HttpSession>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    websocket: Option<WebSocketPayload>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    sse: Option<SsePayload>,
    stats: RecordingStats,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl Serialize for StreamRecording {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (http, websocket, sse) = match self.payload.clone() {
            ProtocolPayload::Http(s) => (Some(s), None, None),
            ProtocolPayload::WebSocket(w) => (None, Some(w), None),
            ProtocolPayload::Sse(s) => (None, None, Some(s)),
        };
        let wire = WireStreamRecording {
            id: self.id.as_str(),
            version: self.version.clone(),
            protocol: self.protocol().as_wire_str().to_string(),
            status: self.status.as_wire_str().to_string(),
            sync_status: self.sync_status,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration_ms,
            deleted: self.deleted,
            deleted_at: self.deleted_at,
            metadata: self.metadata.clone(),
            http,
            websocket,
            sse,
            stats: self.stats,
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            updated_at: self.updated_at,
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreamRecording {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = WireStreamRecording::deserialize(deserializer)?;

        // `id`/`protocol`/`status` are resolved permissively: an invalid ULID,
        // an unrecognized protocol/status string, or a missing field all
        // coerce to a placeholder here rather than failing the whole parse,
        // so `FileStore::get` can still return a degraded, corrupted value
        // per spec invariant 6 instead of losing the recording outright.
        let mut structural_error = None;

        let id = wire.id.parse::<RecordingId>().unwrap_or_else(|_| {
            structural_error.get_or_insert(ValidationError::InvalidUlid);
            RecordingId::nil()
        });

        let protocol = Protocol::from_wire_str(&wire.protocol).or_else(|| {
            structural_error.get_or_insert(ValidationError::InvalidProtocol);
            None
        });

        let status = Status::from_wire_str(&wire.status).unwrap_or_else(|| {
            structural_error.get_or_insert(ValidationError::InvalidStatus);
            Status::Corrupted
        });

        // Tolerate a missing/mismatched payload (e.g. truncated file, or an
        // unrecognized protocol) by substituting an empty one; `validate()`
        // still catches real structural problems via sequence/timing checks.
        let payload = match (protocol, wire.http, wire.websocket, wire.sse) {
            (Some(Protocol::Http), Some(h), None, None) => ProtocolPayload::Http(h),
            (Some(Protocol::WebSocket), None, Some(w), None) => ProtocolPayload::WebSocket(w),
            (Some(Protocol::Sse), None, None, Some(s)) => ProtocolPayload::Sse(s),
            (Some(Protocol::Http), ..) => ProtocolPayload::Http(HttpSession::default()),
            (Some(Protocol::WebSocket), ..) => ProtocolPayload::WebSocket(WebSocketPayload::default()),
            (Some(Protocol::Sse), ..) => ProtocolPayload::Sse(SsePayload::default()),
            (None, ..) => ProtocolPayload::Http(HttpSession::default()),
        };

        Ok(StreamRecording {
            id,
            version: wire.version,
            status,
            sync_status: wire.sync_status,
            start_time: wire.start_time,
            end_time: wire.end_time,
            duration_ms: wire.duration,
            deleted: wire.deleted,
            deleted_at: wire.deleted_at,
            metadata: wire.metadata,
            payload,
            stats: wire.stats,
            name: wire.name,
            description: wire.description,
            tags: wire.tags,
            updated_at: wire.updated_at,
            structural_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::websocket::WsFrameInput;

    fn t(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn start_creates_recording_status_with_matching_empty_payload() {
        let rec = StreamRecording::start(Protocol::WebSocket, RecordingMetadata::default());
        assert_eq!(rec.status, Status::Recording);
        assert_eq!(rec.protocol(), Protocol::WebSocket);
        assert!(rec.end_time.is_none());
        assert!(matches!(rec.payload, ProtocolPayload::WebSocket(_)));
    }

    #[test]
    fn websocket_frames_get_increasing_sequence_and_relative_ms() {
        let mut rec = StreamRecording::start(Protocol::WebSocket, RecordingMetadata::default());
        rec.start_time = t(1_000);
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("hello".into()), t(1_000))
            .unwrap();
        rec.add_websocket_frame(Direction::C2s, WsFrameInput::Text("hi".into()), t(1_100))
            .unwrap();
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("bye".into()), t(1_250))
            .unwrap();

        let ProtocolPayload::WebSocket(ws) = &rec.payload else {
            panic!("expected websocket payload")
        };
        let seqs: Vec<u64> = ws.frames.iter().map(|f| f.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let rels: Vec<u64> = ws.frames.iter().map(|f| f.relative_ms).collect();
        assert_eq!(rels, vec![0, 100, 250]);
    }

    #[test]
    fn appending_to_wrong_protocol_payload_fails() {
        let mut rec = StreamRecording::start(Protocol::Sse, RecordingMetadata::default());
        let err = rec
            .add_websocket_frame(Direction::S2c, WsFrameInput::Ping, t(0))
            .unwrap_err();
        assert_eq!(err, ValidationError::PayloadMismatch);
    }

    #[test]
    fn sse_first_event_relative_ms_is_zero() {
        let mut rec = StreamRecording::start(Protocol::Sse, RecordingMetadata::default());
        rec.add_sse_event(
            String::new(),
            "{\"i\":1}".into(),
            "1".into(),
            None,
            None,
            t(5_000),
        )
        .unwrap();
        rec.add_sse_event(
            "done".into(),
            "[DONE]".into(),
            "2".into(),
            None,
            None,
            t(5_120),
        )
        .unwrap();

        let ProtocolPayload::Sse(sse) = &rec.payload else {
            panic!("expected sse payload")
        };
        assert_eq!(sse.events[0].relative_ms, 0);
        assert_eq!(sse.events[1].relative_ms, 120);
    }

    #[test]
    fn complete_sets_end_time_and_recomputes_stats() {
        let mut rec = StreamRecording::start(Protocol::WebSocket, RecordingMetadata::default());
        rec.start_time = t(0);
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("a".into()), t(0))
            .unwrap();
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("bb".into()), t(10))
            .unwrap();
        rec.complete(t(10));

        assert_eq!(rec.status, Status::Complete);
        assert_eq!(rec.end_time, Some(t(10)));
        assert_eq!(rec.stats.frame_count, 2);
        assert_eq!(rec.stats.text_frames, 2);
        assert_eq!(rec.stats.bytes_received, 3);
    }

    #[test]
    fn close_frame_must_be_last_and_unique() {
        let mut rec = StreamRecording::start(Protocol::WebSocket, RecordingMetadata::default());
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("a".into()), t(0))
            .unwrap();
        rec.set_websocket_close(Direction::S2c, Some(1000), None, t(10))
            .unwrap();
        assert!(rec.validate().is_ok());

        // A frame appended after close makes the recording invalid.
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("late".into()), t(20))
            .unwrap();
        assert_eq!(rec.validate().unwrap_err(), ValidationError::MisplacedCloseFrame);
    }

    #[test]
    fn recording_status_requires_no_end_time() {
        let mut rec = StreamRecording::start(Protocol::Sse, RecordingMetadata::default());
        rec.end_time = Some(t(1));
        assert_eq!(rec.validate().unwrap_err(), ValidationError::PayloadMismatch);
    }

    #[test]
    fn complete_status_requires_end_time() {
        let mut rec = StreamRecording::start(Protocol::Sse, RecordingMetadata::default());
        rec.status = Status::Complete;
        assert_eq!(rec.validate().unwrap_err(), ValidationError::PayloadMismatch);
    }

    #[test]
    fn json_round_trip_preserves_frames_and_tags() {
        let mut rec = StreamRecording::start(Protocol::WebSocket, RecordingMetadata::default());
        rec.tags = vec!["chat".into()];
        rec.add_websocket_frame(Direction::S2c, WsFrameInput::Text("hi".into()), t(0))
            .unwrap();
        rec.complete(t(50));

        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"websocket\""));
        assert!(!json.contains("\"http\":"));
        let back: StreamRecording = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.tags, rec.tags);
        assert_eq!(back.stats.frame_count, rec.stats.frame_count);
    }

    #[test]
    fn unrecognized_protocol_deserializes_to_a_validate_failure() {
        let mut rec = StreamRecording::start(Protocol::Http, RecordingMetadata::default());
        rec.complete(t(0));
        let mut json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&rec).unwrap()).unwrap();
        json["protocol"] = serde_json::Value::String("grpc".into());

        let back: StreamRecording = serde_json::from_value(json).unwrap();
        assert_eq!(back.validate(), Err(ValidationError::InvalidProtocol));
    }

    #[test]
    fn unrecognized_status_deserializes_to_a_validate_failure() {
        let mut rec = StreamRecording::start(Protocol::Http, RecordingMetadata::default());
        rec.complete(t(0));
        let mut json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&rec).unwrap()).unwrap();
        json["status"] = serde_json::Value::String("archived".into());

        let back: StreamRecording = serde_json::from_value(json).unwrap();
        assert_eq!(back.validate(), Err(ValidationError::InvalidStatus));
    }

    #[test]
    fn invalid_ulid_deserializes_to_a_validate_failure() {
        let mut rec = StreamRecording::start(Protocol::Http, RecordingMetadata::default());
        rec.complete(t(0));
        let mut json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&rec).unwrap()).unwrap();
        json["id"] = serde_json::Value::String("not-a-ulid".into());

        let back: StreamRecording = serde_json::from_value(json).unwrap();
        assert_eq!(back.validate(), Err(ValidationError::InvalidUlid));
    }

    #[test]
    fn missing_protocol_field_deserializes_to_a_validate_failure() {
        let mut rec = StreamRecording::start(Protocol::Http, RecordingMetadata::default());
        rec.complete(t(0));
        let mut json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&rec).unwrap()).unwrap();
        json.as_object_mut().unwrap().remove("protocol");

        let back: StreamRecording = serde_json::from_value(json).unwrap();
        assert_eq!(back.validate(), Err(ValidationError::InvalidProtocol));
    }

    #[test]
    fn to_summary_projects_listing_fields() {
        let mut rec = StreamRecording::start(Protocol::Http, RecordingMetadata {
            path: Some("/v1/users".into()),
            ..Default::default()
        });
        rec.name = Some("demo".into());
        rec.complete(t(0));
        let summary = rec.to_summary();
        assert_eq!(summary.id, rec.id);
        assert_eq!(summary.path.as_deref(), Some("/v1/users"));
        assert_eq!(summary.name.as_deref(), Some("demo"));
        assert_eq!(summary.status, Status::Complete);
    }
}
