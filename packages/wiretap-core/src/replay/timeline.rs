//! Flattens a loaded recording's protocol payload into a uniform, ordered
//! timeline the three replay modes can all walk generically.

use crate::error::ReplayError;
use crate::model::{Direction, ProtocolPayload, SseEvent, StreamRecording, WebSocketFrame};

/// A frame handed to the installed send callback.
#[derive(Debug, Clone)]
pub enum ReplayFrame {
    WebSocket(WebSocketFrame),
    Sse(SseEvent),
}

impl ReplayFrame {
    /// The raw bytes this frame carries, used for triggered-mode `until`
    /// matching and synchronized-mode strict comparison.
    #[must_use]
    pub fn raw_bytes(&self) -> Vec<u8> {
        match self {
            Self::WebSocket(frame) => frame.decoded_bytes().unwrap_or_default(),
            Self::Sse(event) => event.data.clone().into_bytes(),
        }
    }
}

/// One entry in a replay timeline: a frame plus the timing/direction
/// information needed to schedule and route it.
#[derive(Debug, Clone)]
pub(crate) struct TimedFrame {
    pub relative_ms: u64,
    pub direction: Direction,
    pub frame: ReplayFrame,
}

/// Builds the full ordered timeline (both directions) for a recording.
/// SSE recordings have no client-direction frames; every event is `s2c`.
pub(crate) fn build_timeline(recording: &StreamRecording) -> Result<Vec<TimedFrame>, ReplayError> {
    match &recording.payload {
        ProtocolPayload::WebSocket(ws) => Ok(ws
            .frames
            .iter()
            .map(|f| TimedFrame {
                relative_ms: f.relative_ms,
                direction: f.direction,
                frame: ReplayFrame::WebSocket(f.clone()),
            })
            .collect()),
        ProtocolPayload::Sse(sse) => Ok(sse
            .events
            .iter()
            .map(|e| TimedFrame {
                relative_ms: e.relative_ms,
                direction: Direction::S2c,
                frame: ReplayFrame::Sse(e.clone()),
            })
            .collect()),
        ProtocolPayload::Http(_) => Err(ReplayError::InvalidReplayMode),
    }
}

/// Server-to-client subset of the timeline, for pure and triggered modes.
pub(crate) fn server_only(timeline: &[TimedFrame]) -> Vec<TimedFrame> {
    timeline
        .iter()
        .filter(|f| f.direction == Direction::S2c)
        .cloned()
        .collect()
}
