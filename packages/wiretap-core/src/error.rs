//! Centralized error types for the recording/replay engine.
//!
//! Each component boundary gets its own `thiserror` enum rather than one
//! monolithic error type, so callers can match narrowly on the operation they
//! invoked. All of them implement [`ErrorCode`] for machine-readable codes,
//! independent of any HTTP framework.

use thiserror::Error;

/// Trait for error types that provide a stable, machine-readable error code.
pub trait ErrorCode {
    /// Returns a machine-readable error code, stable across versions.
    fn code(&self) -> &'static str;
}

/// Distinct structural-validation failure kinds for [`crate::model::StreamRecording::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The recording's `id` field is not a well-formed ULID.
    #[error("invalid ULID")]
    InvalidUlid,

    /// The recording's `protocol` field is not one of the recognized variants.
    #[error("invalid protocol")]
    InvalidProtocol,

    /// The recording's `status` field is not one of the recognized variants.
    #[error("invalid status")]
    InvalidStatus,

    /// More than one (or zero) of `http`/`websocket`/`sse` payloads is populated,
    /// or the populated payload doesn't match `protocol`.
    #[error("payload does not match protocol tag")]
    PayloadMismatch,

    /// Frame/event sequence numbers are not strictly increasing.
    #[error("frame sequence numbers out of order")]
    OutOfOrderSequence,

    /// Frame/event relative-ms timestamps are not monotonically non-decreasing.
    #[error("frame relative timestamps out of order")]
    OutOfOrderTiming,

    /// A `close` frame appears somewhere other than as the final frame, or more than once.
    #[error("close frame must be unique and last")]
    MisplacedCloseFrame,
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidUlid => "invalid_ulid",
            Self::InvalidProtocol => "invalid_protocol",
            Self::InvalidStatus => "invalid_status",
            Self::PayloadMismatch => "payload_mismatch",
            Self::OutOfOrderSequence => "out_of_order_sequence",
            Self::OutOfOrderTiming => "out_of_order_timing",
            Self::MisplacedCloseFrame => "misplaced_close_frame",
        }
    }
}

/// Errors surfaced by [`crate::store::FileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No recording exists with the given id.
    #[error("recording not found: {0}")]
    NotFound(crate::id::RecordingId),

    /// The store is at or over its configured quota.
    #[error("storage limit exceeded")]
    StorageFull,

    /// The recording exists but has no active (in-progress) session.
    #[error("no active session for recording: {0}")]
    NoActiveSession(crate::id::RecordingId),

    /// An operation that requires no active session found one already open.
    #[error("session already active for recording: {0}")]
    SessionActive(crate::id::RecordingId),

    /// The on-disk artifact failed structural validation. Carries the
    /// (marked-corrupted) value so callers can still display it in listings.
    #[error("recording is corrupted: {}", .0.id)]
    Corrupted(Box<crate::model::StreamRecording>),

    /// Filesystem I/O failed during persistence or directory setup.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk JSON document failed to parse.
    #[error("malformed recording file: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::StorageFull => "storage_full",
            Self::NoActiveSession(_) => "no_active_session",
            Self::SessionActive(_) => "session_active",
            Self::Corrupted(_) => "corrupted",
            Self::Io(_) => "io_error",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Errors surfaced by [`crate::replay::ReplayController`] and [`crate::replay::ReplaySession`].
#[derive(Debug, Error)]
pub enum ReplayError {
    /// No recording exists for the requested replay.
    #[error("recording not found: {0}")]
    RecordingNotFound(crate::id::RecordingId),

    /// No replay session exists with the given id.
    #[error("replay session not found: {0}")]
    ReplayNotFound(crate::id::RecordingId),

    /// A replay session already exists for the requested recording.
    #[error("replay already active for recording: {0}")]
    ReplayAlreadyActive(crate::id::RecordingId),

    /// `ResumeReplay` was called on a session that is not paused.
    #[error("replay session is not paused")]
    ReplayNotPaused,

    /// `PauseReplay` was called on a session that is not playing.
    #[error("replay session is not playing")]
    ReplayNotPlaying,

    /// The operation cannot proceed because the session already reached a terminal state.
    #[error("replay session already complete")]
    ReplayComplete,

    /// `config.mode` did not match a recognized replay mode, or didn't match the
    /// recording's protocol (only websocket/sse recordings can be replayed).
    #[error("invalid replay mode")]
    InvalidReplayMode,

    /// `Advance` was called on a session not started in triggered mode.
    #[error("advance is only allowed in triggered mode")]
    AdvanceNotAllowed,

    /// A synchronized-mode client wait exceeded `config.timeout`.
    #[error("timed out waiting for a matching client message")]
    MatchTimeout,

    /// The installed send callback returned an error; replay is terminal.
    #[error("send callback failed: {0}")]
    SendFailed(String),
}

impl ErrorCode for ReplayError {
    fn code(&self) -> &'static str {
        match self {
            Self::RecordingNotFound(_) => "replay_recording_not_found",
            Self::ReplayNotFound(_) => "replay_not_found",
            Self::ReplayAlreadyActive(_) => "replay_already_active",
            Self::ReplayNotPaused => "replay_not_paused",
            Self::ReplayNotPlaying => "replay_not_playing",
            Self::ReplayComplete => "replay_complete",
            Self::InvalidReplayMode => "invalid_replay_mode",
            Self::AdvanceNotAllowed => "advance_not_allowed",
            Self::MatchTimeout => "match_timeout",
            Self::SendFailed(_) => "send_failed",
        }
    }
}

/// Errors surfaced by the stream→mock and HTTP→mock converters.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The recording's protocol has no stream conversion path (e.g. `http`).
    #[error("protocol {0:?} has no stream conversion")]
    UnsupportedProtocol(crate::model::Protocol),

    /// The recording is missing the payload its `protocol` tag promises.
    #[error("recording payload missing or mismatched for protocol {0:?}")]
    MissingPayload(crate::model::Protocol),
}

impl ErrorCode for ConvertError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedProtocol(_) => "unsupported_protocol",
            Self::MissingPayload(_) => "missing_payload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_codes_are_stable() {
        assert_eq!(ValidationError::InvalidUlid.code(), "invalid_ulid");
        assert_eq!(ValidationError::InvalidProtocol.code(), "invalid_protocol");
        assert_eq!(ValidationError::InvalidStatus.code(), "invalid_status");
    }

    #[test]
    fn store_error_not_found_code() {
        let id = crate::id::RecordingId::generate();
        assert_eq!(StoreError::NotFound(id).code(), "not_found");
    }

    #[test]
    fn replay_error_codes_cover_all_spec_kinds() {
        assert_eq!(ReplayError::ReplayNotPaused.code(), "replay_not_paused");
        assert_eq!(ReplayError::ReplayNotPlaying.code(), "replay_not_playing");
        assert_eq!(ReplayError::MatchTimeout.code(), "match_timeout");
        assert_eq!(
            ReplayError::AdvanceNotAllowed.code(),
            "advance_not_allowed"
        );
    }
}
