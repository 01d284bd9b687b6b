//! Replay configuration and the status/advance types shared across modes.

use crate::id::RecordingId;

const DEFAULT_TIMING_SCALE: f64 = 1.0;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// The three replay timing disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Free-running: server frames are sent at their recorded inter-frame
    /// delay, scaled by `timing_scale`.
    Pure,
    /// All frames replay in order; client-direction frames block on a
    /// matching client message before the next server frame is sent.
    Synchronized,
    /// Server frames are only sent in response to an explicit `Advance` call.
    Triggered,
}

/// Parameters for [`super::ReplayController::start_replay`].
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub recording_id: RecordingId,
    pub mode: ReplayMode,
    /// `1.0` plays back at recorded speed; delays are divided by this value
    /// (`delta_ms / timing_scale`, per spec.md §4.4's pure-mode formula), so
    /// `0.5` *doubles* each delay (half speed) and `2.0` halves each delay
    /// (double speed).
    pub timing_scale: f64,
    /// Synchronized-mode client-wait timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Synchronized mode: require byte-identical client messages.
    ///
    /// v1 semantics: mismatching bytes are accepted and the replay continues
    /// rather than rejecting. A future version may reject or skip instead;
    /// this flag is stored and exposed today so that change doesn't need a
    /// new field.
    pub strict_matching: bool,
    /// Triggered mode: send the first server frame immediately on start.
    pub auto_advance_on_connect: bool,
    /// Triggered mode: a sentinel client message can also advance playback.
    ///
    /// v1 semantics: stored and exposed but not yet consumed. Triggered
    /// replay only drives server-only frames (there is no recorded client
    /// frame for an in-band sentinel to match against), so advancing is
    /// driven exclusively through [`super::ReplayController::advance`] today.
    pub in_band_trigger: bool,
}

impl ReplayConfig {
    #[must_use]
    pub fn new(recording_id: RecordingId, mode: ReplayMode) -> Self {
        Self {
            recording_id,
            mode,
            timing_scale: DEFAULT_TIMING_SCALE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            strict_matching: false,
            auto_advance_on_connect: false,
            in_band_trigger: false,
        }
    }
}

/// Live status of a [`super::ReplaySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    Playing,
    Paused,
    /// Synchronized mode only: blocked waiting for a matching client message.
    Waiting,
    Complete,
    Aborted,
}

/// A request to advance a triggered-mode replay.
#[derive(Debug, Clone, Default)]
pub struct AdvanceRequest {
    /// Send up to this many server frames. Defaults to 1 when `until` is unset.
    pub count: Option<usize>,
    /// Send frames up to and including the first whose raw bytes equal this.
    pub until: Option<Vec<u8>>,
}

/// The result of one `Advance` call.
#[derive(Debug, Clone)]
pub struct AdvanceResponse {
    pub frames_sent: usize,
    pub current_frame: usize,
    pub total_frames: usize,
    pub status: ReplayStatus,
    pub complete: bool,
}
