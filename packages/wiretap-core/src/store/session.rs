//! In-progress recording session handle.

use parking_lot::Mutex;

use crate::id::RecordingId;
use crate::model::StreamRecording;

/// An in-progress recording, exclusively owned by the [`super::FileStore`]
/// that created it until `Complete`/`MarkIncomplete`/`Cancel` closes it.
///
/// Per the design note on session-handle ownership, callers outside this
/// crate only ever see an `Arc<Session>` and should treat its contents as
/// read-only; mutation happens through `FileStore` methods that hold the
/// correct lock in the correct order.
pub struct Session {
    pub(crate) id: RecordingId,
    pub(crate) recording: Mutex<StreamRecording>,
}

impl Session {
    pub(crate) fn new(recording: StreamRecording) -> Self {
        Self {
            id: recording.id,
            recording: Mutex::new(recording),
        }
    }

    /// The recording id this session is capturing.
    #[must_use]
    pub fn id(&self) -> RecordingId {
        self.id
    }

    /// A snapshot of the recording as it stands right now.
    #[must_use]
    pub fn snapshot(&self) -> StreamRecording {
        self.recording.lock().clone()
    }
}
