//! Bridges live protocol capture into a [`FileStore`] session without
//! blocking the data path, and fans notifications out to auxiliary listeners.
//!
//! Grounded on the teacher's `events::emitter`/`events::bridge` split: a
//! trait the data path depends on, a concrete implementation that forwards
//! into a shared sink, and a fan-out manager that tolerates one listener
//! failing without cancelling delivery to the rest.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::id::RecordingId;
use crate::model::{Direction, RecordingMetadata, WsFrameInput};
use crate::store::FileStore;

/// Lifecycle state shared by both hook kinds.
///
/// ```text
/// fresh ──OnFrame─→ active ──OnComplete─→ completed (terminal)
///                        ╰──OnError────→ errored   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookState {
    Fresh,
    Active,
    Completed,
    Errored,
}

impl HookState {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }
}

/// Common surface every recording hook exposes, independent of protocol.
pub trait RecordingHook: Send + Sync {
    /// The recording id this hook is attached to.
    fn id(&self) -> RecordingId;

    /// Finalizes the recording as `complete`. Idempotent: calling this again
    /// after a terminal state is reached is a no-op that returns `Ok(())`.
    fn on_complete(&self) -> Result<(), StoreError>;

    /// Reports a capture-side failure. Absorbed internally: the recording is
    /// marked `incomplete` and the error is not propagated to the caller, so
    /// a failing hook never blocks the live data path.
    fn on_error(&self, message: &str);
}

/// Hook surface for WebSocket capture.
pub trait WebSocketHook: RecordingHook {
    /// Records the negotiated subprotocol, if any.
    fn on_connect(&self, subprotocol: Option<String>);

    /// Appends a captured frame. Returns [`StoreError::NoActiveSession`] once
    /// the hook has reached a terminal state.
    fn on_frame(&self, direction: Direction, input: WsFrameInput) -> Result<(), StoreError>;

    /// Appends a close frame and records close metadata.
    fn on_close(&self, code: Option<u16>, reason: Option<String>) -> Result<(), StoreError>;
}

/// Hook surface for Server-Sent Event capture.
pub trait SseHook: RecordingHook {
    /// Marks the stream as having started (no recording-level effect beyond logging).
    fn on_stream_start(&self);

    /// Appends a captured event. Returns [`StoreError::NoActiveSession`] once
    /// the hook has reached a terminal state.
    fn on_frame(
        &self,
        event_type: String,
        data: String,
        event_id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
    ) -> Result<(), StoreError>;

    /// Marks the stream as ended by the remote peer.
    fn on_stream_end(&self) -> Result<(), StoreError>;
}

/// [`WebSocketHook`] backed by a [`FileStore`] session.
pub struct FileStoreWebSocketHook {
    store: Arc<FileStore>,
    id: RecordingId,
    state: RwLock<HookState>,
}

impl FileStoreWebSocketHook {
    /// Starts a new WebSocket recording session on `store` and returns a hook
    /// bound to it.
    pub fn new(store: Arc<FileStore>, metadata: RecordingMetadata) -> Result<Self, StoreError> {
        let session = store.start_recording(crate::model::Protocol::WebSocket, metadata)?;
        Ok(Self {
            store,
            id: session.id(),
            state: RwLock::new(HookState::Fresh),
        })
    }
}

impl RecordingHook for FileStoreWebSocketHook {
    fn id(&self) -> RecordingId {
        self.id
    }

    fn on_complete(&self) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state.is_terminal() {
            return Ok(());
        }
        self.store.complete_recording(self.id)?;
        *state = HookState::Completed;
        Ok(())
    }

    fn on_error(&self, message: &str) {
        let mut state = self.state.write();
        if state.is_terminal() {
            return;
        }
        tracing::warn!(recording_id = %self.id, error = message, "websocket capture error");
        if let Err(err) = self.store.mark_incomplete(self.id) {
            tracing::warn!(recording_id = %self.id, %err, "failed to mark recording incomplete");
        }
        *state = HookState::Errored;
    }
}

impl WebSocketHook for FileStoreWebSocketHook {
    fn on_connect(&self, subprotocol: Option<String>) {
        tracing::debug!(recording_id = %self.id, ?subprotocol, "websocket connected");
    }

    fn on_frame(&self, direction: Direction, input: WsFrameInput) -> Result<(), StoreError> {
        {
            let mut state = self.state.write();
            if state.is_terminal() {
                return Err(StoreError::NoActiveSession(self.id));
            }
            *state = HookState::Active;
        }
        self.store.append_websocket_frame(self.id, direction, input)
    }

    fn on_close(&self, code: Option<u16>, reason: Option<String>) -> Result<(), StoreError> {
        {
            let state = self.state.read();
            if state.is_terminal() {
                return Err(StoreError::NoActiveSession(self.id));
            }
        }
        self.store
            .append_websocket_close_frame(self.id, Direction::S2c, code, reason)
    }
}

/// [`SseHook`] backed by a [`FileStore`] session.
pub struct FileStoreSseHook {
    store: Arc<FileStore>,
    id: RecordingId,
    state: RwLock<HookState>,
}

impl FileStoreSseHook {
    /// Starts a new SSE recording session on `store` and returns a hook bound
    /// to it.
    pub fn new(store: Arc<FileStore>, metadata: RecordingMetadata) -> Result<Self, StoreError> {
        let session = store.start_recording(crate::model::Protocol::Sse, metadata)?;
        Ok(Self {
            store,
            id: session.id(),
            state: RwLock::new(HookState::Fresh),
        })
    }
}

impl RecordingHook for FileStoreSseHook {
    fn id(&self) -> RecordingId {
        self.id
    }

    fn on_complete(&self) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state.is_terminal() {
            return Ok(());
        }
        self.store.complete_recording(self.id)?;
        *state = HookState::Completed;
        Ok(())
    }

    fn on_error(&self, message: &str) {
        let mut state = self.state.write();
        if state.is_terminal() {
            return;
        }
        tracing::warn!(recording_id = %self.id, error = message, "sse capture error");
        if let Err(err) = self.store.mark_incomplete(self.id) {
            tracing::warn!(recording_id = %self.id, %err, "failed to mark recording incomplete");
        }
        *state = HookState::Errored;
    }
}

impl SseHook for FileStoreSseHook {
    fn on_stream_start(&self) {
        tracing::debug!(recording_id = %self.id, "sse stream started");
    }

    fn on_frame(
        &self,
        event_type: String,
        data: String,
        event_id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
    ) -> Result<(), StoreError> {
        {
            let mut state = self.state.write();
            if state.is_terminal() {
                return Err(StoreError::NoActiveSession(self.id));
            }
            *state = HookState::Active;
        }
        self.store
            .append_sse_event(self.id, event_type, data, event_id, retry_ms, comment)
    }

    fn on_stream_end(&self) -> Result<(), StoreError> {
        {
            let state = self.state.read();
            if state.is_terminal() {
                return Err(StoreError::NoActiveSession(self.id));
            }
        }
        self.store.mark_sse_stream_end(self.id)
    }
}

/// Fans WebSocket notifications out to every attached hook. A failure from
/// one hook does not cancel delivery to the rest; the last observed error (if
/// any) is returned to the caller.
#[derive(Default)]
pub struct WebSocketHookManager {
    hooks: RwLock<Vec<Arc<dyn WebSocketHook>>>,
}

impl WebSocketHookManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, hook: Arc<dyn WebSocketHook>) {
        self.hooks.write().push(hook);
    }

    pub fn notify_connect(&self, subprotocol: Option<String>) {
        for hook in self.hooks.read().iter() {
            hook.on_connect(subprotocol.clone());
        }
    }

    pub fn notify_frame(&self, direction: Direction, input: WsFrameInput) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_frame(direction, input.clone()) {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_close(&self, code: Option<u16>, reason: Option<String>) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_close(code, reason.clone()) {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_complete(&self) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_complete() {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_error(&self, message: &str) {
        for hook in self.hooks.read().iter() {
            hook.on_error(message);
        }
    }
}

/// Fans SSE notifications out to every attached hook, same contract as
/// [`WebSocketHookManager`].
#[derive(Default)]
pub struct SseHookManager {
    hooks: RwLock<Vec<Arc<dyn SseHook>>>,
}

impl SseHookManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, hook: Arc<dyn SseHook>) {
        self.hooks.write().push(hook);
    }

    pub fn notify_stream_start(&self) {
        for hook in self.hooks.read().iter() {
            hook.on_stream_start();
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn notify_frame(
        &self,
        event_type: String,
        data: String,
        event_id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
    ) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_frame(
                event_type.clone(),
                data.clone(),
                event_id.clone(),
                retry_ms,
                comment.clone(),
            ) {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_stream_end(&self) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_stream_end() {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_complete(&self) -> Result<(), StoreError> {
        let mut last_err = None;
        for hook in self.hooks.read().iter() {
            if let Err(err) = hook.on_complete() {
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    pub fn notify_error(&self, message: &str) {
        for hook in self.hooks.read().iter() {
            hook.on_error(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageConfig;

    fn store() -> (Arc<FileStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(StorageConfig::new(dir.path())).unwrap());
        (store, dir)
    }

    #[test]
    fn websocket_hook_appends_frames_until_completed() {
        let (store, _dir) = store();
        let hook = FileStoreWebSocketHook::new(store.clone(), RecordingMetadata::default()).unwrap();
        hook.on_frame(Direction::S2c, WsFrameInput::Text("hi".into())).unwrap();
        hook.on_complete().unwrap();

        let err = hook
            .on_frame(Direction::S2c, WsFrameInput::Text("late".into()))
            .unwrap_err();
        assert!(matches!(err, StoreError::NoActiveSession(_)));

        // idempotent
        hook.on_complete().unwrap();
    }

    #[test]
    fn on_error_marks_incomplete_and_blocks_further_frames() {
        let (store, _dir) = store();
        let hook = FileStoreSseHook::new(store.clone(), RecordingMetadata::default()).unwrap();
        let id = hook.id();
        hook.on_frame("message".into(), "{}".into(), "1".into(), None, None)
            .unwrap();
        hook.on_error("connection reset");

        let err = hook
            .on_frame("message".into(), "{}".into(), "2".into(), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoActiveSession(_)));

        let recording = store.get(id).unwrap();
        assert_eq!(recording.status, crate::model::Status::Incomplete);
    }

    #[test]
    fn manager_fans_out_and_tolerates_one_failing_hook() {
        let (store, _dir) = store();
        let manager = WebSocketHookManager::new();
        let good = Arc::new(FileStoreWebSocketHook::new(store.clone(), RecordingMetadata::default()).unwrap());
        manager.attach(good.clone());

        // A second hook pointing at an already-completed session fails but
        // must not prevent the first hook from receiving the frame.
        let other = Arc::new(FileStoreWebSocketHook::new(store.clone(), RecordingMetadata::default()).unwrap());
        other.on_complete().unwrap();
        manager.attach(other);

        let result = manager.notify_frame(Direction::S2c, WsFrameInput::Text("x".into()));
        assert!(result.is_err());

        let recording = good.store.get_active_sessions();
        assert_eq!(recording.len(), 1);
        assert_eq!(recording[0].id, good.id());
    }
}
