//! [`ReplayController`]: loads recordings and drives playback sessions.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::ReplayError;
use crate::id::RecordingId;
use crate::model::Protocol;
use crate::runtime::TaskSpawner;
use crate::store::FileStore;

use super::config::{AdvanceRequest, AdvanceResponse, ReplayConfig, ReplayMode, ReplayStatus};
use super::drive::{run_pure, run_synchronized};
use super::session::{ReplaySession, SendCallback};
use super::timeline::{build_timeline, server_only};

/// Coordinates every live [`ReplaySession`], keyed by the recording they
/// replay. Loads recordings through a [`FileStore`] and spawns the
/// autonomous drive loop for pure/synchronized replays via a [`TaskSpawner`].
pub struct ReplayController<S: TaskSpawner> {
    store: Arc<FileStore>,
    spawner: S,
    sessions: DashMap<RecordingId, Arc<ReplaySession>>,
}

impl<S: TaskSpawner> ReplayController<S> {
    #[must_use]
    pub fn new(store: Arc<FileStore>, spawner: S) -> Self {
        Self {
            store,
            spawner,
            sessions: DashMap::new(),
        }
    }

    /// Loads the recording named in `config.recording_id` and begins a
    /// replay, installing `send` as the per-frame delivery callback.
    ///
    /// # Errors
    ///
    /// [`ReplayError::ReplayAlreadyActive`] if a replay is already running for
    /// this recording; [`ReplayError::RecordingNotFound`] if it doesn't exist
    /// or fails validation; [`ReplayError::InvalidReplayMode`] if the
    /// recording's protocol has no replayable frames (e.g. `http`), or if
    /// `Synchronized` mode is requested for a protocol with no client frames.
    pub fn start_replay(
        &self,
        config: ReplayConfig,
        send: SendCallback,
    ) -> Result<Arc<ReplaySession>, ReplayError> {
        if self.sessions.contains_key(&config.recording_id) {
            return Err(ReplayError::ReplayAlreadyActive(config.recording_id));
        }

        let recording = self
            .store
            .get(config.recording_id)
            .map_err(|_| ReplayError::RecordingNotFound(config.recording_id))?;

        if config.mode == ReplayMode::Synchronized && recording.protocol() != Protocol::WebSocket {
            return Err(ReplayError::InvalidReplayMode);
        }

        let timeline = build_timeline(&recording)?;
        let session = Arc::new(ReplaySession::new(
            config.recording_id,
            config.clone(),
            timeline,
            send,
        ));
        self.sessions.insert(config.recording_id, session.clone());

        match config.mode {
            ReplayMode::Pure => {
                let task_session = session.clone();
                self.spawner.spawn(async move {
                    run_pure(task_session).await;
                });
            }
            ReplayMode::Synchronized => {
                let task_session = session.clone();
                self.spawner.spawn(async move {
                    run_synchronized(task_session).await;
                });
            }
            ReplayMode::Triggered => {
                if config.auto_advance_on_connect {
                    let frames = server_only(&session.timeline);
                    if let Some(first) = frames.first() {
                        if let Err(message) = (session.send)(&first.frame) {
                            session.set_error(ReplayError::SendFailed(message.clone()));
                            session.set_status(ReplayStatus::Aborted);
                        } else {
                            session.record_sent(1);
                            session.advance_cursor(1);
                            if frames.len() == 1 {
                                session.set_status(ReplayStatus::Complete);
                            }
                        }
                    }
                }
            }
        }

        Ok(session)
    }

    /// Returns the live session for `id`, if one is active.
    #[must_use]
    pub fn session(&self, id: RecordingId) -> Option<Arc<ReplaySession>> {
        self.sessions.get(&id).map(|e| e.value().clone())
    }

    pub fn pause_replay(&self, id: RecordingId) -> Result<(), ReplayError> {
        self.require(id)?.pause()
    }

    pub fn resume_replay(&self, id: RecordingId) -> Result<(), ReplayError> {
        self.require(id)?.resume()
    }

    /// Cancels the session's context, marks it aborted, and unregisters it.
    pub fn stop_replay(&self, id: RecordingId) -> Result<(), ReplayError> {
        let session = self.require(id)?;
        session.stop();
        self.sessions.remove(&id);
        Ok(())
    }

    /// Deposits a client message for a synchronized-mode wait. Non-blocking.
    pub fn receive_message(&self, id: RecordingId, bytes: Vec<u8>) -> Result<(), ReplayError> {
        self.require(id)?.receive_message(bytes);
        Ok(())
    }

    /// Advances a triggered-mode replay by up to `request.count` frames, or
    /// until the first frame whose raw bytes equal `request.until`
    /// (inclusive), whichever is hit first.
    ///
    /// # Errors
    ///
    /// [`ReplayError::AdvanceNotAllowed`] if the session isn't in `Triggered`
    /// mode.
    pub fn advance(
        &self,
        id: RecordingId,
        request: AdvanceRequest,
    ) -> Result<AdvanceResponse, ReplayError> {
        let session = self.require(id)?;
        if session.mode() != ReplayMode::Triggered {
            return Err(ReplayError::AdvanceNotAllowed);
        }

        let frames = server_only(&session.timeline);
        let total_frames = frames.len();

        if session.status() == ReplayStatus::Complete {
            return Ok(AdvanceResponse {
                frames_sent: 0,
                current_frame: session.cursor(),
                total_frames,
                status: ReplayStatus::Complete,
                complete: true,
            });
        }

        let mut idx = session.cursor();
        let mut sent = 0usize;
        let unbounded = request.until.is_some() && request.count.is_none();
        let count_target = request.count.unwrap_or(if unbounded { usize::MAX } else { 1 });

        while idx < frames.len() {
            let tf = &frames[idx];
            if let Err(message) = (session.send)(&tf.frame) {
                session.set_error(ReplayError::SendFailed(message.clone()));
                session.set_status(ReplayStatus::Aborted);
                return Err(ReplayError::SendFailed(message));
            }
            sent += 1;
            idx += 1;

            let until_hit = request
                .until
                .as_ref()
                .is_some_and(|until| &tf.frame.raw_bytes() == until);
            if until_hit {
                break;
            }
            if sent >= count_target {
                break;
            }
        }

        session.record_sent(sent);
        session.advance_cursor(idx);
        let complete = idx >= frames.len();
        if complete {
            session.set_status(ReplayStatus::Complete);
        }

        Ok(AdvanceResponse {
            frames_sent: sent,
            current_frame: idx,
            total_frames,
            status: session.status(),
            complete,
        })
    }

    fn require(&self, id: RecordingId) -> Result<Arc<ReplaySession>, ReplayError> {
        self.sessions
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(ReplayError::ReplayNotFound(id))
    }
}
