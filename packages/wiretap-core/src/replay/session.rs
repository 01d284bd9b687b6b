//! [`ReplaySession`]: the live state of one in-progress playback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::ReplayError;
use crate::id::RecordingId;

use super::config::{ReplayConfig, ReplayMode, ReplayStatus};
use super::timeline::{ReplayFrame, TimedFrame};

/// Callback the proxy installs to deliver a frame to the connected peer.
/// Invoked synchronously; a returned error is terminal for the replay.
pub type SendCallback = Arc<dyn Fn(&ReplayFrame) -> Result<(), String> + Send + Sync>;

const MATCH_CHANNEL_CAPACITY: usize = 8;

/// The live state of one in-progress replay.
pub struct ReplaySession {
    pub(crate) recording_id: RecordingId,
    pub(crate) config: ReplayConfig,
    pub(crate) timeline: Vec<TimedFrame>,
    pub(crate) send: SendCallback,
    status: Mutex<ReplayStatus>,
    last_error: Mutex<Option<ReplayError>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) resume_notify: Notify,
    match_tx: mpsc::Sender<Vec<u8>>,
    pub(crate) match_rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    frames_sent: AtomicUsize,
    current_frame: AtomicUsize,
    started_at: Instant,
}

impl ReplaySession {
    pub(crate) fn new(
        recording_id: RecordingId,
        config: ReplayConfig,
        timeline: Vec<TimedFrame>,
        send: SendCallback,
    ) -> Self {
        let (match_tx, match_rx) = mpsc::channel(MATCH_CHANNEL_CAPACITY);
        Self {
            recording_id,
            config,
            timeline,
            send,
            status: Mutex::new(ReplayStatus::Playing),
            last_error: Mutex::new(None),
            cancel: CancellationToken::new(),
            resume_notify: Notify::new(),
            match_tx,
            match_rx: Mutex::new(Some(match_rx)),
            frames_sent: AtomicUsize::new(0),
            current_frame: AtomicUsize::new(0),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn recording_id(&self) -> RecordingId {
        self.recording_id
    }

    #[must_use]
    pub fn mode(&self) -> ReplayMode {
        self.config.mode
    }

    #[must_use]
    pub fn status(&self) -> ReplayStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: ReplayStatus) {
        *self.status.lock() = status;
    }

    pub(crate) fn set_error(&self, err: ReplayError) {
        *self.last_error.lock() = Some(err);
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().as_ref().map(ToString::to_string)
    }

    /// Milliseconds elapsed since the replay started, computed live rather
    /// than from a cached value.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.current_frame.load(Ordering::SeqCst)
    }

    pub(crate) fn record_sent(&self, count: usize) {
        self.frames_sent.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn advance_cursor(&self, to: usize) {
        self.current_frame.store(to, Ordering::SeqCst);
    }

    pub(crate) fn cursor(&self) -> usize {
        self.current_frame.load(Ordering::SeqCst)
    }

    /// Deposits a client message onto the match channel for synchronized-mode
    /// waits. Non-blocking: a full channel silently drops the message.
    pub fn receive_message(&self, bytes: Vec<u8>) {
        let _ = self.match_tx.try_send(bytes);
    }

    pub fn pause(&self) -> Result<(), ReplayError> {
        let mut status = self.status.lock();
        if *status != ReplayStatus::Playing {
            return Err(ReplayError::ReplayNotPlaying);
        }
        *status = ReplayStatus::Paused;
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ReplayError> {
        let mut status = self.status.lock();
        if *status != ReplayStatus::Paused {
            return Err(ReplayError::ReplayNotPaused);
        }
        *status = ReplayStatus::Playing;
        drop(status);
        self.resume_notify.notify_waiters();
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        self.set_status(ReplayStatus::Aborted);
    }

    pub(crate) async fn wait_while_paused(&self) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return true;
            }
            if self.status() != ReplayStatus::Paused {
                return false;
            }
            tokio::select! {
                () = self.cancel.cancelled() => return true,
                () = self.resume_notify.notified() => {}
            }
        }
    }

    /// Sleeps for `duration`, scaled by `config.timing_scale`, returning
    /// `true` if cancellation was observed instead.
    pub(crate) async fn scaled_sleep(&self, duration_ms: u64) -> bool {
        let scaled = (duration_ms as f64 / self.config.timing_scale).max(0.0).round() as u64;
        if scaled == 0 {
            return self.cancel.is_cancelled();
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(scaled)) => false,
            () = self.cancel.cancelled() => true,
        }
    }
}
