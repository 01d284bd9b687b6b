//! Autonomous drive loops for pure and synchronized replay. Triggered mode
//! has no autonomous loop; it's entirely driven by
//! [`super::ReplayController::advance`].

use std::sync::Arc;

use crate::error::ReplayError;
use crate::model::Direction;

use super::config::ReplayStatus;
use super::session::ReplaySession;
use super::timeline::server_only;

/// Free-running playback: server frames only, spaced by their recorded
/// inter-frame delay (scaled by `timing_scale`).
pub(crate) async fn run_pure(session: Arc<ReplaySession>) {
    let frames = server_only(&session.timeline);
    let mut prev_ms = 0u64;
    for (idx, tf) in frames.iter().enumerate() {
        if session.wait_while_paused().await {
            session.set_status(ReplayStatus::Aborted);
            return;
        }
        if idx > 0 && session.scaled_sleep(tf.relative_ms.saturating_sub(prev_ms)).await {
            session.set_status(ReplayStatus::Aborted);
            return;
        }
        if session.wait_while_paused().await {
            session.set_status(ReplayStatus::Aborted);
            return;
        }
        if let Err(message) = (session.send)(&tf.frame) {
            session.set_error(ReplayError::SendFailed(message));
            session.set_status(ReplayStatus::Aborted);
            return;
        }
        session.record_sent(1);
        session.advance_cursor(idx + 1);
        prev_ms = tf.relative_ms;
    }
    session.set_status(ReplayStatus::Complete);
}

/// Synchronized playback: every frame replays in order; a client-direction
/// frame blocks until a matching message arrives (or the wait times out).
pub(crate) async fn run_synchronized(session: Arc<ReplaySession>) {
    let mut match_rx = match session.match_rx.lock().take() {
        Some(rx) => rx,
        None => return,
    };
    let mut prev_ms = 0u64;

    for (idx, tf) in session.timeline.clone().iter().enumerate() {
        if session.wait_while_paused().await {
            session.set_status(ReplayStatus::Aborted);
            return;
        }

        match tf.direction {
            Direction::C2s => {
                session.set_status(ReplayStatus::Waiting);
                let timeout = tokio::time::sleep(std::time::Duration::from_millis(
                    session.config.timeout_ms,
                ));
                tokio::pin!(timeout);
                tokio::select! {
                    () = session.cancel.cancelled() => {
                        session.set_status(ReplayStatus::Aborted);
                        return;
                    }
                    received = match_rx.recv() => {
                        if received.is_none() {
                            session.set_status(ReplayStatus::Aborted);
                            return;
                        }
                        // v1 strict_matching semantics: mismatching bytes are
                        // accepted rather than rejected (see ReplayConfig docs).
                    }
                    () = &mut timeout => {
                        session.set_error(ReplayError::MatchTimeout);
                        session.set_status(ReplayStatus::Aborted);
                        return;
                    }
                }
                session.set_status(ReplayStatus::Playing);
            }
            Direction::S2c => {
                session.set_status(ReplayStatus::Playing);
                if idx > 0 && session.scaled_sleep(tf.relative_ms.saturating_sub(prev_ms)).await {
                    session.set_status(ReplayStatus::Aborted);
                    return;
                }
                if let Err(message) = (session.send)(&tf.frame) {
                    session.set_error(ReplayError::SendFailed(message));
                    session.set_status(ReplayStatus::Aborted);
                    return;
                }
                session.record_sent(1);
            }
        }
        session.advance_cursor(idx + 1);
        prev_ms = tf.relative_ms;
    }
    session.set_status(ReplayStatus::Complete);
}
