//! Replay: plays a stored recording back to a live peer under one of three
//! timing disciplines (pure, synchronized, triggered).

mod config;
mod controller;
mod drive;
mod session;
mod timeline;

pub use config::{AdvanceRequest, AdvanceResponse, ReplayConfig, ReplayMode, ReplayStatus};
pub use controller::ReplayController;
pub use session::{ReplaySession, SendCallback};
pub use timeline::ReplayFrame;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use tempfile::{tempdir, TempDir};

    use crate::error::ReplayError;
    use crate::id::RecordingId;
    use crate::model::{Direction, Protocol, WsFrameInput};
    use crate::runtime::TokioSpawner;
    use crate::store::{FileStore, StorageConfig};

    use super::*;

    fn store() -> (Arc<FileStore>, TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::open(StorageConfig::new(dir.path())).unwrap());
        (store, dir)
    }

    fn record_ws_session(store: &FileStore) -> RecordingId {
        let session = store
            .start_recording(Protocol::WebSocket, Default::default())
            .unwrap();
        let id = session.id();
        store
            .append_websocket_frame(id, Direction::S2c, WsFrameInput::Text("hello".into()))
            .unwrap();
        store
            .append_websocket_frame(id, Direction::C2s, WsFrameInput::Text("hi".into()))
            .unwrap();
        store
            .append_websocket_frame(id, Direction::S2c, WsFrameInput::Text("bye".into()))
            .unwrap();
        store.complete_recording(id).unwrap();
        id
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pure_replay_sends_server_frames_only() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());

        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        let send: SendCallback = Arc::new(move |frame| {
            sink.lock().unwrap().push(frame.raw_bytes());
            Ok(())
        });

        let config = ReplayConfig::new(id, ReplayMode::Pure);
        let session = controller.start_replay(config, send).unwrap();

        for _ in 0..50 {
            if session.status() == ReplayStatus::Complete {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert_eq!(session.status(), ReplayStatus::Complete);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn triggered_replay_advances_by_count() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());

        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        let send: SendCallback = Arc::new(move |frame| {
            sink.lock().unwrap().push(frame.raw_bytes());
            Ok(())
        });

        let config = ReplayConfig::new(id, ReplayMode::Triggered);
        controller.start_replay(config, send).unwrap();

        let response = controller
            .advance(
                id,
                AdvanceRequest {
                    count: Some(1),
                    until: None,
                },
            )
            .unwrap();
        assert_eq!(response.frames_sent, 1);
        assert!(!response.complete);

        let response = controller
            .advance(
                id,
                AdvanceRequest {
                    count: Some(1),
                    until: None,
                },
            )
            .unwrap();
        assert_eq!(response.frames_sent, 1);
        assert!(response.complete);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn starting_replay_twice_is_rejected() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());
        let send: SendCallback = Arc::new(|_| Ok(()));

        controller
            .start_replay(ReplayConfig::new(id, ReplayMode::Triggered), send.clone())
            .unwrap();
        let err = controller
            .start_replay(ReplayConfig::new(id, ReplayMode::Triggered), send)
            .unwrap_err();
        assert!(matches!(err, ReplayError::ReplayAlreadyActive(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn synchronized_replay_waits_for_client_message() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());

        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        let send: SendCallback = Arc::new(move |frame| {
            sink.lock().unwrap().push(frame.raw_bytes());
            Ok(())
        });

        let mut config = ReplayConfig::new(id, ReplayMode::Synchronized);
        config.timeout_ms = 5_000;
        let session = controller.start_replay(config, send).unwrap();

        for _ in 0..25 {
            if session.status() == ReplayStatus::Waiting {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(session.status(), ReplayStatus::Waiting);
        assert_eq!(received.lock().unwrap().len(), 1);

        controller.receive_message(id, b"hi".to_vec()).unwrap();

        for _ in 0..50 {
            if session.status() == ReplayStatus::Complete {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(session.status(), ReplayStatus::Complete);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn synchronized_replay_aborts_on_match_timeout() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());
        let send: SendCallback = Arc::new(|_| Ok(()));

        let mut config = ReplayConfig::new(id, ReplayMode::Synchronized);
        config.timeout_ms = 30;
        let session = controller.start_replay(config, send).unwrap();

        for _ in 0..50 {
            if session.status() == ReplayStatus::Aborted {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(session.status(), ReplayStatus::Aborted);
        assert_eq!(
            session.last_error().as_deref(),
            Some("timed out waiting for a matching client message")
        );
    }

    #[tokio::test]
    async fn triggered_replay_advances_until_matching_bytes() {
        let (store, _dir) = store();
        let id = record_ws_session(&store);
        let controller = ReplayController::new(store, TokioSpawner::current());

        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        let send: SendCallback = Arc::new(move |frame| {
            sink.lock().unwrap().push(frame.raw_bytes());
            Ok(())
        });

        let config = ReplayConfig::new(id, ReplayMode::Triggered);
        controller.start_replay(config, send).unwrap();

        let response = controller
            .advance(
                id,
                AdvanceRequest {
                    count: None,
                    until: Some(b"bye".to_vec()),
                },
            )
            .unwrap();

        assert_eq!(response.frames_sent, 2);
        assert!(response.complete);
        assert_eq!(received.lock().unwrap().len(), 2);

        let tail = controller
            .advance(
                id,
                AdvanceRequest {
                    count: Some(1),
                    until: None,
                },
            )
            .unwrap();
        assert_eq!(tail.frames_sent, 0);
        assert!(tail.complete);
    }

    #[tokio::test]
    async fn synchronized_mode_rejects_sse_recordings() {
        let (store, _dir) = store();
        let session = store
            .start_recording(Protocol::Sse, Default::default())
            .unwrap();
        let id = session.id();
        store
            .append_sse_event(id, "msg".into(), "payload".into(), String::new(), None, None)
            .unwrap();
        store.complete_recording(id).unwrap();

        let controller = ReplayController::new(store, TokioSpawner::current());
        let send: SendCallback = Arc::new(|_| Ok(()));
        let err = controller
            .start_replay(ReplayConfig::new(id, ReplayMode::Synchronized), send)
            .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidReplayMode));
    }
}
