//! `FileStore`: durable home for stream recordings, session coordinator, and
//! quota enforcer.
//!
//! Lock discipline (see module-level design notes in the crate root): the
//! active-session map is a [`DashMap`], which never holds a shard guard across
//! an `.await` or a nested acquisition of a [`Session`]'s own lock — a lookup
//! clones the `Arc<Session>` and drops the map guard immediately. Persistence
//! happens outside both locks; `Complete`/`MarkIncomplete` reacquire the map
//! only to remove the now-closed session after a successful write.

mod config;
mod filter;
mod redact;
mod session;
mod stats;

pub use config::StorageConfig;
pub use filter::{ListFilter, SortField, SortOrder};
pub use session::Session;
pub use stats::StoreStats;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::id::RecordingId;
use crate::model::{
    HttpRecording, Protocol, RecordingMetadata, RecordingSummary, StreamRecording,
};

const FILE_PREFIX: &str = "rec_";
const FILE_SUFFIX: &str = ".json";

/// Snapshot of an in-flight recording session, used for
/// [`FileStore::get_active_sessions`].
#[derive(Debug, Clone)]
pub struct ActiveSessionInfo {
    pub id: RecordingId,
    pub protocol: Protocol,
    pub path: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Export format for [`FileStore::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    /// v1 reuses the JSON representation verbatim.
    Yaml,
}

/// Durable, file-backed home for stream recordings.
///
/// One `FileStore` owns one data directory. Construction creates the
/// directory (owner-only permissions on Unix) if it doesn't already exist.
pub struct FileStore {
    config: StorageConfig,
    active: DashMap<RecordingId, Arc<Session>>,
    summary_cache: RwLock<HashMap<RecordingId, RecordingSummary>>,
}

impl FileStore {
    /// Opens (creating if needed) a file store rooted at `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory can't be created.
    pub fn open(config: StorageConfig) -> Result<Self, StoreError> {
        let config = config.normalized();
        std::fs::create_dir_all(&config.data_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&config.data_dir, perms)?;
        }
        Ok(Self {
            config,
            active: DashMap::new(),
            summary_cache: RwLock::new(HashMap::new()),
        })
    }

    fn path_for(&self, id: RecordingId) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    fn record_file_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.config.data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    fn used_bytes(&self) -> Result<u64, StoreError> {
        let mut total = 0u64;
        for path in self.record_file_paths()? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }

    fn persist(&self, recording: &mut StreamRecording) -> Result<u64, StoreError> {
        let json = serde_json::to_vec_pretty(&*recording)?;
        let len = json.len() as u64;
        recording.set_file_size(len);
        let json = serde_json::to_vec_pretty(&*recording)?;
        std::fs::write(self.path_for(recording.id), &json)?;
        Ok(len)
    }

    fn load_raw(&self, id: RecordingId) -> Result<StreamRecording, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        let bytes = std::fs::read(path)?;
        let recording: StreamRecording = serde_json::from_slice(&bytes)?;
        Ok(recording)
    }

    /// Distinguishes "never existed" from "was active, now closed" for
    /// operations addressed at a recording id with no active session.
    fn missing_session_error(&self, id: RecordingId) -> StoreError {
        if self.path_for(id).exists() {
            StoreError::NoActiveSession(id)
        } else {
            StoreError::NotFound(id)
        }
    }

    fn invalidate(&self, id: RecordingId) {
        self.summary_cache.write().remove(&id);
    }

    // -- session lifecycle -------------------------------------------------

    /// Starts a new recording session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFull`] if the store is at or over quota.
    pub fn start_recording(
        &self,
        protocol: Protocol,
        mut metadata: RecordingMetadata,
    ) -> Result<Arc<Session>, StoreError> {
        if self.used_bytes()? >= self.config.max_bytes {
            return Err(StoreError::StorageFull);
        }
        redact::redact_headers(
            &mut metadata.headers,
            &self.config.filter_headers,
            &self.config.redact_value,
        );
        let recording = StreamRecording::start(protocol, metadata);
        let id = recording.id;
        let session = Arc::new(Session::new(recording));
        self.active.insert(id, session.clone());
        self.summary_cache.write().clear();
        Ok(session)
    }

    fn active_session(&self, id: RecordingId) -> Result<Arc<Session>, StoreError> {
        self.active
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| self.missing_session_error(id))
    }

    /// Appends a captured WebSocket frame to an open session.
    pub fn append_websocket_frame(
        &self,
        id: RecordingId,
        direction: crate::model::Direction,
        input: crate::model::WsFrameInput,
    ) -> Result<(), StoreError> {
        let session = self.active_session(id)?;
        let now = crate::clock::now();
        let mut guard = session.recording.lock();
        guard
            .add_websocket_frame(direction, input, now)
            .map_err(|_| StoreError::NoActiveSession(id))?;
        Ok(())
    }

    /// Appends a WebSocket close frame and records close metadata.
    pub fn append_websocket_close_frame(
        &self,
        id: RecordingId,
        direction: crate::model::Direction,
        code: Option<u16>,
        reason: Option<String>,
    ) -> Result<(), StoreError> {
        let session = self.active_session(id)?;
        let now = crate::clock::now();
        let mut guard = session.recording.lock();
        guard
            .set_websocket_close(direction, code, reason, now)
            .map_err(|_| StoreError::NoActiveSession(id))?;
        Ok(())
    }

    /// Appends a captured SSE event to an open session.
    #[allow(clippy::too_many_arguments)]
    pub fn append_sse_event(
        &self,
        id: RecordingId,
        event_type: String,
        data: String,
        event_id: String,
        retry_ms: Option<u64>,
        comment: Option<String>,
    ) -> Result<(), StoreError> {
        let session = self.active_session(id)?;
        let now = crate::clock::now();
        let mut guard = session.recording.lock();
        guard
            .add_sse_event(event_type, data, event_id, retry_ms, comment, now)
            .map_err(|_| StoreError::NoActiveSession(id))?;
        Ok(())
    }

    /// Marks the SSE stream as ended by the remote peer.
    pub fn mark_sse_stream_end(&self, id: RecordingId) -> Result<(), StoreError> {
        let session = self.active_session(id)?;
        let now = crate::clock::now();
        let mut guard = session.recording.lock();
        guard
            .set_sse_end(now)
            .map_err(|_| StoreError::NoActiveSession(id))?;
        Ok(())
    }

    /// Appends a captured HTTP request/response pair to an open HTTP session,
    /// redacting headers and (if configured) JSON body keys on the way in.
    pub fn append_http_recording(
        &self,
        id: RecordingId,
        mut recording: HttpRecording,
    ) -> Result<(), StoreError> {
        let session = self.active_session(id)?;
        redact::redact_headers(
            &mut recording.request_headers,
            &self.config.filter_headers,
            &self.config.redact_value,
        );
        redact::redact_headers(
            &mut recording.response_headers,
            &self.config.filter_headers,
            &self.config.redact_value,
        );
        if !self.config.filter_body_keys.is_empty() {
            recording.request_body = redact::redact_body_json(
                &recording.request_body,
                &self.config.filter_body_keys,
                &self.config.redact_value,
            );
            recording.response_body = redact::redact_body_json(
                &recording.response_body,
                &self.config.filter_body_keys,
                &self.config.redact_value,
            );
        }
        let now = crate::clock::now();
        let mut guard = session.recording.lock();
        let crate::model::ProtocolPayload::Http(http) = &mut guard.payload else {
            return Err(StoreError::NoActiveSession(id));
        };
        http.recordings.push(recording);
        guard.updated_at = now;
        Ok(())
    }

    fn finish(&self, id: RecordingId, incomplete: bool) -> Result<StreamRecording, StoreError> {
        let session = self.active_session(id)?;
        let now = crate::clock::now();
        let mut snapshot = {
            let mut guard = session.recording.lock();
            if incomplete {
                guard.mark_incomplete(now);
            } else {
                guard.complete(now);
            }
            guard.clone()
        };

        match self.persist(&mut snapshot) {
            Ok(_) => {
                self.active.remove(&id);
                self.invalidate(id);
                Ok(snapshot)
            }
            Err(err) => {
                let mut guard = session.recording.lock();
                guard.status = crate::model::Status::Recording;
                guard.end_time = None;
                Err(err)
            }
        }
    }

    /// Completes a session: persists it to disk and removes it from the
    /// active-session set. If persistence fails, the session is reverted to
    /// `recording` status and left open so the caller can retry.
    pub fn complete_recording(&self, id: RecordingId) -> Result<StreamRecording, StoreError> {
        self.finish(id, false)
    }

    /// Like [`Self::complete_recording`] but the terminal status is `incomplete`.
    pub fn mark_incomplete(&self, id: RecordingId) -> Result<StreamRecording, StoreError> {
        self.finish(id, true)
    }

    /// Drops an open session without persisting it.
    pub fn cancel_recording(&self, id: RecordingId) -> Result<(), StoreError> {
        self.active
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| self.missing_session_error(id))
    }

    // -- reads ---------------------------------------------------------------

    /// Loads and validates a recording by id.
    ///
    /// Returns [`StoreError::NotFound`] if no file exists for `id`. If
    /// structural validation fails, the recording is still returned (with
    /// `status` forced to `corrupted`) alongside [`StoreError::Corrupted`].
    pub fn get(&self, id: RecordingId) -> Result<StreamRecording, StoreError> {
        let mut recording = self.load_raw(id)?;
        if let Err(_validation) = recording.validate() {
            recording.mark_corrupted(crate::clock::now());
            return Err(StoreError::Corrupted(Box::new(recording)));
        }
        Ok(recording)
    }

    fn summary_for(&self, path: &Path, id: RecordingId) -> Option<RecordingSummary> {
        if let Some(cached) = self.summary_cache.read().get(&id) {
            return Some(cached.clone());
        }
        let bytes = std::fs::read(path).ok()?;
        let mut recording: StreamRecording = serde_json::from_slice(&bytes).ok()?;
        if recording.validate().is_err() {
            recording.mark_corrupted(crate::clock::now());
        }
        let summary = recording.to_summary();
        self.summary_cache.write().insert(id, summary.clone());
        Some(summary)
    }

    /// Lists recording summaries matching `filter`, sorted and paginated.
    ///
    /// Files that fail to parse are skipped. Returns the page plus the total
    /// count of matches before pagination.
    pub fn list(&self, filter: &ListFilter) -> Result<(Vec<RecordingSummary>, usize), StoreError> {
        let mut summaries = Vec::new();
        for path in self.record_file_paths()? {
            let Some(id) = id_from_path(&path) else {
                continue;
            };
            if let Some(summary) = self.summary_for(&path, id) {
                if filter.matches(&summary) {
                    summaries.push(summary);
                }
            }
        }

        summaries.sort_by(|a, b| {
            let ordering = match filter.sort_field {
                SortField::StartTime => a.start_time.cmp(&b.start_time),
                SortField::Name => a.name.cmp(&b.name),
                SortField::Size => a.file_size_bytes.cmp(&b.file_size_bytes),
            };
            match filter.sort_order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        let total = summaries.len();
        let page: Vec<RecordingSummary> = summaries
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok((page, total))
    }

    /// Soft-deletes a recording: marks it deleted and rewrites the file; the
    /// file itself remains on disk until [`Self::vacuum`].
    pub fn delete(&self, id: RecordingId) -> Result<(), StoreError> {
        let mut recording = self.load_raw(id)?;
        recording.soft_delete(crate::clock::now());
        self.persist(&mut recording)?;
        self.invalidate(id);
        Ok(())
    }

    /// Irrecoverably removes a recording's file from disk.
    pub fn purge(&self, id: RecordingId) -> Result<(), StoreError> {
        std::fs::remove_file(self.path_for(id))?;
        self.invalidate(id);
        Ok(())
    }

    /// Updates a recording's name/description/tags metadata in place.
    pub fn update(
        &self,
        id: RecordingId,
        name: Option<String>,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<StreamRecording, StoreError> {
        let mut recording = self.load_raw(id)?;
        if let Some(name) = name {
            recording.name = Some(name);
        }
        if let Some(description) = description {
            recording.description = Some(description);
        }
        if let Some(tags) = tags {
            recording.tags = tags;
        }
        recording.updated_at = crate::clock::now();
        self.persist(&mut recording)?;
        self.invalidate(id);
        Ok(recording)
    }

    /// Purges every soft-deleted recording. Returns `(removed, freed_bytes)`.
    pub fn vacuum(&self) -> Result<(usize, u64), StoreError> {
        let mut removed = 0usize;
        let mut freed = 0u64;
        for path in self.record_file_paths()? {
            let Some(id) = id_from_path(&path) else {
                continue;
            };
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            let Ok(recording) = serde_json::from_slice::<StreamRecording>(&bytes) else {
                continue;
            };
            if recording.deleted {
                freed += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                std::fs::remove_file(&path)?;
                self.invalidate(id);
                removed += 1;
            }
        }
        Ok((removed, freed))
    }

    /// Returns aggregate storage statistics over non-deleted recordings.
    pub fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let used_bytes = self.used_bytes()?;
        let mut counts_per_protocol: BTreeMap<Protocol, usize> = BTreeMap::new();
        let mut recording_count = 0usize;
        let mut oldest: Option<(RecordingId, DateTime<Utc>)> = None;
        let mut newest: Option<(RecordingId, DateTime<Utc>)> = None;

        for path in self.record_file_paths()? {
            let Some(id) = id_from_path(&path) else {
                continue;
            };
            let Some(summary) = self.summary_for(&path, id) else {
                continue;
            };
            if summary.deleted {
                continue;
            }
            recording_count += 1;
            *counts_per_protocol.entry(summary.protocol).or_insert(0) += 1;
            if oldest.as_ref().map_or(true, |(_, t)| summary.start_time < *t) {
                oldest = Some((id, summary.start_time));
            }
            if newest.as_ref().map_or(true, |(_, t)| summary.start_time > *t) {
                newest = Some((id, summary.start_time));
            }
        }

        let used_percent = if self.config.max_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / self.config.max_bytes as f64) * 100.0
        };

        Ok(StoreStats {
            used_bytes,
            max_bytes: self.config.max_bytes,
            used_percent,
            recording_count,
            counts_per_protocol,
            oldest,
            newest,
        })
    }

    /// Snapshots every currently open (in-memory, unpersisted) session.
    pub fn get_active_sessions(&self) -> Vec<ActiveSessionInfo> {
        self.active
            .iter()
            .map(|entry| {
                let recording = entry.value().snapshot();
                ActiveSessionInfo {
                    id: recording.id,
                    protocol: recording.protocol(),
                    path: recording.metadata.path.clone(),
                    started_at: recording.start_time,
                }
            })
            .collect()
    }

    /// Finds an already-open session on the same path and protocol, letting
    /// the proxy coalesce repeated upgrades instead of starting a duplicate.
    pub fn get_active_session_for_path(
        &self,
        path: &str,
        protocol: Protocol,
    ) -> Option<Arc<Session>> {
        self.active.iter().find_map(|entry| {
            let recording = entry.value().snapshot();
            if recording.protocol() == protocol && recording.metadata.path.as_deref() == Some(path)
            {
                Some(entry.value().clone())
            } else {
                None
            }
        })
    }

    /// Serializes a recording to the requested export format.
    pub fn export(&self, id: RecordingId, format: ExportFormat) -> Result<String, StoreError> {
        let recording = match self.get(id) {
            Ok(r) => r,
            Err(StoreError::Corrupted(r)) => *r,
            Err(e) => return Err(e),
        };
        match format {
            ExportFormat::Json | ExportFormat::Yaml => {
                Ok(serde_json::to_string_pretty(&recording)?)
            }
        }
    }

    /// Reports whether a new recording may be started, with an optional
    /// non-fatal warning when usage is above `warnPercent`.
    pub fn can_record(&self) -> Result<(bool, Option<String>), StoreError> {
        let used = self.used_bytes()?;
        if used >= self.config.max_bytes {
            return Ok((false, Some("storage limit exceeded".to_string())));
        }
        let percent = (used as f64 / self.config.max_bytes as f64) * 100.0;
        if percent >= f64::from(self.config.warn_percent) {
            return Ok((
                true,
                Some(format!("storage at {percent:.0}% of configured quota")),
            ));
        }
        Ok((true, None))
    }
}

fn id_from_path(path: &Path) -> Option<RecordingId> {
    let name = path.file_name()?.to_str()?;
    let trimmed = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, WsFrameInput};

    fn store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(StorageConfig::new(dir.path())).unwrap();
        (store, dir)
    }

    #[test]
    fn start_append_complete_round_trips_through_disk() {
        let (store, _dir) = store();
        let session = store
            .start_recording(Protocol::WebSocket, RecordingMetadata::default())
            .unwrap();
        let id = session.id();
        store
            .append_websocket_frame(id, Direction::S2c, WsFrameInput::Text("hello".into()))
            .unwrap();
        store
            .append_websocket_frame(id, Direction::C2s, WsFrameInput::Text("hi".into()))
            .unwrap();
        let completed = store.complete_recording(id).unwrap();
        assert_eq!(completed.stats.frame_count, 2);

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.id, completed.id);
        assert_eq!(loaded.stats.frame_count, 2);
    }

    #[test]
    fn complete_twice_is_no_active_session_on_second_call() {
        let (store, _dir) = store();
        let session = store
            .start_recording(Protocol::Sse, RecordingMetadata::default())
            .unwrap();
        let id = session.id();
        store.complete_recording(id).unwrap();
        let err = store.complete_recording(id).unwrap_err();
        assert!(matches!(err, StoreError::NoActiveSession(_)));
    }

    #[test]
    fn complete_on_unknown_id_is_not_found() {
        let (store, _dir) = store();
        let err = store.complete_recording(RecordingId::generate()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn start_recording_redacts_configured_headers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(StorageConfig::new(dir.path())).unwrap();
        let mut metadata = RecordingMetadata::default();
        metadata
            .headers
            .insert("Authorization".to_string(), vec!["Bearer secret".to_string()]);
        let session = store.start_recording(Protocol::Http, metadata).unwrap();
        let snapshot = session.snapshot();
        assert_eq!(
            snapshot.metadata.headers["Authorization"],
            vec!["[REDACTED]".to_string()]
        );
    }

    #[test]
    fn storage_quota_rejects_start_recording_once_full() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::new(dir.path());
        config.max_bytes = 500;
        let store = FileStore::open(config).unwrap();

        let session = store
            .start_recording(Protocol::WebSocket, RecordingMetadata::default())
            .unwrap();
        let id = session.id();
        for i in 0..20 {
            store
                .append_websocket_frame(
                    id,
                    Direction::S2c,
                    WsFrameInput::Text("x".repeat(30) + &i.to_string()),
                )
                .unwrap();
        }
        store.complete_recording(id).unwrap();

        let err = store
            .start_recording(Protocol::WebSocket, RecordingMetadata::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageFull));
        let (allowed, message) = store.can_record().unwrap();
        assert!(!allowed);
        assert_eq!(message.as_deref(), Some("storage limit exceeded"));
    }

    #[test]
    fn soft_delete_and_vacuum() {
        let (store, _dir) = store();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let session = store
                .start_recording(Protocol::Sse, RecordingMetadata::default())
                .unwrap();
            let id = session.id();
            store.complete_recording(id).unwrap();
            ids.push(id);
        }

        store.delete(ids[0]).unwrap();

        let (visible, total) = store.list(&ListFilter::default()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(visible.len(), 2);

        let (all, total_all) = store
            .list(&ListFilter {
                include_deleted: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total_all, 3);
        assert_eq!(all.len(), 3);

        let (removed, freed) = store.vacuum().unwrap();
        assert_eq!(removed, 1);
        assert!(freed > 0);

        let (final_list, final_total) = store.list(&ListFilter::default()).unwrap();
        assert_eq!(final_total, 2);
        assert_eq!(final_list.len(), 2);
    }

    #[test]
    fn cancel_recording_leaves_no_file_behind() {
        let (store, _dir) = store();
        let session = store
            .start_recording(Protocol::WebSocket, RecordingMetadata::default())
            .unwrap();
        let id = session.id();
        store.cancel_recording(id).unwrap();
        assert!(matches!(store.get(id).unwrap_err(), StoreError::NotFound(_)));
    }

    #[test]
    fn get_active_session_for_path_finds_matching_open_session() {
        let (store, _dir) = store();
        let mut metadata = RecordingMetadata::default();
        metadata.path = Some("/ws/chat".to_string());
        let session = store
            .start_recording(Protocol::WebSocket, metadata)
            .unwrap();

        let found = store
            .get_active_session_for_path("/ws/chat", Protocol::WebSocket)
            .unwrap();
        assert_eq!(found.id(), session.id());
        assert!(store
            .get_active_session_for_path("/ws/other", Protocol::WebSocket)
            .is_none());
    }

    #[test]
    fn get_stats_counts_non_deleted_recordings_by_protocol() {
        let (store, _dir) = store();
        let ws = store
            .start_recording(Protocol::WebSocket, RecordingMetadata::default())
            .unwrap();
        store.complete_recording(ws.id()).unwrap();
        let sse = store
            .start_recording(Protocol::Sse, RecordingMetadata::default())
            .unwrap();
        store.complete_recording(sse.id()).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.recording_count, 2);
        assert_eq!(stats.counts_per_protocol[&Protocol::WebSocket], 1);
        assert_eq!(stats.counts_per_protocol[&Protocol::Sse], 1);
    }
}
