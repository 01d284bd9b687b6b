//! Lightweight recording projection used for listing without full deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RecordingId;

use super::recording::{Protocol, Status, SyncStatus};

/// A listing-friendly projection of a [`super::StreamRecording`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub id: RecordingId,
    pub protocol: Protocol,
    pub name: Option<String>,
    pub path: Option<String>,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub frame_count: u64,
    pub file_size_bytes: u64,
    pub tags: Vec<String>,
    pub sync_status: SyncStatus,
    pub deleted: bool,
}
