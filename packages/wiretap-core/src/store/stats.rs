//! Aggregate storage statistics returned by [`super::FileStore::get_stats`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::id::RecordingId;
use crate::model::Protocol;

/// Snapshot of storage usage and recording counts.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub used_bytes: u64,
    pub max_bytes: u64,
    pub used_percent: f64,
    pub recording_count: usize,
    pub counts_per_protocol: BTreeMap<Protocol, usize>,
    pub oldest: Option<(RecordingId, DateTime<Utc>)>,
    pub newest: Option<(RecordingId, DateTime<Utc>)>,
}
