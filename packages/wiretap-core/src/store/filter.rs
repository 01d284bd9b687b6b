//! Listing filters and sort order for [`super::FileStore::list`].

use crate::model::{Protocol, Status};

/// Field to sort [`super::FileStore::list`] results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// `startTime`, descending by default.
    #[default]
    StartTime,
    Name,
    Size,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Descending
    }
}

/// Filter + pagination parameters for [`super::FileStore::list`].
///
/// Every field is an optional narrowing; an unset field passes everything
/// through. `limit == None` returns all matching results after `offset`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub protocol: Option<Protocol>,
    pub path_prefix: Option<String>,
    pub tag: Option<String>,
    pub status: Option<Status>,
    pub include_deleted: bool,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListFilter {
    #[must_use]
    pub fn matches(&self, summary: &crate::model::RecordingSummary) -> bool {
        if !self.include_deleted && summary.deleted {
            return false;
        }
        if let Some(protocol) = self.protocol {
            if summary.protocol != protocol {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            match &summary.path {
                Some(path) if path.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(tag) = &self.tag {
            if !summary.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if summary.status != status {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::RecordingId;
    use crate::model::{RecordingSummary, SyncStatus};
    use chrono::Utc;

    fn summary() -> RecordingSummary {
        RecordingSummary {
            id: RecordingId::generate(),
            protocol: Protocol::WebSocket,
            name: None,
            path: Some("/ws/chat".into()),
            status: Status::Complete,
            start_time: Utc::now(),
            duration_ms: 0,
            frame_count: 0,
            file_size_bytes: 0,
            tags: vec!["chat".into()],
            sync_status: SyncStatus::Local,
            deleted: false,
        }
    }

    #[test]
    fn excludes_deleted_unless_requested() {
        let mut s = summary();
        s.deleted = true;
        let filter = ListFilter::default();
        assert!(!filter.matches(&s));
        let filter = ListFilter {
            include_deleted: true,
            ..Default::default()
        };
        assert!(filter.matches(&s));
    }

    #[test]
    fn path_prefix_narrows_results() {
        let s = summary();
        let filter = ListFilter {
            path_prefix: Some("/ws".into()),
            ..Default::default()
        };
        assert!(filter.matches(&s));
        let filter = ListFilter {
            path_prefix: Some("/api".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&s));
    }

    #[test]
    fn tag_must_be_present() {
        let s = summary();
        let filter = ListFilter {
            tag: Some("missing".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&s));
    }
}
