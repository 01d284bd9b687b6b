//! Recording identifiers.
//!
//! Recordings are named with a 26-character Crockford-base32 ULID: lexicographically
//! sortable, time-prefixed, and collision-resistant under concurrent generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A 26-character lexicographically sortable time-prefixed recording identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordingId(Ulid);

impl RecordingId {
    /// Generates a fresh id, prefixed with the current time.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// The all-zero ULID, used as a placeholder when an on-disk id fails to
    /// parse; never produced by [`Self::generate`].
    #[must_use]
    pub(crate) fn nil() -> Self {
        Self(Ulid::nil())
    }

    /// Milliseconds since the Unix epoch embedded in the id's time component.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Returns the id as its canonical 26-character string form.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string fails to parse as a [`RecordingId`].
#[derive(Debug, thiserror::Error)]
#[error("invalid ULID: {0}")]
pub struct InvalidRecordingId(String);

impl FromStr for RecordingId {
    type Err = InvalidRecordingId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|_| InvalidRecordingId(s.to_string()))
    }
}

impl Serialize for RecordingId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
