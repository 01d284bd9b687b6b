//! Wall-clock access as a single free function.
//!
//! Kept as a thin wrapper (rather than a trait/DI seam) because nothing in this
//! crate needs to fake time beyond what tests achieve by calling the model
//! mutators directly with explicit timestamps.

use chrono::{DateTime, Utc};

/// Returns the current time.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
