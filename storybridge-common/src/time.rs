//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Format used in run artifact file names (`migration-20250101T120000Z.log`)
pub const ARTIFACT_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp for use in artifact file names
pub fn artifact_stamp(at: DateTime<Utc>) -> String {
    at.format(ARTIFACT_STAMP_FORMAT).to_string()
}

/// Whole milliseconds in a duration, saturating at u64::MAX
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
