//! Timestamps for registration bookkeeping.

use chrono::{DateTime, Utc};

/// UTC timestamp recorded for catalog registration attempts.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
