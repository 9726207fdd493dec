//! Sorted-set scores
//!
//! A score is the creation instant in seconds with millisecond precision.
//! It is carried as integer epoch milliseconds and only rendered as a decimal
//! (`secs.mmm`) at the Redis boundary, so the three-decimal truncation is
//! exact and both feeds order ties identically.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedScore(i64);

impl FeedScore {
    /// Lower bound used for "everything up to" range queries.
    pub const ZERO: FeedScore = FeedScore(0);

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FeedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:03}", sign, abs / 1000, abs % 1000)
    }
}

impl From<DateTime<Utc>> for FeedScore {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(&at)
    }
}
