//! Time model: timestamps, half-open intervals, resolutions and their hierarchy

mod hierarchy;
mod resolution;

pub use hierarchy::Hierarchy;
pub use resolution::{Buckets, MAX_RESOLUTIONS, Resolution, ResolutionSet};

use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch (UTC)
pub type Timestamp = i64;

/// Seconds in one minute
pub const SECS_PER_MINUTE: i64 = 60;

/// Seconds in one UTC day
pub const SECS_PER_DAY: i64 = 86_400;

/// Half-open time range `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Inclusive start
    pub from: Timestamp,
    /// Exclusive end
    pub to: Timestamp,
}

impl TimeInterval {
    pub const fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Intersection with `other` as `[max(from), min(to))`
    ///
    /// Disjoint intervals produce an interval whose `to` does not exceed its
    /// `from`; check [`TimeInterval::is_empty`] before integrating over it.
    pub fn clip(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval {
            from: self.from.max(other.from),
            to: self.to.min(other.to),
        }
    }

    /// Length of the interval in seconds (negative for inverted intervals)
    pub const fn duration_secs(&self) -> i64 {
        self.to - self.from
    }

    /// True when the interval covers no time at all
    pub const fn is_empty(&self) -> bool {
        self.to <= self.from
    }

    pub const fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.from && timestamp < self.to
    }
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_overlapping() {
        let a = TimeInterval::new(0, 100);
        let b = TimeInterval::new(40, 160);

        assert_eq!(a.clip(&b), TimeInterval::new(40, 100));
        assert_eq!(b.clip(&a), TimeInterval::new(40, 100));
    }

    #[test]
    fn test_clip_disjoint_is_empty() {
        let a = TimeInterval::new(0, 100);
        let b = TimeInterval::new(200, 300);

        assert!(a.clip(&b).is_empty(), "Disjoint clip must be empty");
    }

    #[test]
    fn test_contains_is_half_open() {
        let interval = TimeInterval::new(10, 20);

        assert!(interval.contains(10));
        assert!(interval.contains(19));
        assert!(!interval.contains(20));
        assert_eq!(interval.duration_secs(), 10);
    }
}
