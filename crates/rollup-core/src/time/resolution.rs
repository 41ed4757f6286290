use core::fmt::Display;
use core::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use super::{SECS_PER_DAY, SECS_PER_MINUTE, TimeInterval, Timestamp};
use crate::error::{RollupError, RollupResult};

/// Maximum number of distinct resolutions one engine aggregates
pub const MAX_RESOLUTIONS: usize = 16;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = (SECS_PER_DAY / SECS_PER_MINUTE) as u32;

/// Fixed-width, aligned time bucket identified by its step in minutes
///
/// Steps below an hour align within the hour (a 15 minute resolution yields
/// `:00`, `:15`, `:30`, `:45`); whole-hour steps align within the UTC day.
/// Either way a bucket never straddles the boundary it aligns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Resolution {
    step: u32,
}

impl Resolution {
    /// Create a resolution of `step` minutes
    ///
    /// The step must divide an hour, or be a whole number of hours that
    /// divides a day.
    pub fn new(step: u32) -> RollupResult<Self> {
        let within_hour = step > 0 && MINUTES_PER_HOUR.is_multiple_of(step);
        let whole_hours = step > 0
            && step.is_multiple_of(MINUTES_PER_HOUR)
            && MINUTES_PER_DAY.is_multiple_of(step);
        if !(within_hour || whole_hours) {
            return Err(RollupError::InvalidStep { step });
        }
        Ok(Self { step })
    }

    /// Step in minutes
    pub const fn step(self) -> u32 {
        self.step
    }

    /// Bucket width in seconds
    pub const fn span_secs(self) -> i64 {
        self.step as i64 * SECS_PER_MINUTE
    }

    /// True when buckets of `self` are an exact union of buckets of `finer`
    pub const fn is_multiple_of(self, finer: Resolution) -> bool {
        self.step > finer.step && self.step.is_multiple_of(finer.step)
    }

    /// The bucket containing `timestamp`
    pub fn bucket(self, timestamp: Timestamp) -> TimeInterval {
        let span = self.span_secs();
        let from = timestamp - timestamp.rem_euclid(span);
        TimeInterval::new(from, from + span)
    }

    /// Consecutive buckets exactly covering `range`
    ///
    /// The first and last bucket may extend past the ends of `range`; an
    /// empty range yields nothing.
    pub fn buckets(self, range: TimeInterval) -> Buckets {
        Buckets {
            resolution: self,
            cursor: range.from,
            end: range.to,
        }
    }
}

impl TryFrom<u32> for Resolution {
    type Error = RollupError;

    fn try_from(step: u32) -> Result<Self, Self::Error> {
        Self::new(step)
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> Self {
        resolution.step
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}min", self.step)
    }
}

/// Lazy, forward-only walk over the buckets of a range
#[derive(Debug, Clone)]
pub struct Buckets {
    resolution: Resolution,
    cursor: Timestamp,
    end: Timestamp,
}

impl Iterator for Buckets {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let bucket = self.resolution.bucket(self.cursor);
        self.cursor = bucket.to;
        Some(bucket)
    }
}

impl FusedIterator for Buckets {}

/// Validated set of distinct resolutions, kept in ascending step order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionSet {
    resolutions: heapless::Vec<Resolution, MAX_RESOLUTIONS>,
}

impl ResolutionSet {
    /// Build a set from resolutions, ignoring duplicates
    pub fn new(resolutions: impl IntoIterator<Item = Resolution>) -> RollupResult<Self> {
        let mut set = heapless::Vec::<Resolution, MAX_RESOLUTIONS>::new();
        for resolution in resolutions {
            if set.contains(&resolution) {
                continue;
            }
            set.push(resolution)
                .map_err(|_| RollupError::TooManyResolutions {
                    max: MAX_RESOLUTIONS,
                })?;
        }

        if set.is_empty() {
            return Err(RollupError::EmptyResolutions);
        }
        set.sort_unstable();

        Ok(Self { resolutions: set })
    }

    /// Build a set from raw steps in minutes
    pub fn from_steps(steps: &[u32]) -> RollupResult<Self> {
        let resolutions = steps
            .iter()
            .map(|&step| Resolution::new(step))
            .collect::<RollupResult<Vec<_>>>()?;
        Self::new(resolutions)
    }

    /// The resolution whose step is the greatest common divisor of all steps
    ///
    /// This need not be a member of the set: `{10, 15}` has root `5`.
    pub fn root(&self) -> Resolution {
        let step = self
            .resolutions
            .iter()
            .map(|r| r.step)
            .fold(0, gcd);
        // A gcd of day divisors is itself a day divisor
        Resolution { step }
    }

    pub fn contains(&self, resolution: Resolution) -> bool {
        self.resolutions.contains(&resolution)
    }

    pub fn as_slice(&self) -> &[Resolution] {
        &self.resolutions
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Resolution> {
        self.resolutions.iter()
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    /// Always false for a constructed set; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    /// Step values in ascending order
    pub fn steps(&self) -> Vec<u32> {
        self.resolutions.iter().map(|r| r.step).collect()
    }
}

impl<'a> IntoIterator for &'a ResolutionSet {
    type Item = &'a Resolution;
    type IntoIter = core::slice::Iter<'a, Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    a
}
