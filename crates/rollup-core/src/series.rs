//! Raw samples and the per-resolution sample buffer used by the flat engine

use core::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::time::{TimeInterval, Timestamp};

/// One timestamped reading of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Seconds since epoch
    pub timestamp: Timestamp,
    pub value: f64,
}

impl RawSample {
    pub const fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl Display for RawSample {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[RawSample] timestamp: {}, value: {:.4}",
            self.timestamp, self.value
        )
    }
}

/// Append-only, time-ordered run of samples for one series and resolution
///
/// Samples are moved in on [`SampleBuffer::push`] and never shared between
/// buffers. The buffer only grows until the owner trims it with
/// [`SampleBuffer::reseed`].
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<RawSample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: RawSample) {
        self.samples.push(sample);
    }

    pub fn first(&self) -> Option<&RawSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&RawSample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, RawSample> {
        self.samples.iter()
    }

    /// Consecutive sample pairs, oldest first
    pub fn segments(&self) -> impl Iterator<Item = (&RawSample, &RawSample)> {
        self.samples.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Samples whose timestamp lies in `[interval.from, interval.to)`
    pub fn within(&self, interval: TimeInterval) -> impl Iterator<Item = &RawSample> {
        self.samples
            .iter()
            .skip_while(move |s| s.timestamp < interval.from)
            .take_while(move |s| s.timestamp < interval.to)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Replace the contents with exactly `samples`, keeping the allocation
    pub fn reseed(&mut self, samples: &[RawSample]) {
        self.samples.clear();
        self.samples.extend_from_slice(samples);
    }
}

impl<'a> IntoIterator for &'a SampleBuffer {
    type Item = &'a RawSample;
    type IntoIter = core::slice::Iter<'a, RawSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(timestamps: &[i64]) -> SampleBuffer {
        let mut buffer = SampleBuffer::new();
        for (i, &ts) in timestamps.iter().enumerate() {
            buffer.push(RawSample::new(ts, i as f64));
        }
        buffer
    }

    #[test]
    fn test_push_tracks_ends() {
        let buffer = buffer(&[10, 20, 30]);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.first().map(|s| s.timestamp), Some(10));
        assert_eq!(buffer.last().map(|s| s.timestamp), Some(30));
    }

    #[test]
    fn test_within_is_half_open() {
        let buffer = buffer(&[0, 100, 200, 300, 400]);
        let selected: Vec<_> = buffer
            .within(TimeInterval::new(100, 300))
            .map(|s| s.timestamp)
            .collect();

        assert_eq!(selected, vec![100, 200]);
    }

    #[test]
    fn test_segments() {
        let buffer = buffer(&[0, 60, 120]);
        let segments: Vec<_> = buffer
            .segments()
            .map(|(a, b)| (a.timestamp, b.timestamp))
            .collect();

        assert_eq!(segments, vec![(0, 60), (60, 120)]);
        assert_eq!(SampleBuffer::new().segments().count(), 0);
    }

    #[test]
    fn test_reseed_and_clear() {
        let mut buffer = buffer(&[0, 60, 120, 180]);
        let keep = [RawSample::new(120, 1.0), RawSample::new(180, 2.0)];

        buffer.reseed(&keep);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.first(), Some(&keep[0]));

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.last(), None);
    }
}
