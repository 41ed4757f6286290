use core::marker::PhantomData;

use log::{debug, trace, warn};

use super::Engine;
use super::state::SeriesStates;
use crate::SeriesId;
use crate::algebra::{
    ContinuousSummary, DiscreteSummary, Integrate, LinearFunction, PiecewiseFunction,
    Representation,
};
use crate::error::{RollupError, RollupResult};
use crate::series::{RawSample, SampleBuffer};
use crate::sink::{Sink, Writer};
use crate::time::{Resolution, ResolutionSet, TimeInterval, Timestamp};

/// Summary computed from scratch out of a window of raw samples
pub trait WindowAggregate: Representation {
    /// Summarize what `window` says about `bucket`
    fn aggregate(window: &SampleBuffer, bucket: TimeInterval) -> Self;
}

impl WindowAggregate for DiscreteSummary {
    fn aggregate(window: &SampleBuffer, bucket: TimeInterval) -> Self {
        DiscreteSummary::from_values(window.within(bucket).map(|s| s.value))
    }
}

impl WindowAggregate for ContinuousSummary {
    fn aggregate(window: &SampleBuffer, bucket: TimeInterval) -> Self {
        window
            .segments()
            .map(|(a, b)| {
                let f = LinearFunction::through(a, b);
                let segment = TimeInterval::new(a.timestamp, b.timestamp);
                ContinuousSummary::integrate(&f, bucket.clip(&segment))
            })
            .fold(ContinuousSummary::default(), |acc, piece| acc.merge(&piece))
    }
}

/// Raw windows of one series, one per resolution
struct WindowState {
    windows: Vec<(Resolution, SampleBuffer)>,
}

impl WindowState {
    fn seeded(resolutions: &ResolutionSet, first: RawSample) -> Self {
        let windows = resolutions
            .iter()
            .map(|&resolution| {
                let mut window = SampleBuffer::new();
                window.push(first);
                (resolution, window)
            })
            .collect();
        Self { windows }
    }

    fn last_timestamp(&self) -> Option<Timestamp> {
        self.windows
            .iter()
            .filter_map(|(_, window)| window.last())
            .map(|s| s.timestamp)
            .max()
    }
}

/// Append `sample` to `window` and summarize every bucket of `resolution` it closes
///
/// The first closed bucket sees the whole window. The window is then cut
/// down to the last two samples, which is all any later bucket needs.
fn advance<R: WindowAggregate>(
    resolution: Resolution,
    window: &mut SampleBuffer,
    sample: RawSample,
) -> Vec<(Timestamp, R)> {
    let Some(&last) = window.last() else {
        window.push(sample);
        return Vec::new();
    };
    window.push(sample);

    let mut bucket = resolution.bucket(last.timestamp);
    if sample.timestamp < bucket.to {
        return Vec::new();
    }

    let target = resolution.bucket(sample.timestamp);
    let mut closed = Vec::new();
    let mut trimmed = false;
    while bucket.from < target.from {
        closed.push((bucket.from, R::aggregate(window, bucket)));
        bucket = resolution.bucket(bucket.to);
        if !trimmed {
            window.reseed(&[last, sample]);
            trimmed = true;
        }
    }
    closed
}

/// Per-resolution batch engine
///
/// Every resolution is handled on its own: raw samples are buffered until a
/// bucket closes, then the bucket is aggregated from the buffer by `R`
/// (discrete values or pairwise linear segments). Resolutions need not be
/// multiples of each other.
///
/// After its first closed bucket a window holds only two samples, so memory
/// per series and resolution stays bounded by one bucket's worth of samples.
pub struct FlatEngine<R, S> {
    sink: S,
    states: SeriesStates<WindowState>,
    _representation: PhantomData<fn() -> R>,
}

impl<R: WindowAggregate, S: Sink> FlatEngine<R, S> {
    pub fn new(sink: S) -> Self {
        debug!("Flat engine over {:?}", sink.resolutions().steps());
        Self {
            sink,
            states: SeriesStates::new(),
            _representation: PhantomData,
        }
    }
}

impl<R: WindowAggregate, S: Sink> Engine for FlatEngine<R, S> {
    fn process(&self, id: SeriesId, sample: RawSample) -> RollupResult<()> {
        let Some(state) = self
            .states
            .existing_or_seed(id, || WindowState::seeded(self.sink.resolutions(), sample))
        else {
            return Ok(());
        };
        let mut state = state.lock();

        if let Some(previous) = state.last_timestamp()
            && sample.timestamp < previous
        {
            warn!(
                "Rejecting sample for series {}: {} precedes {}",
                id, sample.timestamp, previous
            );
            return Err(RollupError::OutOfOrder {
                id,
                previous,
                current: sample.timestamp,
            });
        }

        // All windows advance before the first write
        let closed: Vec<_> = state
            .windows
            .iter_mut()
            .map(|(resolution, window)| {
                (*resolution, advance::<R>(*resolution, window, sample))
            })
            .collect();

        let mut writer = self.sink.create_writer();
        for (resolution, buckets) in closed {
            for (bucket_start, summary) in buckets {
                trace!(
                    "Series {} closed {} bucket at {}",
                    id, resolution, bucket_start
                );
                writer.write(id, resolution, bucket_start, summary.into())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn resolutions(&self) -> &ResolutionSet {
        self.sink.resolutions()
    }

    fn clear(&self, id: SeriesId) -> bool {
        let removed = self.states.remove(id);
        if removed {
            debug!("Cleared sample windows of series {}", id);
        }
        removed
    }

    fn clear_all(&self) {
        debug!("Clearing sample windows of {} series", self.states.len());
        self.states.clear();
    }

    fn tracked_series(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Summary;
    use crate::engine::{ContinuousEngine, DiscreteEngine};
    use crate::sink::{Emission, MemorySink};
    use std::sync::Arc;

    /// 2023-11-14 22:00:00 UTC, hour aligned
    const HOUR: i64 = 1_699_999_200;

    fn res(step: u32) -> Resolution {
        Resolution::new(step).unwrap()
    }

    fn sink(steps: &[u32]) -> Arc<MemorySink> {
        Arc::new(MemorySink::new(ResolutionSet::from_steps(steps).unwrap()))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn continuous(emission: &Emission) -> ContinuousSummary {
        match emission.summary {
            Summary::Continuous(s) => s,
            Summary::Discrete(_) => panic!("Expected a continuous summary"),
        }
    }

    fn discrete(emission: &Emission) -> DiscreteSummary {
        match emission.summary {
            Summary::Discrete(s) => s,
            Summary::Continuous(_) => panic!("Expected a discrete summary"),
        }
    }

    #[test]
    fn test_discrete_bucket_from_raw_values() {
        let sink = sink(&[5]);
        let engine = DiscreteEngine::new(sink.clone());

        for (i, value) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            engine
                .process(1, RawSample::new(HOUR + i as i64 * 60, value))
                .unwrap();
        }
        assert!(sink.emissions().is_empty(), "Bucket still open");

        engine
            .process(1, RawSample::new(HOUR + 300, 100.0))
            .unwrap();

        let emitted = sink.emissions();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].bucket_start, HOUR);
        let s = discrete(&emitted[0]);
        assert_eq!(
            s.count(),
            5,
            "The closing sample belongs to the next bucket"
        );
        assert!(close(s.average(), 3.0));
        assert!(close(s.standard_deviation(), 1.5811388300841898));
    }

    #[test]
    fn test_continuous_bucket_from_segments() {
        let sink = sink(&[5]);
        let engine = ContinuousEngine::new(sink.clone());

        engine.process(1, RawSample::new(HOUR + 60, 60.0)).unwrap();
        engine
            .process(1, RawSample::new(HOUR + 180, 180.0))
            .unwrap();
        engine
            .process(1, RawSample::new(HOUR + 360, 360.0))
            .unwrap();

        let s = continuous(&sink.emissions()[0]);
        // Covered [60, 300) of the ramp value = second
        assert_eq!(s.duration(), 240.0);
        assert!(close(s.average(), 180.0));
        assert!(close(s.standard_deviation(), 240.0 / 12f64.sqrt()));
    }

    #[test]
    fn test_catch_up_emits_every_skipped_bucket() {
        let sink = sink(&[5]);
        let engine = ContinuousEngine::new(sink.clone());

        engine.process(1, RawSample::new(HOUR, 0.0)).unwrap();
        engine
            .process(1, RawSample::new(HOUR + 120, 120.0))
            .unwrap();
        // Jumps over four boundaries, landing inside [1200, 1500)
        engine
            .process(1, RawSample::new(HOUR + 1320, 1320.0))
            .unwrap();

        let emitted = sink.series(1, res(5));
        let starts: Vec<_> = emitted.iter().map(|e| e.bucket_start).collect();
        assert_eq!(starts, vec![HOUR, HOUR + 300, HOUR + 600, HOUR + 900]);

        for (i, emission) in emitted.iter().enumerate() {
            let s = continuous(emission);
            let midpoint = (i as f64) * 300.0 + 150.0;
            assert_eq!(s.duration(), 300.0, "Bucket {} should be fully covered", i);
            assert!(
                close(s.average(), midpoint),
                "Bucket {} average {}",
                i, s.average()
            );
        }

        // Next bucket resumes from the two retained samples
        engine
            .process(1, RawSample::new(HOUR + 1500, 1500.0))
            .unwrap();
        let s = continuous(sink.series(1, res(5)).last().unwrap());
        assert_eq!(s.duration(), 300.0);
        assert!(close(s.average(), 1350.0));
    }

    #[test]
    fn test_discrete_catch_up_skipped_buckets_are_empty() {
        let sink = sink(&[5]);
        let engine = DiscreteEngine::new(sink.clone());

        engine.process(1, RawSample::new(HOUR, 2.0)).unwrap();
        engine.process(1, RawSample::new(HOUR + 900, 8.0)).unwrap();

        let counts: Vec<_> = sink
            .series(1, res(5))
            .iter()
            .map(|e| discrete(e).count())
            .collect();
        assert_eq!(counts, vec![1, 0, 0]);
    }

    #[test]
    fn test_resolutions_aggregated_independently() {
        let sink = sink(&[5, 10]);
        let engine = DiscreteEngine::new(sink.clone());

        for minute in 0..=10 {
            engine
                .process(7, RawSample::new(HOUR + minute * 60, minute as f64))
                .unwrap();
        }

        let fives = sink.series(7, res(5));
        let tens = sink.series(7, res(10));
        assert_eq!(fives.len(), 2);
        assert_eq!(tens.len(), 1);
        assert!(close(discrete(&fives[1]).average(), 7.0));
        assert!(close(discrete(&tens[0]).average(), 4.5));
        assert_eq!(discrete(&tens[0]).count(), 10);
    }

    #[test]
    fn test_window_bounded_after_first_bucket() {
        let mut window = SampleBuffer::new();
        let five = res(5);

        window.push(RawSample::new(HOUR, 0.0));
        for minute in 1..5 {
            let sample = RawSample::new(HOUR + minute * 60, 1.0);
            let closed = advance::<DiscreteSummary>(five, &mut window, sample);
            assert!(closed.is_empty());
        }
        assert_eq!(window.len(), 5);

        let sample = RawSample::new(HOUR + 300, 1.0);
        let closed = advance::<DiscreteSummary>(five, &mut window, sample);
        assert_eq!(closed.len(), 1);
        assert_eq!(window.len(), 2, "Only the last two samples remain");
    }

    #[test]
    fn test_boundary_sample_adds_no_empty_segment() {
        let sink = sink(&[5]);
        let engine = ContinuousEngine::new(sink.clone());

        engine.process(1, RawSample::new(HOUR + 240, 1.0)).unwrap();
        engine.process(1, RawSample::new(HOUR + 300, 1.0)).unwrap();
        engine.process(1, RawSample::new(HOUR + 300, 1.0)).unwrap();
        engine.process(1, RawSample::new(HOUR + 600, 4.0)).unwrap();

        let emitted = sink.series(1, res(5));
        assert_eq!(emitted.len(), 2);
        let second = continuous(&emitted[1]);
        assert!(second.average().is_finite());
        assert!(close(second.average(), 2.5));
        assert_eq!(second.duration(), 300.0);
    }
}
