use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Emission, Sink, SinkError, Writer};
use crate::SeriesId;
use crate::algebra::Summary;
use crate::time::{Resolution, ResolutionSet, Timestamp};

/// In-memory sink keeping emitted rollups in per-resolution ring buffers
///
/// With a retention limit the oldest rollup of a resolution is dropped once
/// its buffer is full. Without one, everything is kept.
///
/// ```rust,ignore
/// let sink = Arc::new(MemorySink::new(ResolutionSet::from_steps(&[5, 60])?));
/// let engine = HierarchicalEngine::<LinearFunction, ContinuousSummary, _>::new(sink.clone());
/// // ...
/// let hourly = sink.history(Resolution::new(60)?);
/// ```
#[derive(Debug)]
pub struct MemorySink {
    resolutions: ResolutionSet,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    retention: Option<usize>,
    tiers: Mutex<Tiers>,
    flushes: AtomicUsize,
}

#[derive(Debug, Default)]
struct Tiers {
    next_sequence: u64,
    by_resolution: HashMap<Resolution, VecDeque<(u64, Emission)>>,
}

impl MemorySink {
    /// Unbounded sink
    pub fn new(resolutions: ResolutionSet) -> Self {
        Self::build(resolutions, None)
    }

    /// Sink keeping at most `capacity` rollups per resolution
    pub fn with_retention(resolutions: ResolutionSet, capacity: usize) -> Self {
        Self::build(resolutions, Some(capacity))
    }

    fn build(resolutions: ResolutionSet, retention: Option<usize>) -> Self {
        Self {
            resolutions,
            shared: Arc::new(Shared {
                retention,
                tiers: Mutex::new(Tiers::default()),
                flushes: AtomicUsize::new(0),
            }),
        }
    }

    /// Every retained rollup, in commit order
    pub fn emissions(&self) -> Vec<Emission> {
        let tiers = self.shared.tiers.lock();
        let mut all: Vec<_> = tiers.by_resolution.values().flatten().copied().collect();
        all.sort_unstable_by_key(|(sequence, _)| *sequence);
        all.into_iter().map(|(_, emission)| emission).collect()
    }

    /// Retained rollups of one resolution, oldest first
    pub fn history(&self, resolution: Resolution) -> Vec<Emission> {
        self.shared
            .tiers
            .lock()
            .by_resolution
            .get(&resolution)
            .map(|tier| tier.iter().map(|(_, emission)| *emission).collect())
            .unwrap_or_default()
    }

    /// Retained rollups of one series at one resolution, oldest first
    pub fn series(&self, id: SeriesId, resolution: Resolution) -> Vec<Emission> {
        self.history(resolution)
            .into_iter()
            .filter(|emission| emission.id == id)
            .collect()
    }

    /// Number of flushes committed so far
    pub fn flush_count(&self) -> usize {
        self.shared.flushes.load(Ordering::Relaxed)
    }
}

impl Sink for MemorySink {
    type Writer = MemoryWriter;

    fn resolutions(&self) -> &ResolutionSet {
        &self.resolutions
    }

    fn create_writer(&self) -> Self::Writer {
        MemoryWriter {
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
        }
    }
}

/// Writer buffering rollups until flushed into its [`MemorySink`]
#[derive(Debug)]
pub struct MemoryWriter {
    shared: Arc<Shared>,
    pending: Vec<Emission>,
}

impl Writer for MemoryWriter {
    fn write(
        &mut self,
        id: SeriesId,
        resolution: Resolution,
        bucket_start: Timestamp,
        summary: Summary,
    ) -> Result<(), SinkError> {
        self.pending.push(Emission {
            id,
            resolution,
            bucket_start,
            summary,
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let mut tiers = self.shared.tiers.lock();
        for emission in self.pending.drain(..) {
            let sequence = tiers.next_sequence;
            tiers.next_sequence += 1;

            let tier = tiers.by_resolution.entry(emission.resolution).or_default();
            if let Some(capacity) = self.shared.retention {
                // Oldest is dropped when full
                while tier.len() >= capacity.max(1) {
                    tier.pop_front();
                }
            }
            tier.push_back((sequence, emission));
        }
        self.shared.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::DiscreteSummary;

    fn res(step: u32) -> Resolution {
        Resolution::new(step).unwrap()
    }

    fn summary(value: f64) -> Summary {
        DiscreteSummary::from_values([value]).into()
    }

    #[test]
    fn test_writes_invisible_until_flush() {
        let sink = MemorySink::new(ResolutionSet::from_steps(&[5]).unwrap());
        let mut writer = sink.create_writer();

        writer.write(1, res(5), 0, summary(1.0)).unwrap();
        assert!(sink.emissions().is_empty(), "Not committed yet");

        writer.flush().unwrap();
        assert_eq!(sink.emissions().len(), 1);
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn test_retention_drops_oldest() {
        let sink = MemorySink::with_retention(ResolutionSet::from_steps(&[5]).unwrap(), 2);
        let mut writer = sink.create_writer();

        for i in 0..4 {
            writer.write(1, res(5), i * 300, summary(i as f64)).unwrap();
        }
        writer.flush().unwrap();

        let starts: Vec<_> = sink
            .history(res(5))
            .iter()
            .map(|e| e.bucket_start)
            .collect();
        assert_eq!(starts, vec![600, 900]);
    }

    #[test]
    fn test_commit_order_across_resolutions() {
        let sink = MemorySink::new(ResolutionSet::from_steps(&[5, 15]).unwrap());
        let mut writer = sink.create_writer();

        writer.write(1, res(5), 600, summary(1.0)).unwrap();
        writer.write(1, res(15), 0, summary(2.0)).unwrap();
        writer.write(2, res(5), 600, summary(3.0)).unwrap();
        writer.flush().unwrap();

        let order: Vec<_> = sink
            .emissions()
            .iter()
            .map(|e| (e.id, e.resolution.step()))
            .collect();
        assert_eq!(order, vec![(1, 5), (1, 15), (2, 5)]);
        assert_eq!(sink.series(2, res(5)).len(), 1);
    }
}
