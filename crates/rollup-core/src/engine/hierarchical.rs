use core::marker::PhantomData;
use std::collections::HashMap;

use log::{debug, trace, warn};

use super::Engine;
use super::state::SeriesStates;
use crate::SeriesId;
use crate::algebra::{Integrate, PiecewiseFunction};
use crate::error::{RollupError, RollupResult};
use crate::series::RawSample;
use crate::sink::{Sink, Writer};
use crate::time::{Hierarchy, Resolution, ResolutionSet, TimeInterval};

/// Open accumulators of one series
struct CascadeState<R> {
    /// Partial summary of the open root bucket
    root: R,
    /// Partial summaries of open buckets above the root, filled on first cascade
    derived: HashMap<Resolution, R>,
    /// Previous sample, start of the next segment
    last: RawSample,
}

impl<R: Default> CascadeState<R> {
    fn new(first: RawSample) -> Self {
        Self {
            root: R::default(),
            derived: HashMap::new(),
            last: first,
        }
    }
}

/// Cascading engine
///
/// Each new sample yields a segment `F` from the previous sample. The segment
/// is integrated into the open root bucket, piece by piece where it spans
/// several root buckets. Every root bucket the sample closes is emitted and
/// then merged upward: into its children's accumulators, which close (and
/// cascade further) when the parent bucket ends on their own boundary.
///
/// Because merging is associative, a coarse bucket always equals the merge of
/// the finer buckets it is made of. Emissions for one sample go out finest
/// first.
///
/// The hierarchy root is accumulated even when it is not one of the sink's
/// resolutions, but only declared resolutions are written.
pub struct HierarchicalEngine<F, R, S> {
    sink: S,
    hierarchy: Hierarchy,
    states: SeriesStates<CascadeState<R>>,
    _function: PhantomData<fn() -> F>,
}

impl<F, R, S> HierarchicalEngine<F, R, S>
where
    F: PiecewiseFunction,
    R: Integrate<F>,
    S: Sink,
{
    pub fn new(sink: S) -> Self {
        let hierarchy = Hierarchy::derive(sink.resolutions());
        debug!(
            "Cascading engine over {:?}, root {}",
            sink.resolutions().steps(),
            hierarchy.root()
        );
        Self {
            sink,
            hierarchy,
            states: SeriesStates::new(),
            _function: PhantomData,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    fn emit(
        &self,
        writer: &mut S::Writer,
        id: SeriesId,
        resolution: Resolution,
        bucket: TimeInterval,
        summary: &R,
    ) -> RollupResult<()> {
        if !self.sink.resolutions().contains(resolution) {
            return Ok(());
        }
        trace!("Series {} closed {} bucket {}", id, resolution, bucket);
        writer.write(id, resolution, bucket.from, summary.clone().into())?;
        Ok(())
    }

    /// Merge the closed `parent` bucket into every child, closing those that end with it
    fn cascade(
        &self,
        writer: &mut S::Writer,
        id: SeriesId,
        state: &mut CascadeState<R>,
        parent: Resolution,
        parent_bucket: TimeInterval,
        closed: &R,
    ) -> RollupResult<()> {
        for &child in self.hierarchy.children(parent) {
            let accumulator = state.derived.entry(child).or_default();
            *accumulator = accumulator.merge(closed);

            let child_bucket = child.bucket(parent_bucket.from);
            if child_bucket.to == parent_bucket.to {
                let finished = core::mem::take(accumulator);
                self.emit(writer, id, child, child_bucket, &finished)?;
                self.cascade(writer, id, state, child, child_bucket, &finished)?;
            }
        }
        Ok(())
    }

    /// Integrate the segment ending at `sample` and emit every bucket it closes
    fn extend(
        &self,
        writer: &mut S::Writer,
        id: SeriesId,
        state: &mut CascadeState<R>,
        sample: RawSample,
    ) -> RollupResult<()> {
        let function = F::through(&state.last, &sample);
        let extension = TimeInterval::new(state.last.timestamp, sample.timestamp);
        let root = self.hierarchy.root();

        for bucket in root.buckets(extension) {
            let piece = R::integrate(&function, bucket.clip(&extension));
            state.root = state.root.merge(&piece);

            if bucket.to <= sample.timestamp {
                let closed = core::mem::take(&mut state.root);
                self.emit(writer, id, root, bucket, &closed)?;
                self.cascade(writer, id, state, root, bucket, &closed)?;
            }
        }
        Ok(())
    }
}

impl<F, R, S> Engine for HierarchicalEngine<F, R, S>
where
    F: PiecewiseFunction,
    R: Integrate<F>,
    S: Sink,
{
    fn process(&self, id: SeriesId, sample: RawSample) -> RollupResult<()> {
        let Some(state) = self
            .states
            .existing_or_seed(id, || CascadeState::new(sample))
        else {
            return Ok(());
        };
        let mut state = state.lock();

        let previous = state.last.timestamp;
        if sample.timestamp < previous {
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

        let mut writer = self.sink.create_writer();
        let outcome = self.extend(&mut writer, id, &mut state, sample);
        // The segment has been integrated either way
        state.last = sample;
        outcome?;

        writer.flush()?;
        Ok(())
    }

    fn resolutions(&self) -> &ResolutionSet {
        self.sink.resolutions()
    }

    fn clear(&self, id: SeriesId) -> bool {
        let removed = self.states.remove(id);
        if removed {
            debug!("Cleared cascade state of series {}", id);
        }
        removed
    }

    fn clear_all(&self) {
        debug!("Clearing cascade state of {} series", self.states.len());
        self.states.clear();
    }

    fn tracked_series(&self) -> usize {
        self.states.len()
    }
}
