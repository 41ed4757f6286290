//! Streaming aggregation engines and the factory selecting one
//!
//! Both engines share the same calling contract:
//!
//! - `process` is called once per raw sample, per series, in timestamp order.
//!   An older timestamp is rejected with [`RollupError::OutOfOrder`].
//! - Calls for different series may run concurrently from any thread; calls
//!   for the same series are serialized by a per-series lock.
//! - The first sample of a series never emits anything.
//! - Every closed bucket is written exactly once, then the writer is flushed
//!   once per call. Sink failures are returned as-is; buckets closed before
//!   the failure are not rolled back.
//!
//! [`RollupError::OutOfOrder`]: crate::RollupError::OutOfOrder

mod flat;
mod hierarchical;
mod state;

pub use flat::{FlatEngine, WindowAggregate};
pub use hierarchical::HierarchicalEngine;

use core::fmt::Display;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SeriesId;
use crate::algebra::{ContinuousSummary, DiscreteSummary, LinearFunction};
use crate::error::{RollupError, RollupResult};
use crate::series::RawSample;
use crate::sink::Sink;
use crate::time::ResolutionSet;

/// Flat engine over raw values
pub type DiscreteEngine<S> = FlatEngine<DiscreteSummary, S>;

/// Flat engine over pairwise linear segments
pub type ContinuousEngine<S> = FlatEngine<ContinuousSummary, S>;

/// Cascading engine over linear segments
pub type CascadingEngine<S> = HierarchicalEngine<LinearFunction, ContinuousSummary, S>;

/// Object-safe interface shared by every engine
pub trait Engine: Send + Sync {
    /// Ingest one sample of series `id`
    fn process(&self, id: SeriesId, sample: RawSample) -> RollupResult<()>;

    /// The resolutions this engine emits
    fn resolutions(&self) -> &ResolutionSet;

    /// Forget all state of `id`; its next sample is treated as its first
    fn clear(&self, id: SeriesId) -> bool;

    /// Forget the state of every series
    fn clear_all(&self);

    /// Number of series with live state
    fn tracked_series(&self) -> usize;
}

/// Which summary family and strategy an engine uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepresentationKind {
    /// Discrete mean/stddev, each resolution re-aggregated from raw samples
    Discrete,
    /// Continuous mean/stddev, each resolution re-aggregated from linear segments
    Continuous,
    /// Continuous mean/stddev, cascaded up the resolution hierarchy by merging
    #[default]
    Hierarchical,
}

impl RepresentationKind {
    /// Every representation, in declaration order
    pub const ALL: [RepresentationKind; 3] = [Self::Discrete, Self::Continuous, Self::Hierarchical];

    /// Short label for command lines and logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::Discrete => "discrete",
            Self::Continuous => "continuous",
            Self::Hierarchical => "hierarchical",
        }
    }

    /// Descriptive name
    pub const fn full_name(self) -> &'static str {
        match self {
            Self::Discrete => "Multiresolution discrete piecewise statistical approximation",
            Self::Continuous => "Multiresolution piecewise-linear statistical approximation",
            Self::Hierarchical => {
                "Hierarchical multiresolution piecewise-linear statistical approximation"
            }
        }
    }

    /// Construct the matching engine, aggregating exactly `sink`'s resolutions
    pub fn build<S: Sink + 'static>(self, sink: S) -> Box<dyn Engine> {
        match self {
            Self::Discrete => Box::new(DiscreteEngine::new(sink)),
            Self::Continuous => Box::new(ContinuousEngine::new(sink)),
            Self::Hierarchical => Box::new(CascadingEngine::new(sink)),
        }
    }
}

impl FromStr for RepresentationKind {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| RollupError::UnknownRepresentation {
                label: s.to_string(),
            })
    }
}

impl Display for RepresentationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::sync::Arc;

    #[test]
    fn test_labels_round_trip() {
        for kind in RepresentationKind::ALL {
            assert_eq!(kind.label().parse::<RepresentationKind>().unwrap(), kind);
        }
        assert!(matches!(
            "psa".parse::<RepresentationKind>(),
            Err(RollupError::UnknownRepresentation { .. })
        ));
    }

    #[test]
    fn test_build_preserves_sink_resolutions() {
        let set = ResolutionSet::from_steps(&[10, 15]).unwrap();
        for kind in RepresentationKind::ALL {
            let sink = Arc::new(MemorySink::new(set.clone()));
            let engine = kind.build(sink);
            assert_eq!(engine.resolutions(), &set, "{kind} changed resolutions");
        }
    }

    #[test]
    fn test_first_sample_never_emits() {
        let set = ResolutionSet::from_steps(&[5, 15, 60]).unwrap();
        for kind in RepresentationKind::ALL {
            let sink = Arc::new(MemorySink::new(set.clone()));
            let engine = kind.build(sink.clone());

            engine
                .process(1, RawSample::new(1_700_000_000, 4.0))
                .unwrap();

            assert!(sink.emissions().is_empty(), "{} emitted too early", kind);
            assert_eq!(engine.tracked_series(), 1);
        }
    }

    #[test]
    fn test_out_of_order_rejected() {
        let set = ResolutionSet::from_steps(&[5]).unwrap();
        for kind in RepresentationKind::ALL {
            let sink = Arc::new(MemorySink::new(set.clone()));
            let engine = kind.build(sink.clone());

            engine.process(3, RawSample::new(1000, 1.0)).unwrap();
            let err = engine.process(3, RawSample::new(999, 1.0)).unwrap_err();
            assert!(matches!(
                err,
                RollupError::OutOfOrder {
                    id: 3,
                    previous: 1000,
                    current: 999
                }
            ));
            assert_eq!(sink.flush_count(), 0, "{} touched the sink", kind);
        }
    }

    #[test]
    fn test_clear_restarts_series() {
        let set = ResolutionSet::from_steps(&[5]).unwrap();
        for kind in RepresentationKind::ALL {
            let sink = Arc::new(MemorySink::new(set.clone()));
            let engine = kind.build(sink.clone());

            engine.process(1, RawSample::new(0, 1.0)).unwrap();
            engine.process(2, RawSample::new(0, 1.0)).unwrap();
            assert!(engine.clear(1));
            assert!(!engine.clear(1));
            assert_eq!(engine.tracked_series(), 1);

            // A restarted series may go back in time
            engine.process(1, RawSample::new(-600, 1.0)).unwrap();
            assert!(sink.emissions().is_empty());

            engine.clear_all();
            assert_eq!(engine.tracked_series(), 0);
        }
    }

    #[test]
    fn test_sink_failure_propagates() {
        for kind in RepresentationKind::ALL {
            let sink = test_support::failing_sink(&[5]);
            let engine = kind.build(sink);

            engine.process(1, RawSample::new(0, 1.0)).unwrap();
            let err = engine.process(1, RawSample::new(600, 3.0)).unwrap_err();

            match err {
                RollupError::Sink(crate::sink::SinkError::Rejected { failed, .. }) => {
                    assert_eq!(failed.len(), 2, "{} should have lost two buckets", kind);
                }
                other => panic!("Expected sink failure, got {:?}", other),
            }
        }
    }
}
