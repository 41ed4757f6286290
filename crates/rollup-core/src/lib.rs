//! Multiresolution rollups for streaming numeric time series
//!
//! For every series id this crate keeps statistical summaries (average and
//! standard deviation) at several bucket widths at once, e.g. 5, 15 and 60
//! minutes. Coarser buckets are always consistent with the finer buckets
//! beneath them.
//!
//! Two summary families are available:
//!
//! - **Discrete**: mean and sample standard deviation over raw values.
//! - **Continuous**: mean and standard deviation of the piecewise-linear
//!   interpolation of the signal, integrated exactly over each bucket.
//!
//! And two ways of producing them:
//!
//! - [`engine::HierarchicalEngine`] integrates each new segment into the
//!   finest ("root") bucket and cascades closed buckets up the resolution
//!   hierarchy by merging.
//! - [`engine::FlatEngine`] keeps a short raw window per resolution and
//!   re-aggregates it whenever a bucket closes.
//!
//! Closed buckets are handed to a [`sink::Sink`].
//!
//! ```rust,ignore
//! use rollup_core::prelude::*;
//!
//! let sink = Arc::new(MemorySink::new(ResolutionSet::from_steps(&[5, 15, 60])?));
//! let engine = RepresentationKind::Hierarchical.build(sink.clone());
//!
//! engine.process(7, RawSample::new(1_700_000_000, 21.5))?;
//! engine.process(7, RawSample::new(1_700_000_060, 21.7))?;
//! ```

pub mod algebra;
pub mod config;
pub mod engine;
pub mod error;
pub mod series;
pub mod sink;
pub mod time;

pub use error::{RollupError, RollupResult};

/// Identifier of one raw sample stream
pub type SeriesId = u32;

/// Commonly used types, re-exported for convenience
pub mod prelude {
    pub use crate::SeriesId;
    pub use crate::algebra::{
        ContinuousSummary, DiscreteSummary, LinearFunction, Representation, Statistic,
        StatisticKind, Summary,
    };
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, FlatEngine, HierarchicalEngine, RepresentationKind};
    pub use crate::error::{RollupError, RollupResult};
    pub use crate::series::{RawSample, SampleBuffer};
    pub use crate::sink::{MemorySink, PostcardSink, Sink, SinkError, Writer};
    pub use crate::time::{Resolution, ResolutionSet, TimeInterval, Timestamp};
    pub use std::sync::Arc;
}
