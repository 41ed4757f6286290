//! Statistical summaries and the merge algebra behind them
//!
//! Every summary yields the same named statistics ([`StatisticKind::ALL`])
//! and merges associatively and commutatively with another summary of the
//! same kind. The default value of each summary is the merge identity.

mod continuous;
mod discrete;
mod linear;

pub use continuous::ContinuousSummary;
pub use discrete::DiscreteSummary;
pub use linear::LinearFunction;

use core::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::series::RawSample;
use crate::time::TimeInterval;

/// Named statistic carried by every summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticKind {
    Average,
    StandardDeviation,
}

impl StatisticKind {
    /// Every statistic, in the order summaries report them
    pub const ALL: [StatisticKind; 2] = [Self::Average, Self::StandardDeviation];

    /// Short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::Average => "avg",
            Self::StandardDeviation => "stddev",
        }
    }
}

/// One computed statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub kind: StatisticKind,
    pub value: f64,
}

impl Statistic {
    pub const fn new(kind: StatisticKind, value: f64) -> Self {
        Self { kind, value }
    }
}

/// Immutable summary over a span of time or a set of samples
pub trait Representation: Clone + Default + Debug + Send + Into<Summary> + 'static {
    /// Average and standard deviation, in [`StatisticKind::ALL`] order
    fn statistics(&self) -> [Statistic; 2];

    /// Summary of the union of what `self` and `other` summarize
    fn merge(&self, other: &Self) -> Self;

    /// True for the merge identity (nothing summarized yet)
    fn is_identity(&self) -> bool;
}

/// Function interpolating the signal between two consecutive samples
pub trait PiecewiseFunction: Sized {
    fn through(first: &RawSample, second: &RawSample) -> Self;
}

/// Summary obtainable by integrating a piecewise function over a sub-range
pub trait Integrate<F: PiecewiseFunction>: Representation {
    /// Summarize `f` over `interval`; an empty interval yields the identity
    fn integrate(f: &F, interval: TimeInterval) -> Self;
}

/// Closed set of summaries handed to sinks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Summary {
    Discrete(DiscreteSummary),
    Continuous(ContinuousSummary),
}

impl Summary {
    pub fn statistics(&self) -> [Statistic; 2] {
        match self {
            Self::Discrete(s) => s.statistics(),
            Self::Continuous(s) => s.statistics(),
        }
    }

    pub fn average(&self) -> f64 {
        match self {
            Self::Discrete(s) => s.average(),
            Self::Continuous(s) => s.average(),
        }
    }

    pub fn standard_deviation(&self) -> f64 {
        match self {
            Self::Discrete(s) => s.standard_deviation(),
            Self::Continuous(s) => s.standard_deviation(),
        }
    }
}

impl From<DiscreteSummary> for Summary {
    fn from(summary: DiscreteSummary) -> Self {
        Self::Discrete(summary)
    }
}

impl From<ContinuousSummary> for Summary {
    fn from(summary: ContinuousSummary) -> Self {
        Self::Continuous(summary)
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [avg, sd] = self.statistics();
        write!(
            f,
            "{}: {:.4}, {}: {:.4}",
            avg.kind.label(),
            avg.value,
            sd.kind.label(),
            sd.value
        )
    }
}

#[inline]
pub(crate) fn square(x: f64) -> f64 {
    x * x
}
