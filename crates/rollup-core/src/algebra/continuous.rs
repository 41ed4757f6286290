use serde::{Deserialize, Serialize};

use super::{Integrate, LinearFunction, Representation, Statistic, StatisticKind, square};
use crate::time::TimeInterval;

/// Time-weighted mean and standard deviation of a piecewise-linear signal
///
/// Built by integrating a [`LinearFunction`] over a sub-range, or by merging
/// two summaries with the parallel-axis rule:
///
/// ```text
/// d   = da + db
/// avg = (da*avg_a + db*avg_b) / d
/// var = (da*(var_a + (avg_a-avg)^2) + db*(var_b + (avg_b-avg)^2)) / d
/// ```
///
/// The default value has zero duration and is the merge identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSummary {
    duration: f64,
    average: f64,
    standard_deviation: f64,
}

impl ContinuousSummary {
    /// Summary with explicit components, mainly for sinks restoring records
    pub fn new(duration: f64, average: f64, standard_deviation: f64) -> Self {
        Self {
            duration,
            average,
            standard_deviation,
        }
    }

    /// Covered duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    fn variance(&self) -> f64 {
        square(self.standard_deviation)
    }
}

impl Representation for ContinuousSummary {
    fn statistics(&self) -> [Statistic; 2] {
        [
            Statistic::new(StatisticKind::Average, self.average),
            Statistic::new(StatisticKind::StandardDeviation, self.standard_deviation),
        ]
    }

    fn merge(&self, other: &Self) -> Self {
        if other.is_identity() {
            return *self;
        }
        if self.is_identity() {
            return *other;
        }

        let duration = self.duration + other.duration;
        let average = (self.duration * self.average + other.duration * other.average) / duration;
        let total_variance = self.duration * (self.variance() + square(self.average - average))
            + other.duration * (other.variance() + square(other.average - average));

        Self {
            duration,
            average,
            standard_deviation: (total_variance.max(0.0) / duration).sqrt(),
        }
    }

    fn is_identity(&self) -> bool {
        self.duration <= 0.0
    }
}

impl Integrate<LinearFunction> for ContinuousSummary {
    fn integrate(f: &LinearFunction, interval: TimeInterval) -> Self {
        if interval.is_empty() {
            return Self::default();
        }

        let x_from = f.to_x(interval.from);
        let x_to = f.to_x(interval.to);
        let duration = x_to - x_from;
        let average = f.integral(x_from, x_to) / duration;
        let total_variance = f.squared_deviation_integral(x_from, x_to, average);

        Self {
            duration,
            average,
            standard_deviation: (total_variance.max(0.0) / duration).sqrt(),
        }
    }
}
