use serde::{Deserialize, Serialize};

use super::{Representation, Statistic, StatisticKind, square};

/// Mean and sample standard deviation of a multiset of raw values
///
/// The standard deviation is Bessel-corrected (divides by `count - 1`) and
/// is zero when fewer than two values were seen. An empty summary reports an
/// average of zero; check [`DiscreteSummary::count`] to tell it apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscreteSummary {
    count: u64,
    average: f64,
    standard_deviation: f64,
}

impl DiscreteSummary {
    /// Summarize `values` in a single pass
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0u64;
        let mut mean = 0.0;
        let mut m2 = 0.0;

        // Welford's update
        for value in values {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
        }

        Self::from_moments(count, mean, m2)
    }

    fn from_moments(count: u64, average: f64, m2: f64) -> Self {
        if count == 0 {
            return Self::default();
        }
        let standard_deviation = if count == 1 {
            0.0
        } else {
            (m2.max(0.0) / (count - 1) as f64).sqrt()
        };
        Self {
            count,
            average,
            standard_deviation,
        }
    }

    /// Sum of squared deviations from the mean
    fn m2(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            square(self.standard_deviation) * (self.count - 1) as f64
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }
}

impl Representation for DiscreteSummary {
    fn statistics(&self) -> [Statistic; 2] {
        [
            Statistic::new(StatisticKind::Average, self.average),
            Statistic::new(StatisticKind::StandardDeviation, self.standard_deviation),
        ]
    }

    fn merge(&self, other: &Self) -> Self {
        if other.count == 0 {
            return *self;
        }
        if self.count == 0 {
            return *other;
        }

        let count = self.count + other.count;
        let (na, nb, n) = (self.count as f64, other.count as f64, count as f64);
        let delta = other.average - self.average;
        let average = (na * self.average + nb * other.average) / n;
        let m2 = self.m2() + other.m2() + square(delta) * na * nb / n;

        Self::from_moments(count, average, m2)
    }

    fn is_identity(&self) -> bool {
        self.count == 0
    }
}
