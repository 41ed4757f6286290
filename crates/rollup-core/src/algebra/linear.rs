use super::{PiecewiseFunction, square};
use crate::series::RawSample;
use crate::time::Timestamp;

/// Straight line through two points
///
/// The x axis is elapsed seconds since `anchor`, the timestamp of the first
/// sample, which keeps x small and the polynomial terms well conditioned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFunction {
    anchor: Timestamp,
    slope: f64,
    intercept: f64,
}

impl LinearFunction {
    /// Line through `(x1, y1)` and `(x2, y2)` in local coordinates
    ///
    /// Equal x values produce a non-finite slope; such a line must only ever
    /// be integrated over empty ranges.
    pub fn from_points(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::anchored(0, x1, y1, x2, y2)
    }

    fn anchored(anchor: Timestamp, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let slope = (y2 - y1) / (x2 - x1);
        Self {
            anchor,
            slope,
            intercept: y1 - slope * x1,
        }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Convert an absolute timestamp to elapsed seconds since the anchor
    pub fn to_x(&self, timestamp: Timestamp) -> f64 {
        (timestamp - self.anchor) as f64
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Antiderivative evaluated at `x`
    pub fn integral_at(&self, x: f64) -> f64 {
        self.slope * square(x) / 2.0 + self.intercept * x
    }

    /// Definite integral over `[x_from, x_to]`
    pub fn integral(&self, x_from: f64, x_to: f64) -> f64 {
        self.integral_at(x_to) - self.integral_at(x_from)
    }

    /// Definite integral of `(f(x) - mean)^2` over `[x_from, x_to]`
    ///
    /// Exact: the squared deviation of a line is a parabola, integrated here in
    /// closed form.
    pub fn squared_deviation_integral(&self, x_from: f64, x_to: f64, mean: f64) -> f64 {
        let a = self.slope;
        let c = self.intercept - mean;
        let antiderivative =
            |x: f64| square(a) * x * x * x / 3.0 + a * c * square(x) + square(c) * x;
        antiderivative(x_to) - antiderivative(x_from)
    }
}

impl PiecewiseFunction for LinearFunction {
    fn through(first: &RawSample, second: &RawSample) -> Self {
        let x2 = (second.timestamp - first.timestamp) as f64;
        Self::anchored(first.timestamp, 0.0, first.value, x2, second.value)
    }
}
