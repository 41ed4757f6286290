//! Error types surfaced by the rollup engines

use thiserror_no_std::Error;

use crate::SeriesId;
use crate::sink::SinkError;
use crate::time::Timestamp;

/// Errors returned while configuring or driving an engine
#[derive(Debug, Error)]
pub enum RollupError {
    /// No resolutions were supplied
    #[error("At least one resolution is required")]
    EmptyResolutions,

    /// A step that neither divides an hour nor is a whole number of hours dividing a day
    #[error("Invalid resolution step: {step} min")]
    InvalidStep {
        /// The rejected step, in minutes
        step: u32,
    },

    /// More distinct resolutions than an engine can track
    #[error("Too many resolutions (max: {max})")]
    TooManyResolutions {
        /// Maximum allowed resolution count
        max: usize,
    },

    /// A sample arrived older than the previous one for the same series
    #[error("Out-of-order sample for series {id}: {current} precedes {previous}")]
    OutOfOrder {
        /// Series the sample belongs to
        id: SeriesId,
        /// Timestamp of the previously accepted sample
        previous: Timestamp,
        /// Timestamp of the rejected sample
        current: Timestamp,
    },

    /// Unknown representation label
    #[error("Unknown representation: {label}")]
    UnknownRepresentation {
        /// The label that did not match
        label: String,
    },

    /// Configuration bytes could not be encoded or decoded
    #[error("Configuration could not be encoded or decoded: {0}")]
    ConfigCodec(postcard::Error),

    /// The sink failed to record emitted rollups
    #[error("Sink failure: {0}")]
    Sink(SinkError),
}

impl From<SinkError> for RollupError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err)
    }
}

/// Result type for engine operations
pub type RollupResult<T> = Result<T, RollupError>;
