//! Boundary between the engines and whatever stores their output
//!
//! An engine asks its [`Sink`] for the resolutions to aggregate once, at
//! construction, then obtains a fresh [`Writer`] for every processed sample.
//! Writers may buffer; [`Writer::flush`] is called exactly once at the end of
//! every `process` call.

mod framed;
mod memory;

pub use framed::{PostcardSink, PostcardWriter, read_records};
pub use memory::{MemorySink, MemoryWriter};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::SeriesId;
use crate::algebra::Summary;
use crate::time::{Resolution, ResolutionSet, Timestamp};

/// Identity of one emitted rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmissionKey {
    pub id: SeriesId,
    pub resolution: Resolution,
    pub bucket_start: Timestamp,
}

/// One closed bucket as handed to a sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub id: SeriesId,
    pub resolution: Resolution,
    pub bucket_start: Timestamp,
    pub summary: Summary,
}

impl Emission {
    pub fn key(&self) -> EmissionKey {
        EmissionKey {
            id: self.id,
            resolution: self.resolution,
            bucket_start: self.bucket_start,
        }
    }
}

/// Errors reported by sinks
#[derive(Debug, Error)]
pub enum SinkError {
    /// Buffered writes could not be committed
    #[error("{reason} ({} rollup write(s) not committed)", .failed.len())]
    Rejected {
        /// Why the commit failed
        reason: String,
        /// Every write that was lost
        failed: Vec<EmissionKey>,
    },

    /// A record could not be encoded or decoded
    #[error("Rollup record codec failure: {0}")]
    Codec(postcard::Error),

    /// A framed record stream ended mid-record
    #[error("Rollup stream truncated at byte {offset}")]
    Truncated {
        /// Offset of the incomplete frame
        offset: usize,
    },
}

/// Destination of emitted rollups
pub trait Sink: Send + Sync {
    type Writer: Writer;

    /// The resolutions an engine bound to this sink aggregates
    fn resolutions(&self) -> &ResolutionSet;

    /// A writer for the rollups produced by one `process` call
    fn create_writer(&self) -> Self::Writer;
}

/// Short-lived handle recording emissions
pub trait Writer {
    fn write(
        &mut self,
        id: SeriesId,
        resolution: Resolution,
        bucket_start: Timestamp,
        summary: Summary,
    ) -> Result<(), SinkError>;

    /// Commit everything written since the last flush
    fn flush(&mut self) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    type Writer = S::Writer;

    fn resolutions(&self) -> &ResolutionSet {
        (**self).resolutions()
    }

    fn create_writer(&self) -> Self::Writer {
        (**self).create_writer()
    }
}
