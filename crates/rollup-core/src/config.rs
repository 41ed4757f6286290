//! Engine configuration
//!
//! A small serde structure naming the representation and the resolution
//! steps. It can be persisted as postcard bytes and restored on startup.

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, RepresentationKind};
use crate::error::{RollupError, RollupResult};
use crate::sink::Sink;
use crate::time::ResolutionSet;

/// Default resolution steps, in minutes
pub const DEFAULT_STEPS: [u32; 3] = [5, 15, 60];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub representation: RepresentationKind,
    /// Bucket widths in minutes
    pub resolutions: Vec<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            representation: RepresentationKind::default(),
            resolutions: DEFAULT_STEPS.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Validate the steps into a resolution set
    pub fn resolution_set(&self) -> RollupResult<ResolutionSet> {
        ResolutionSet::from_steps(&self.resolutions)
    }

    /// Build the configured engine over a sink created from the validated resolutions
    pub fn build<S, F>(&self, make_sink: F) -> RollupResult<Box<dyn Engine>>
    where
        S: Sink + 'static,
        F: FnOnce(ResolutionSet) -> S,
    {
        let sink = make_sink(self.resolution_set()?);
        Ok(self.representation.build(sink))
    }

    pub fn to_bytes(&self) -> RollupResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(RollupError::ConfigCodec)
    }

    pub fn from_bytes(bytes: &[u8]) -> RollupResult<Self> {
        postcard::from_bytes(bytes).map_err(RollupError::ConfigCodec)
    }
}
