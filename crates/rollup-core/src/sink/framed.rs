use std::io::Write;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use super::{Emission, EmissionKey, Sink, SinkError, Writer};
use crate::SeriesId;
use crate::algebra::Summary;
use crate::time::{Resolution, ResolutionSet, Timestamp};

/// Size of the little-endian length prefix in front of every frame
const FRAME_HEADER_LEN: usize = 4;

/// Append-only sink writing each rollup as a length-prefixed postcard frame
///
/// Frame layout (little-endian):
/// - length: 4 bytes (u32)
/// - payload: `length` bytes, a postcard-encoded [`Emission`]
///
/// Frames produced by one `process` call reach the output in a single
/// `write_all` followed by a flush of the output.
pub struct PostcardSink<W: Write + Send> {
    resolutions: ResolutionSet,
    output: Arc<Mutex<W>>,
}

impl<W: Write + Send> PostcardSink<W> {
    pub fn new(resolutions: ResolutionSet, output: W) -> Self {
        Self {
            resolutions,
            output: Arc::new(Mutex::new(output)),
        }
    }

    /// Run `f` against the underlying output
    pub fn inspect<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.output.lock())
    }
}

impl<W: Write + Send> Sink for PostcardSink<W> {
    type Writer = PostcardWriter<W>;

    fn resolutions(&self) -> &ResolutionSet {
        &self.resolutions
    }

    fn create_writer(&self) -> Self::Writer {
        PostcardWriter {
            output: Arc::clone(&self.output),
            pending: Vec::new(),
            keys: Vec::new(),
        }
    }
}

/// Writer encoding frames into memory until flushed
pub struct PostcardWriter<W: Write + Send> {
    output: Arc<Mutex<W>>,
    pending: Vec<u8>,
    keys: Vec<EmissionKey>,
}

impl<W: Write + Send> Writer for PostcardWriter<W> {
    fn write(
        &mut self,
        id: SeriesId,
        resolution: Resolution,
        bucket_start: Timestamp,
        summary: Summary,
    ) -> Result<(), SinkError> {
        let emission = Emission {
            id,
            resolution,
            bucket_start,
            summary,
        };
        let payload = postcard::to_allocvec(&emission).map_err(SinkError::Codec)?;
        let length = u32::try_from(payload.len()).map_err(|_| SinkError::Rejected {
            reason: "frame exceeds u32 length".into(),
            failed: vec![emission.key()],
        })?;

        self.pending.extend_from_slice(&length.to_le_bytes());
        self.pending.extend_from_slice(&payload);
        self.keys.push(emission.key());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let result = {
            let mut output = self.output.lock();
            output
                .write_all(&self.pending)
                .and_then(|()| output.flush())
        };
        self.pending.clear();

        match result {
            Ok(()) => {
                self.keys.clear();
                Ok(())
            }
            Err(e) => {
                let failed = core::mem::take(&mut self.keys);
                warn!("Failed to commit {} rollup frame(s): {}", failed.len(), e);
                Err(SinkError::Rejected {
                    reason: e.to_string(),
                    failed,
                })
            }
        }
    }
}

/// Decode every frame of a stream produced by [`PostcardSink`]
pub fn read_records(bytes: &[u8]) -> Result<Vec<Emission>, SinkError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let header = bytes
            .get(offset..offset + FRAME_HEADER_LEN)
            .ok_or(SinkError::Truncated { offset })?;
        let mut length_bytes = [0u8; FRAME_HEADER_LEN];
        length_bytes.copy_from_slice(header);
        let length = u32::from_le_bytes(length_bytes) as usize;

        let start = offset + FRAME_HEADER_LEN;
        let payload = bytes
            .get(start..start + length)
            .ok_or(SinkError::Truncated { offset })?;
        records.push(postcard::from_bytes(payload).map_err(SinkError::Codec)?);

        offset = start + length;
    }

    Ok(records)
}
