//! Desktop driver for the rollup-core engines.
//!
//! Generates synthetic sample streams for several series, feeds them through
//! one engine from worker threads and logs every rollup it emits. Optionally
//! appends the rollups to a postcard frame file.
//!
//! # Arguments
//!
//! | Position | Meaning                                                  |
//! |----------|----------------------------------------------------------|
//! | 1        | Representation: `discrete`, `continuous`, `hierarchical` |
//! | 2        | Optional output path for postcard frames                 |
//!
//! Set `RUST_LOG=debug` (or `trace` for every bucket) to see engine logs.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use thiserror_no_std::Error;

use rollup_core::prelude::*;
use rollup_core::sink::Emission;

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Number of simulated series, one worker thread each.
const SERIES_COUNT: SeriesId = 4;

/// Simulated duration.
const SIMULATED_HOURS: i64 = 6;

/// Nominal spacing between samples.
const SAMPLE_INTERVAL_SECS: i64 = 50;

/// 2024-01-01 00:00:00 UTC.
const START_TS: Timestamp = 1_704_067_200;

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates a jittered, slowly varying signal for one series.
struct MockSeriesGenerator {
    id: SeriesId,
    timestamp: Timestamp,
    /// Linear congruential state for jitter, seeded per series.
    seed: u64,
}

impl MockSeriesGenerator {
    fn new(id: SeriesId) -> Self {
        Self {
            id,
            timestamp: START_TS,
            seed: 0x9e37_79b9_7f4a_7c15 ^ u64::from(id),
        }
    }

    fn next_jitter(&mut self) -> i64 {
        self.seed = self
            .seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.seed >> 33) % 21) as i64 - 10
    }

    /// Advance the clock by roughly one interval and return a new sample.
    fn next_sample(&mut self) -> RawSample {
        self.timestamp += SAMPLE_INTERVAL_SECS + self.next_jitter();
        let t = (self.timestamp - START_TS) as f64;
        let phase = f64::from(self.id);

        // 20-26 with an hourly cycle and a slower drift
        let value = 23.0 + 3.0 * (t / 573.0 + phase).sin() + 0.5 * (t / 3_700.0).cos();
        RawSample::new(self.timestamp, value)
    }
}

impl Iterator for MockSeriesGenerator {
    type Item = RawSample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.next_sample();
        (sample.timestamp <= START_TS + SIMULATED_HOURS * 3_600).then_some(sample)
    }
}

// ---------------------------------------------------------------------------
// Driving
// ---------------------------------------------------------------------------

fn feed_all(engine: &dyn Engine) -> Result<(), RollupError> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..SERIES_COUNT)
            .map(|id| {
                scope.spawn(move || {
                    MockSeriesGenerator::new(id)
                        .try_for_each(|sample| engine.process(id, sample))
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Result<(), _>>()
    })
}

fn log_emissions(emissions: &[Emission]) {
    for emission in emissions {
        info!(
            "series {} {} @ {}  {}",
            emission.id, emission.resolution, emission.bucket_start, emission.summary
        );
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum SimulationError {
    #[error("{0}")]
    Rollup(RollupError),

    #[error("Cannot open output {path}: {cause}")]
    Output { path: String, cause: io::Error },
}

impl From<RollupError> for SimulationError {
    fn from(e: RollupError) -> Self {
        Self::Rollup(e)
    }
}

impl From<SinkError> for SimulationError {
    fn from(e: SinkError) -> Self {
        Self::Rollup(e.into())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Append `emissions` to `sink` as one committed batch of frames.
fn write_frames<W: Write + Send>(
    sink: &PostcardSink<W>,
    emissions: &[Emission],
) -> Result<(), SinkError> {
    let mut writer = sink.create_writer();
    for e in emissions {
        writer.write(e.id, e.resolution, e.bucket_start, e.summary)?;
    }
    writer.flush()
}

fn run(representation: RepresentationKind, output: Option<&str>) -> Result<(), SimulationError> {
    let config = EngineConfig {
        representation,
        ..EngineConfig::default()
    };
    let resolutions = config.resolution_set()?;
    info!(
        "{} over {:?} for {} series",
        representation.full_name(),
        resolutions.steps(),
        SERIES_COUNT
    );

    let memory = Arc::new(MemorySink::new(resolutions.clone()));
    feed_all(representation.build(Arc::clone(&memory)).as_ref())?;
    let emissions = memory.emissions();
    log_emissions(&emissions);

    if let Some(path) = output {
        let file = File::create(path).map_err(|cause| SimulationError::Output {
            path: path.to_string(),
            cause,
        })?;
        let framed = PostcardSink::new(resolutions, BufWriter::new(file));
        write_frames(&framed, &emissions)?;
        info!("Wrote {} rollup frames to {}", emissions.len(), path);
    } else {
        info!("{} rollups emitted", emissions.len());
    }
    Ok(())
}

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let mut args = std::env::args().skip(1);
    let representation = match args.next().as_deref().map(str::parse) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        None => RepresentationKind::default(),
    };
    let output = args.next();

    match run(representation, output.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
