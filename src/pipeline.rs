//! The frame pipeline driver.
//!
//! [`FramePipeline`] pulls frames from a [`FrameSource`] one at a time and
//! runs each through the same fixed sequence:
//!
//! 1. progress reporting (every frame, gated or not)
//! 2. sampling the configured pixel
//! 3. the armed-to-dark decision against the previous frame's sample
//! 4. if the decision fired and the frame is past the start gate: full
//!    conversion and snapshot export
//! 5. storing the sample as the new detector state
//!
//! A run moves through [`RunPhase::BeforeStartGate`], [`RunPhase::Active`]
//! and [`RunPhase::Done`]. Setup and decode errors end the run and are
//! returned; snapshot export errors are logged, counted, and absorbed.
//!
//! # Example
//!
//! ```no_run
//! use cuesnap::{FramePipeline, MediaSource, PipelineConfig};
//!
//! let mut source = MediaSource::open("recording.mp4")?;
//! let config = PipelineConfig::new("snapshots")
//!     .with_base_time_offset(1_700_000_000)
//!     .with_start_frame(600);
//!
//! let mut pipeline = FramePipeline::new(config);
//! let summary = pipeline.run(&mut source)?;
//! println!("{} snapshots written", summary.snapshots_written);
//! # Ok::<(), cuesnap::CueSnapError>(())
//! ```

use std::path::PathBuf;

use crate::{
    configuration::PipelineConfig,
    conversion::{convert_frame_into, sample_pixel},
    detector::{self, DetectorState},
    error::CueSnapError,
    frame::{PlanarFrame, RgbFrame},
    progress::{ProgressReporter, Timecode},
    snapshot::{PngSnapshotWriter, SnapshotSink, snapshot_timestamp},
    source::FrameSource,
    validation,
};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Frames seen so far are at or below the start gate; exports are
    /// suppressed but detection state is tracked.
    BeforeStartGate,
    /// Past the gate; transitions are exported.
    Active,
    /// The source is exhausted, the run was cancelled, or a fatal error
    /// occurred.
    Done,
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No transition.
    Idle,
    /// A transition fired at or below the start gate and was not exported.
    Gated,
    /// A transition was exported to the given path.
    Exported(PathBuf),
    /// A transition fired but its snapshot could not be written.
    ExportFailed,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames taken from the source.
    pub frames_processed: u64,
    /// Armed-to-dark transitions, gated ones included.
    pub transitions_detected: u64,
    /// Transitions suppressed by the start gate.
    pub gated_transitions: u64,
    /// Snapshots written successfully.
    pub snapshots_written: u64,
    /// Snapshots that failed to write.
    pub failed_exports: u64,
    /// Paths of written snapshots, in order. A path appears more than once
    /// when a later snapshot replaced an earlier one.
    pub written_paths: Vec<PathBuf>,
    /// Whether the run stopped because its cancellation token fired.
    pub cancelled: bool,
}

/// Drives frames from a source through detection and export.
///
/// Owns the per-run state: detector memory, reporter memory, the last frame
/// number seen, and a reusable RGB buffer for exports.
pub struct FramePipeline<S: SnapshotSink = PngSnapshotWriter> {
    config: PipelineConfig,
    sink: S,
    detector_state: DetectorState,
    reporter: ProgressReporter,
    rgb_buffer: Option<RgbFrame>,
    last_frame: u64,
    phase: RunPhase,
    summary: RunSummary,
}

impl FramePipeline<PngSnapshotWriter> {
    /// Create a pipeline that writes PNG files into the configured output
    /// directory.
    pub fn new(config: PipelineConfig) -> Self {
        let sink = PngSnapshotWriter::new(config.output_directory());
        Self::with_sink(config, sink)
    }
}

impl<S: SnapshotSink> FramePipeline<S> {
    /// Create a pipeline exporting through a custom sink.
    pub fn with_sink(config: PipelineConfig, sink: S) -> Self {
        let reporter = ProgressReporter::new(config.progress_interval, config.assumed_frame_rate);
        Self {
            config,
            sink,
            detector_state: DetectorState::default(),
            reporter,
            rgb_buffer: None,
            last_frame: 0,
            phase: RunPhase::BeforeStartGate,
            summary: RunSummary::default(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Counters for the current or most recent run.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// The detector memory.
    pub fn detector_state(&self) -> DetectorState {
        self.detector_state
    }

    /// The snapshot sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process every frame of `source` until end of stream, cancellation,
    /// or a fatal error.
    ///
    /// State from a previous run is discarded first.
    ///
    /// # Errors
    ///
    /// - [`CueSnapError::InvalidConfiguration`] if the configuration is
    ///   unusable or fails preflight.
    /// - [`CueSnapError::UnsupportedFormat`] if the source does not produce
    ///   planar YUV 4:2:0.
    /// - [`CueSnapError::SamplePointOutOfBounds`] if the sample point lies
    ///   outside the frame.
    /// - Any error returned by [`FrameSource::next_frame`].
    pub fn run<F: FrameSource>(&mut self, source: &mut F) -> Result<RunSummary, CueSnapError> {
        self.reset();

        let result = self.drive(source);

        self.phase = RunPhase::Done;
        self.config.progress.on_finish();

        match &result {
            Ok(summary) => log::info!(
                "Run finished: {} frames, {} transitions ({} gated), {} snapshots written, {} failed{}",
                summary.frames_processed,
                summary.transitions_detected,
                summary.gated_transitions,
                summary.snapshots_written,
                summary.failed_exports,
                if summary.cancelled { ", cancelled" } else { "" },
            ),
            Err(error) => log::debug!(
                "Run aborted after {} frames: {error}",
                self.summary.frames_processed
            ),
        }

        result
    }

    fn drive<F: FrameSource>(&mut self, source: &mut F) -> Result<RunSummary, CueSnapError> {
        self.start(source)?;

        let total_frames = self.config.total_frames.or(source.info().total_frames);

        loop {
            if self.config.is_cancelled() {
                log::info!("Cancellation requested, stopping");
                self.summary.cancelled = true;
                break;
            }

            let Some(decoded) = source.next_frame()? else {
                break;
            };
            self.process_frame(decoded.number, &decoded.frame, total_frames)?;
        }

        Ok(self.summary.clone())
    }

    /// Startup checks, run before the first frame is read.
    fn start<F: FrameSource>(&mut self, source: &F) -> Result<(), CueSnapError> {
        self.config.validate()?;

        let info = source.info();
        info.pixel_format.ensure_supported()?;

        let report = validation::preflight(&self.config, info);
        for item in &report.info {
            log::info!("{item}");
        }
        for item in &report.warnings {
            log::warn!("{item}");
        }

        if !report.is_valid() {
            let point = self.config.sample_point;
            if info.width > 0 && info.height > 0 && !point.fits(info.width, info.height) {
                return Err(CueSnapError::SamplePointOutOfBounds {
                    x: point.x,
                    y: point.y,
                    width: info.width,
                    height: info.height,
                });
            }
            return Err(CueSnapError::InvalidConfiguration(report.errors.join("; ")));
        }

        log::debug!(
            "Sampling ({}, {}) with {:?}, start gate at frame {}",
            self.config.sample_point.x,
            self.config.sample_point.y,
            self.config.thresholds,
            self.config.start_frame,
        );

        Ok(())
    }

    fn reset(&mut self) {
        self.detector_state = DetectorState::default();
        self.reporter =
            ProgressReporter::new(self.config.progress_interval, self.config.assumed_frame_rate);
        self.last_frame = 0;
        self.phase = RunPhase::BeforeStartGate;
        self.summary = RunSummary::default();
    }

    /// Run one frame through reporting, detection and, if it fires, export.
    ///
    /// `number` is the cumulative decoded-frame count of this frame and
    /// `total_frames` the expected length used for the ETA.
    ///
    /// # Errors
    ///
    /// [`CueSnapError::SamplePointOutOfBounds`] if this frame is smaller than
    /// the sample point. Export failures are not errors; they produce
    /// [`FrameOutcome::ExportFailed`].
    pub fn process_frame(
        &mut self,
        number: u64,
        frame: &PlanarFrame<'_>,
        total_frames: Option<u64>,
    ) -> Result<FrameOutcome, CueSnapError> {
        if number < self.last_frame {
            log::warn!(
                "Frame number went backwards: {} after {}",
                number,
                self.last_frame
            );
        }
        self.last_frame = number;
        self.summary.frames_processed += 1;

        if self.phase == RunPhase::BeforeStartGate && number > self.config.start_frame {
            log::debug!("Passed start gate at frame {number}");
            self.phase = RunPhase::Active;
        }

        if let Some(report) = self.reporter.report(number, total_frames) {
            self.config.progress.on_progress(&report);
        }

        let current = sample_pixel(frame, self.config.sample_point)?;
        let (fired, next_state) =
            detector::observe(&self.config.thresholds, current, self.detector_state);

        let outcome = if !fired {
            FrameOutcome::Idle
        } else {
            self.summary.transitions_detected += 1;
            if number <= self.config.start_frame {
                log::debug!(
                    "Transition at frame {number} suppressed by start gate ({})",
                    self.config.start_frame
                );
                self.summary.gated_transitions += 1;
                FrameOutcome::Gated
            } else {
                self.export(number, frame)
            }
        };

        self.detector_state = next_state;
        Ok(outcome)
    }

    fn export(&mut self, number: u64, frame: &PlanarFrame<'_>) -> FrameOutcome {
        let image = self
            .rgb_buffer
            .get_or_insert_with(|| RgbFrame::new(frame.width(), frame.height()));
        convert_frame_into(frame, image);

        let timestamp = snapshot_timestamp(
            self.config.base_time_offset,
            number,
            self.config.assumed_frame_rate,
        );

        log::info!(
            "Saving frame {number} ({})",
            Timecode::from_frames(number, self.config.assumed_frame_rate)
        );

        match self.sink.write(image, timestamp) {
            Ok(path) => {
                log::debug!("Wrote {}", path.display());
                self.summary.snapshots_written += 1;
                self.summary.written_paths.push(path.clone());
                FrameOutcome::Exported(path)
            }
            Err(error) => {
                log::warn!("Snapshot for frame {number} not saved: {error}");
                self.summary.failed_exports += 1;
                FrameOutcome::ExportFailed
            }
        }
    }
}
