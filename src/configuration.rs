//! Pipeline configuration.
//!
//! [`PipelineConfig`] is a builder that carries the detection thresholds,
//! output location, time base, and operational hooks (progress callback,
//! cancellation) through [`FramePipeline`](crate::FramePipeline).
//!
//! # Example
//!
//! ```no_run
//! use cuesnap::{ArmedSignature, PipelineConfig};
//!
//! let config = PipelineConfig::new("snapshots")
//!     .with_sample_point(1856, 799)
//!     .with_dark_threshold(25)
//!     .with_armed_signature(ArmedSignature::new(130, 180, 160))
//!     .with_base_time_offset(1_700_000_000)
//!     .with_start_frame(600);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CueSnapError;
use crate::progress::{CancellationToken, LogProgress, ProgressCallback};

/// Default sample column.
pub const DEFAULT_SAMPLE_X: u32 = 1856;
/// Default sample row.
pub const DEFAULT_SAMPLE_Y: u32 = 799;
/// Default exclusive upper bound for every channel of a dark sample.
pub const DEFAULT_DARK_THRESHOLD: u8 = 25;
/// Default frame rate used to turn frame counts into seconds.
pub const DEFAULT_ASSUMED_FRAME_RATE: u32 = 60;
/// Minimum spacing between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// The fixed coordinate whose colour drives detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplePoint {
    /// Column, 0-based.
    pub x: u32,
    /// Row, 0-based.
    pub y: u32,
}

impl SamplePoint {
    /// Create a sample point.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Whether the point lies inside a `width` x `height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

impl Default for SamplePoint {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_X, DEFAULT_SAMPLE_Y)
    }
}

/// Colour signature of the pre-transition ("armed") sample.
///
/// A sample is armed when `red < red_max`, `green > green_min` and
/// `blue < blue_max`. All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmedSignature {
    /// Exclusive upper bound for red.
    pub red_max: u8,
    /// Exclusive lower bound for green.
    pub green_min: u8,
    /// Exclusive upper bound for blue.
    pub blue_max: u8,
}

impl ArmedSignature {
    /// Create a signature from its three bounds.
    pub const fn new(red_max: u8, green_min: u8, blue_max: u8) -> Self {
        Self {
            red_max,
            green_min,
            blue_max,
        }
    }
}

impl Default for ArmedSignature {
    fn default() -> Self {
        Self::new(130, 180, 160)
    }
}

/// Thresholds consumed by the transition detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionThresholds {
    /// Exclusive upper bound for every channel of a dark sample.
    pub dark_max: u8,
    /// Signature of an armed sample.
    pub armed: ArmedSignature,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            dark_max: DEFAULT_DARK_THRESHOLD,
            armed: ArmedSignature::default(),
        }
    }
}

/// Configuration for one pipeline run.
///
/// All fields have defaults matching the overlay this tool was built for;
/// only the output directory is required.
#[derive(Clone)]
pub struct PipelineConfig {
    pub(crate) sample_point: SamplePoint,
    pub(crate) thresholds: DetectionThresholds,
    pub(crate) output_directory: PathBuf,
    /// Seconds added to every frame-derived timestamp.
    pub(crate) base_time_offset: i64,
    /// Exports are suppressed while the cumulative frame count is at or
    /// below this value.
    pub(crate) start_frame: u64,
    /// Overrides the source's frame count for ETA computation.
    pub(crate) total_frames: Option<u64>,
    pub(crate) assumed_frame_rate: u32,
    pub(crate) progress_interval: Duration,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("sample_point", &self.sample_point)
            .field("thresholds", &self.thresholds)
            .field("output_directory", &self.output_directory)
            .field("base_time_offset", &self.base_time_offset)
            .field("start_frame", &self.start_frame)
            .field("total_frames", &self.total_frames)
            .field("assumed_frame_rate", &self.assumed_frame_rate)
            .field("progress_interval", &self.progress_interval)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineConfig {
    /// Create a configuration writing snapshots into `output_directory`.
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            sample_point: SamplePoint::default(),
            thresholds: DetectionThresholds::default(),
            output_directory: output_directory.as_ref().to_path_buf(),
            base_time_offset: 0,
            start_frame: 0,
            total_frames: None,
            assumed_frame_rate: DEFAULT_ASSUMED_FRAME_RATE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            progress: Arc::new(LogProgress),
            cancellation: None,
        }
    }

    /// Set the pixel coordinate sampled on every frame.
    #[must_use]
    pub fn with_sample_point(mut self, x: u32, y: u32) -> Self {
        self.sample_point = SamplePoint::new(x, y);
        self
    }

    /// Set the exclusive upper bound for a dark sample's channels.
    #[must_use]
    pub fn with_dark_threshold(mut self, dark_max: u8) -> Self {
        self.thresholds.dark_max = dark_max;
        self
    }

    /// Set the colour signature of an armed sample.
    #[must_use]
    pub fn with_armed_signature(mut self, armed: ArmedSignature) -> Self {
        self.thresholds.armed = armed;
        self
    }

    /// Set the external clock reference, in seconds, added to every
    /// snapshot timestamp.
    #[must_use]
    pub fn with_base_time_offset(mut self, seconds: i64) -> Self {
        self.base_time_offset = seconds;
        self
    }

    /// Suppress exports for frames `1..=start_frame`.
    ///
    /// The detector keeps tracking colour history during the gated period.
    #[must_use]
    pub fn with_start_frame(mut self, start_frame: u64) -> Self {
        self.start_frame = start_frame;
        self
    }

    /// Override the expected frame count used for ETA. `None` uses the
    /// count reported by the source.
    #[must_use]
    pub fn with_total_frames(mut self, total_frames: Option<u64>) -> Self {
        self.total_frames = total_frames;
        self
    }

    /// Set the frame rate used to turn frame counts into seconds for
    /// snapshot names and timecodes. Defaults to 60.
    ///
    /// This is not read from the stream: a video recorded at another rate
    /// gets timestamps scaled accordingly.
    #[must_use]
    pub fn with_assumed_frame_rate(mut self, frames_per_second: u32) -> Self {
        self.assumed_frame_rate = frames_per_second;
        self
    }

    /// Set the minimum spacing between progress reports. Values below one
    /// second are raised to one second.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval.max(DEFAULT_PROGRESS_INTERVAL);
        self
    }

    /// Attach a progress callback. Defaults to [`LogProgress`].
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the pipeline stops reading input and
    /// finishes normally.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The sampled coordinate.
    pub fn sample_point(&self) -> SamplePoint {
        self.sample_point
    }

    /// The detection thresholds.
    pub fn thresholds(&self) -> DetectionThresholds {
        self.thresholds
    }

    /// The snapshot directory.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// The external clock reference in seconds.
    pub fn base_time_offset(&self) -> i64 {
        self.base_time_offset
    }

    /// The start-frame gate.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// The assumed frame rate.
    pub fn assumed_frame_rate(&self) -> u32 {
        self.assumed_frame_rate
    }

    /// Check the settings that cannot be checked against a source.
    ///
    /// # Errors
    ///
    /// [`CueSnapError::InvalidConfiguration`] if the assumed frame rate is
    /// zero or the output directory path is empty.
    pub fn validate(&self) -> Result<(), CueSnapError> {
        if self.assumed_frame_rate == 0 {
            return Err(CueSnapError::InvalidConfiguration(
                "assumed frame rate must be greater than zero".to_string(),
            ));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(CueSnapError::InvalidConfiguration(
                "output directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
