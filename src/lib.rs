//! # cuesnap
//!
//! Capture still frames from recorded video at the moment an on-screen cue
//! changes.
//!
//! `cuesnap` watches a single pixel of every decoded frame. When that pixel
//! goes from its *armed* colour (by default a bright green: red < 130,
//! green > 180, blue < 160) straight to *dark* (every channel below 25), the
//! whole frame is converted to RGB and saved as a PNG named after the
//! second it occurred in. Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cuesnap::{FramePipeline, MediaSource, PipelineConfig};
//!
//! let mut source = MediaSource::open("recording.mp4")?;
//! let config = PipelineConfig::new("snapshots")
//!     .with_base_time_offset(1_700_000_000)
//!     .with_start_frame(600);
//!
//! let summary = FramePipeline::new(config).run(&mut source)?;
//! for path in &summary.written_paths {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), cuesnap::CueSnapError>(())
//! ```
//!
//! ## Snapshot names
//!
//! A transition on cumulative frame `n` is saved as
//! `{output}/{base + n / 60}.png`. The divisor is the *assumed* frame rate
//! (see [`PipelineConfig::with_assumed_frame_rate`]), not the stream's own
//! rate; two transitions within the same second share a name and the later
//! one wins.
//!
//! ## Features
//!
//! - **Cheap per-frame check**: only one pixel is converted until a
//!   transition fires
//! - **Start gate**: transitions at or before a given frame are tracked but
//!   not exported
//! - **Custom sources and sinks**: [`FrameSource`] and [`SnapshotSink`] let
//!   the driver run without FFmpeg or without touching the filesystem
//! - **Progress & cancellation**: rate-limited [`ProgressReport`]s through a
//!   [`ProgressCallback`] and a cooperative [`CancellationToken`]
//! - **Preflight validation**: configuration is checked against the stream
//!   before decoding starts
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Row-parallel full-frame conversion |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod conversion;
pub mod detector;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod snapshot;
pub mod source;
pub mod validation;

pub use configuration::{
    ArmedSignature, DetectionThresholds, PipelineConfig, SamplePoint, DEFAULT_ASSUMED_FRAME_RATE,
    DEFAULT_DARK_THRESHOLD, DEFAULT_PROGRESS_INTERVAL, DEFAULT_SAMPLE_X, DEFAULT_SAMPLE_Y,
};
pub use conversion::{convert_frame, convert_frame_into, sample_pixel, yuv_to_rgb};
pub use detector::{DetectorState, TransitionDetector, is_armed, is_dark, observe};
pub use error::{CueSnapError, WriteError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{PixelSample, Plane, PlanarFormat, PlanarFrame, RGB_BYTES_PER_PIXEL, RgbFrame};
pub use media::MediaSource;
pub use pipeline::{FrameOutcome, FramePipeline, RunPhase, RunSummary};
pub use progress::{
    CancellationToken, LogProgress, ProgressCallback, ProgressReport, ProgressReporter,
    ReporterState, Timecode, report,
};
pub use snapshot::{
    PngSnapshotWriter, SnapshotSink, snapshot_path, snapshot_timestamp, write_png,
};
pub use source::{DecodedFrame, FrameSource, SourceInfo};
pub use validation::ValidationReport;
