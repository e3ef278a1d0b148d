//! Start-up checks of a configuration against a source.
//!
//! [`preflight`] runs before the first frame is decoded and returns a
//! [`ValidationReport`]. Errors in the report stop the run; warnings are
//! logged and the run proceeds.
//!
//! # Example
//!
//! ```no_run
//! use cuesnap::{FrameSource, MediaSource, PipelineConfig, validation};
//!
//! let source = MediaSource::open("recording.mp4")?;
//! let config = PipelineConfig::new("snapshots");
//! let report = validation::preflight(&config, source.info());
//! print!("{report}");
//! # Ok::<(), cuesnap::CueSnapError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{configuration::PipelineConfig, progress::Timecode, source::SourceInfo};

/// How far the assumed frame rate may be from the stream's before a warning.
const FRAME_RATE_TOLERANCE: f64 = 0.5;

/// Findings of a preflight check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Issues that may make results misleading but do not stop the run.
    pub warnings: Vec<String>,
    /// Issues that prevent the run.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of findings.
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Check `config` against the stream described by `info`.
///
/// The pixel format is not checked here; the pipeline rejects unsupported
/// formats with a dedicated error before calling this.
pub fn preflight(config: &PipelineConfig, info: &SourceInfo) -> ValidationReport {
    let mut report = ValidationReport::default();

    // ── Geometry ───────────────────────────────────────────────────
    if info.width == 0 || info.height == 0 {
        report.errors.push(format!(
            "Invalid video dimensions: {}x{}",
            info.width, info.height
        ));
    } else if !config.sample_point.fits(info.width, info.height) {
        report.errors.push(format!(
            "Sample point ({}, {}) lies outside the {}x{} frame",
            config.sample_point.x, config.sample_point.y, info.width, info.height
        ));
    }

    // ── Frame count ────────────────────────────────────────────────
    let total = config.total_frames.or(info.total_frames);
    match total {
        Some(frames) => report.info.push(format!(
            "Video length: {frames} frames ({})",
            Timecode::from_frames(frames, config.assumed_frame_rate)
        )),
        None => report
            .warnings
            .push("Total frame count unknown: progress will not show an ETA".to_string()),
    }

    // ── Time base ──────────────────────────────────────────────────
    let assumed = f64::from(config.assumed_frame_rate);
    if info.frames_per_second > 0.0
        && (info.frames_per_second - assumed).abs() > FRAME_RATE_TOLERANCE
    {
        report.warnings.push(format!(
            "Stream runs at {:.3} fps but timestamps assume {} fps: snapshot names and timecodes will drift from playback time",
            info.frames_per_second, config.assumed_frame_rate
        ));
    }

    // ── Gate ───────────────────────────────────────────────────────
    if let Some(frames) = total {
        if config.start_frame >= frames {
            report.warnings.push(format!(
                "Start frame {} is not below the video length ({frames} frames): nothing will be exported",
                config.start_frame
            ));
        }
    }

    // ── Output ─────────────────────────────────────────────────────
    if !config.output_directory.is_dir() {
        report.warnings.push(format!(
            "Output directory {} does not exist: every snapshot write will fail",
            config.output_directory.display()
        ));
    }

    report
}
