//! Progress reporting and cancellation support.
//!
//! [`ProgressReporter`] turns the cumulative frame count into at most one
//! [`ProgressReport`] per second of wall-clock time and hands each report to
//! a [`ProgressCallback`]. [`CancellationToken`] lets another thread ask a
//! running pipeline to stop reading input.
//!
//! # Timecodes
//!
//! Frame positions are shown as `HHhMMmSSs` computed from the frame count and
//! the configured *assumed* frame rate (60 by default), not from the stream's
//! timestamps. They are a display convenience: on a stream recorded at a
//! different rate they drift from real playback time.
//!
//! # Rate and ETA
//!
//! The reported rate is the number of frames decoded since the previous
//! report. Reports are spaced at least one second apart, but if the loop
//! stalls for longer the count covers the whole gap, so the figure is frames
//! per report rather than a true per-second rate. The ETA divides the
//! remaining frames by that figure and inherits the same approximation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cuesnap::{PipelineConfig, ProgressCallback, ProgressReport};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, report: &ProgressReport) {
//!         if let Some(pct) = report.percentage {
//!             println!("{pct:.1}% ({report})");
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::new("out").with_progress(Arc::new(PrintProgress));
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A frame position or duration split into hours, minutes, and seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    /// Whole hours (unbounded).
    pub hours: u64,
    /// Minutes, `0..60`.
    pub minutes: u8,
    /// Seconds, `0..60`.
    pub seconds: u8,
}

impl Timecode {
    /// Split a number of whole seconds.
    pub fn from_seconds(total_seconds: u64) -> Self {
        Self {
            hours: total_seconds / 3600,
            minutes: ((total_seconds / 60) % 60) as u8,
            seconds: (total_seconds % 60) as u8,
        }
    }

    /// Position of `frames` under an assumed frame rate, truncated to whole
    /// seconds. A zero rate yields zero.
    pub fn from_frames(frames: u64, assumed_frame_rate: u32) -> Self {
        if assumed_frame_rate == 0 {
            return Self::default();
        }
        Self::from_seconds(frames / u64::from(assumed_frame_rate))
    }

    /// Total whole seconds.
    pub fn as_seconds(&self) -> u64 {
        self.hours * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl Display for Timecode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{:02}h{:02}m{:02}s",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Cumulative decoded frame count.
    pub frame: u64,
    /// Expected total frame count, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Position of `frame` under the assumed frame rate.
    pub position: Timecode,
    /// Frames decoded since the previous report.
    pub frames_since_last: u64,
    /// Estimated time remaining; `None` if the total is unknown or no
    /// frames were decoded since the previous report.
    pub estimated_remaining: Option<Timecode>,
}

impl Display for ProgressReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Frame {:>8} ({}) FPS {:>5}",
            self.frame, self.position, self.frames_since_last
        )?;
        if let Some(eta) = self.estimated_remaining {
            write!(f, " (ETA {eta})")?;
        }
        Ok(())
    }
}

/// What the reporter remembers between reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterState {
    /// When the last report was emitted. `None` before the first one.
    pub last_report: Option<Instant>,
    /// Cumulative frame count at the last report.
    pub last_frame_count: u64,
}

/// Decide whether to emit a report at `now`.
///
/// Emits when no report has been made yet or when at least `interval` has
/// passed since the last one; otherwise returns `None` and the state
/// unchanged.
pub fn report(
    now: Instant,
    cumulative_frames: u64,
    total_frames: Option<u64>,
    state: ReporterState,
    interval: Duration,
    assumed_frame_rate: u32,
) -> (Option<ProgressReport>, ReporterState) {
    let due = state
        .last_report
        .is_none_or(|last| now.saturating_duration_since(last) >= interval);
    if !due {
        return (None, state);
    }

    let frames_since_last = cumulative_frames.saturating_sub(state.last_frame_count);
    let total = total_frames.filter(|&t| t > 0);

    let percentage = total.map(|t| (cumulative_frames.min(t) as f32 / t as f32) * 100.0);

    let estimated_remaining = match total {
        Some(t) if frames_since_last > 0 => Some(Timecode::from_seconds(
            t.saturating_sub(cumulative_frames) / frames_since_last,
        )),
        _ => None,
    };

    let progress = ProgressReport {
        frame: cumulative_frames,
        total,
        percentage,
        position: Timecode::from_frames(cumulative_frames, assumed_frame_rate),
        frames_since_last,
        estimated_remaining,
    };

    let next = ReporterState {
        last_report: Some(now),
        last_frame_count: cumulative_frames,
    };

    (Some(progress), next)
}

/// Rate-limited reporter that owns its [`ReporterState`].
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    state: ReporterState,
    interval: Duration,
    assumed_frame_rate: u32,
}

impl ProgressReporter {
    /// Create a reporter emitting at most once per `interval`.
    pub fn new(interval: Duration, assumed_frame_rate: u32) -> Self {
        Self {
            state: ReporterState::default(),
            interval,
            assumed_frame_rate,
        }
    }

    /// Report against the monotonic clock.
    pub fn report(
        &mut self,
        cumulative_frames: u64,
        total_frames: Option<u64>,
    ) -> Option<ProgressReport> {
        self.report_at(Instant::now(), cumulative_frames, total_frames)
    }

    /// Report against an explicit instant.
    pub fn report_at(
        &mut self,
        now: Instant,
        cumulative_frames: u64,
        total_frames: Option<u64>,
    ) -> Option<ProgressReport> {
        let (emitted, next) = report(
            now,
            cumulative_frames,
            total_frames,
            self.state,
            self.interval,
            self.assumed_frame_rate,
        );
        self.state = next;
        emitted
    }

    /// The current state.
    pub fn state(&self) -> ReporterState {
        self.state
    }
}

/// Trait for receiving progress reports.
///
/// Implementations must be [`Send`] and [`Sync`] so a configuration can be
/// shared with another thread (for example one holding the
/// [`CancellationToken`]).
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called each time the reporter emits.
    fn on_progress(&self, report: &ProgressReport);

    /// Called once when the run ends, whatever the reason.
    fn on_finish(&self) {}
}

/// Logs each report at `info` level. This is the default callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_progress(&self, report: &ProgressReport) {
        log::info!("{report}");
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to make the pipeline
/// stop before its next frame.
///
/// # Example
///
/// ```
/// use cuesnap::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
