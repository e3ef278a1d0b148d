//! Single-pixel transition detection.
//!
//! The detector remembers one thing between frames: the previous sample. A
//! transition fires when that previous sample was *armed* and the current
//! sample is *dark*. Frame order matters, since the event is an edge in time.
//!
//! [`observe`] is the pure form that threads [`DetectorState`] through by
//! value. [`TransitionDetector`] wraps it for callers that prefer to keep
//! the state inside an object.

use crate::{
    configuration::{ArmedSignature, DetectionThresholds},
    frame::PixelSample,
};

/// Everything the detector remembers across frames.
///
/// Starts as an all-zero sample, which is never armed, so the first frame of
/// a run cannot fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorState {
    /// The sample observed on the previous frame.
    pub previous: PixelSample,
}

/// `true` if every channel is below `dark_max`.
#[inline]
pub fn is_dark(sample: PixelSample, dark_max: u8) -> bool {
    sample.red < dark_max && sample.green < dark_max && sample.blue < dark_max
}

/// `true` if `sample` matches the armed colour signature.
#[inline]
pub fn is_armed(sample: PixelSample, armed: ArmedSignature) -> bool {
    sample.red < armed.red_max && sample.green > armed.green_min && sample.blue < armed.blue_max
}

/// Decide whether `current` completes an armed-to-dark edge.
///
/// Returns the decision, made against the prior state, and the next state,
/// which always holds `current` regardless of the decision.
pub fn observe(
    thresholds: &DetectionThresholds,
    current: PixelSample,
    state: DetectorState,
) -> (bool, DetectorState) {
    let fired =
        is_armed(state.previous, thresholds.armed) && is_dark(current, thresholds.dark_max);
    (fired, DetectorState { previous: current })
}

/// A detector that owns its state.
#[derive(Debug, Clone)]
pub struct TransitionDetector {
    thresholds: DetectionThresholds,
    state: DetectorState,
}

impl TransitionDetector {
    /// Create a detector with an all-zero history.
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self {
            thresholds,
            state: DetectorState::default(),
        }
    }

    /// Feed the next frame's sample. Returns `true` when a transition fires.
    pub fn observe(&mut self, current: PixelSample) -> bool {
        let (fired, next) = observe(&self.thresholds, current, self.state);
        self.state = next;
        fired
    }

    /// The current state.
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }
}
