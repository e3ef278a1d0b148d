//! The boundary between the pipeline and whatever decodes the video.
//!
//! A [`FrameSource`] hands out one [`DecodedFrame`] at a time, in
//! presentation order. The frame borrows the source, so the borrow checker
//! guarantees the pipeline has finished with a frame before the source is
//! asked to decode the next one into the same memory.
//!
//! [`MediaSource`](crate::MediaSource) is the FFmpeg-backed implementation;
//! tests and embedders can supply their own.

use crate::{
    error::CueSnapError,
    frame::{PlanarFormat, PlanarFrame},
};

/// Stream properties known before the first frame is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout the decoder will produce.
    pub pixel_format: PlanarFormat,
    /// Stream frame rate, or 0.0 if unknown.
    pub frames_per_second: f64,
    /// Expected number of frames, if known.
    pub total_frames: Option<u64>,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

/// One decoded frame and its position in the run.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    /// Cumulative decoded-frame count, 1-based. Non-decreasing, but may skip
    /// values if the decoder drops frames.
    pub number: u64,
    /// The frame's planes, valid until the next call to
    /// [`FrameSource::next_frame`].
    pub frame: PlanarFrame<'a>,
}

/// A producer of planar frames.
pub trait FrameSource {
    /// Stream properties, available before decoding starts.
    fn info(&self) -> &SourceInfo;

    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` at end of stream. Any error is terminal: the
    /// pipeline does not call `next_frame` again after one.
    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CueSnapError>;
}
