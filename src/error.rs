//! Error types for the `cuesnap` crate.
//!
//! Two error types exist because the pipeline treats failures in two very
//! different ways:
//!
//! - [`CueSnapError`] covers setup and decode failures. These are fatal: they
//!   bubble out of [`FramePipeline::run`](crate::FramePipeline::run) and end
//!   the run.
//! - [`WriteError`] covers snapshot export failures. The pipeline logs them
//!   and keeps going; they never surface past the driver.

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// The error type for setup, configuration, and decode failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CueSnapError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The decoded frames are not planar YUV 4:2:0.
    #[error("Unsupported pixel format: {0} (expected planar YUV 4:2:0)")]
    UnsupportedFormat(String),

    /// Plane sizes or strides handed over by the decoder do not describe a
    /// valid frame.
    #[error("Invalid frame geometry: {0}")]
    InvalidFrameGeometry(String),

    /// The configured sample coordinate lies outside the frame.
    #[error("Sample point ({x}, {y}) lies outside the {width}x{height} frame")]
    SamplePointOutOfBounds {
        /// Configured column.
        x: u32,
        /// Configured row.
        y: u32,
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },

    /// The pipeline configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),
}

/// A snapshot could not be exported.
///
/// Returned by [`SnapshotSink::write`](crate::SnapshotSink::write). Both
/// variants are recoverable from the pipeline's point of view.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// The target file could not be created or written.
    #[error("Failed to write snapshot {path}: {source}")]
    Io {
        /// Target path of the snapshot.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: IoError,
    },

    /// The PNG encoder rejected the image.
    #[error("Failed to encode snapshot {path}: {reason}")]
    Encode {
        /// Target path of the snapshot.
        path: PathBuf,
        /// Encoder message.
        reason: String,
    },
}

impl WriteError {
    /// Classify an [`ImageError`] raised while encoding to `path`.
    pub(crate) fn from_image(path: PathBuf, error: ImageError) -> Self {
        match error {
            ImageError::IoError(source) => WriteError::Io { path, source },
            other => WriteError::Encode {
                path,
                reason: other.to_string(),
            },
        }
    }

    /// Path of the snapshot that failed.
    pub fn path(&self) -> &PathBuf {
        match self {
            WriteError::Io { path, .. } | WriteError::Encode { path, .. } => path,
        }
    }
}
