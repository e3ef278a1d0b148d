//! Snapshot naming and PNG export.
//!
//! A snapshot for cumulative frame `n` is named after its timestamp in
//! seconds, `base_time_offset + floor(n / assumed_frame_rate)`, and written
//! as `{output_directory}/{timestamp}.png`: 8-bit RGB, no colour profile, no
//! interlacing, default compression.
//!
//! Two transitions inside the same second map to the same file; the later
//! one replaces the earlier.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{
    ExtendedColorType, ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{error::WriteError, frame::RgbFrame};

/// Timestamp, in seconds, used to name the snapshot of frame
/// `cumulative_frames`.
///
/// `assumed_frame_rate` must be non-zero; a zero rate is treated as one.
pub fn snapshot_timestamp(
    base_time_offset: i64,
    cumulative_frames: u64,
    assumed_frame_rate: u32,
) -> i64 {
    let seconds = cumulative_frames / u64::from(assumed_frame_rate.max(1));
    base_time_offset.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Path of the snapshot for `timestamp_seconds` inside `output_directory`.
pub fn snapshot_path(output_directory: &Path, timestamp_seconds: i64) -> PathBuf {
    output_directory.join(format!("{timestamp_seconds}.png"))
}

/// Destination for exported snapshots.
///
/// The pipeline calls [`write`](SnapshotSink::write) only after a transition
/// fires and treats every error as recoverable.
pub trait SnapshotSink {
    /// Export `image` under `timestamp_seconds` and return where it went.
    fn write(&mut self, image: &RgbFrame, timestamp_seconds: i64) -> Result<PathBuf, WriteError>;
}

/// Writes snapshots as PNG files into a directory.
///
/// The directory is not created; a missing directory makes every write
/// fail with [`WriteError::Io`].
#[derive(Debug, Clone)]
pub struct PngSnapshotWriter {
    output_directory: PathBuf,
}

impl PngSnapshotWriter {
    /// Create a writer targeting `output_directory`.
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    /// The target directory.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

impl SnapshotSink for PngSnapshotWriter {
    fn write(&mut self, image: &RgbFrame, timestamp_seconds: i64) -> Result<PathBuf, WriteError> {
        let path = snapshot_path(&self.output_directory, timestamp_seconds);
        if path.exists() {
            log::debug!("Replacing existing snapshot {}", path.display());
        }
        write_png(image, &path)?;
        Ok(path)
    }
}

/// Encode `image` as an 8-bit RGB PNG at `path`.
///
/// A file left half-written by a failed encode is removed.
pub fn write_png(image: &RgbFrame, path: &Path) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let result = encode_png(image, &mut writer, path).and_then(|()| {
        writer.flush().map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(path);
    }
    result
}

fn encode_png<W: Write>(image: &RgbFrame, writer: W, path: &Path) -> Result<(), WriteError> {
    let pixels = image.to_packed();
    let encoder =
        PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder
        .write_image(&pixels, image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|error| WriteError::from_image(path.to_path_buf(), error))
}
