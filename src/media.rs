//! FFmpeg-backed frame source.
//!
//! [`MediaSource`] opens a media file, selects its best video stream, and
//! decodes it packet by packet, yielding each frame as a borrowed
//! [`PlanarFrame`]. The decoder runs frame-threaded internally but frames
//! come out one at a time, in decode order.
//!
//! # Example
//!
//! ```no_run
//! use cuesnap::{FrameSource, MediaSource};
//!
//! let mut source = MediaSource::open("recording.mp4")?;
//! println!("{}x{}", source.info().width, source.info().height);
//! while let Some(decoded) = source.next_frame()? {
//!     println!("frame {}", decoded.number);
//! }
//! # Ok::<(), cuesnap::CueSnapError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{context::Context as CodecContext, threading},
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    util::error::EAGAIN,
};

use crate::{
    error::CueSnapError,
    frame::{Plane, PlanarFormat, PlanarFrame},
    source::{DecodedFrame, FrameSource, SourceInfo},
};

/// Worker threads requested from the decoder.
pub const DECODER_THREADS: usize = 16;

/// A video file opened for sequential decoding.
pub struct MediaSource {
    input_context: Input,
    decoder: VideoDecoder,
    video_stream_index: usize,
    info: SourceInfo,
    decoded_frame: VideoFrame,
    decoded_count: u64,
    eof_sent: bool,
    done: bool,
    file_path: PathBuf,
}

impl Debug for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaSource")
            .field("file_path", &self.file_path)
            .field("video_stream_index", &self.video_stream_index)
            .field("info", &self.info)
            .field("decoded_count", &self.decoded_count)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl MediaSource {
    /// Open a media file and prepare its best video stream for decoding.
    ///
    /// Initialises FFmpeg (idempotent), opens the container, selects the
    /// best video stream, and opens a frame-threaded decoder for it.
    ///
    /// # Errors
    ///
    /// - [`CueSnapError::FileOpen`] if the file cannot be opened or its
    ///   decoder cannot be created.
    /// - [`CueSnapError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CueSnapError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();
        let open_error = |reason: String| CueSnapError::FileOpen {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening media file: {}", file_path.display());

        crate::ffmpeg::initialize()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        log::info!(
            "Opened media file: {} (format={}, duration={:.2}s)",
            file_path.display(),
            input_context.format().name(),
            duration.as_secs_f64(),
        );

        let video_stream_index = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .ok_or(CueSnapError::NoVideoStream)?;

        for stream in input_context.streams() {
            if stream.parameters().medium() == Type::Video && stream.index() != video_stream_index
            {
                log::debug!("Ignoring additional video stream {}", stream.index());
            }
        }

        let (decoder, frames_per_second, container_frames) = {
            let stream = input_context
                .stream(video_stream_index)
                .ok_or(CueSnapError::NoVideoStream)?;

            let frame_rate = stream.avg_frame_rate();
            let frames_per_second = if frame_rate.denominator() != 0 {
                frame_rate.numerator() as f64 / frame_rate.denominator() as f64
            } else {
                let rate = stream.rate();
                if rate.denominator() != 0 {
                    rate.numerator() as f64 / rate.denominator() as f64
                } else {
                    0.0
                }
            };

            let mut decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| {
                    open_error(format!(
                        "Failed to read codec parameters for stream {video_stream_index}: {error}"
                    ))
                })?;
            decoder_context.set_threading(threading::Config {
                kind: threading::Type::Frame,
                count: DECODER_THREADS,
                ..Default::default()
            });
            let decoder = decoder_context.decoder().video().map_err(|error| {
                open_error(format!(
                    "Failed to create video decoder for stream {video_stream_index}: {error}"
                ))
            })?;

            (decoder, frames_per_second, stream.frames())
        };

        let total_frames = if container_frames > 0 {
            Some(container_frames as u64)
        } else if frames_per_second > 0.0 && !duration.is_zero() {
            Some((duration.as_secs_f64() * frames_per_second) as u64)
        } else {
            None
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let info = SourceInfo {
            width: decoder.width(),
            height: decoder.height(),
            pixel_format: planar_format(decoder.format()),
            frames_per_second,
            total_frames,
            codec,
        };

        log::debug!(
            "Selected video stream: index={}, {}x{}, {:.2} fps, codec={}, pixel_format={}, frames={:?}",
            video_stream_index,
            info.width,
            info.height,
            info.frames_per_second,
            info.codec,
            info.pixel_format,
            info.total_frames,
        );

        Ok(Self {
            input_context,
            decoder,
            video_stream_index,
            info,
            decoded_frame: VideoFrame::empty(),
            decoded_count: 0,
            eof_sent: false,
            done: false,
            file_path,
        })
    }

    /// Path the source was opened from.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Frames decoded so far.
    pub fn decoded_frames(&self) -> u64 {
        self.decoded_count
    }

    /// Read one packet and feed it to the decoder, or signal end of input.
    fn feed_packet(&mut self) -> Result<(), CueSnapError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input_context) {
            Ok(()) => {
                // Packets from other streams are skipped.
                if packet.stream() == self.video_stream_index {
                    self.decoder.send_packet(&packet).map_err(|error| {
                        CueSnapError::VideoDecodeError(format!(
                            "Error while sending a packet to the decoder: {error}"
                        ))
                    })?;
                }
                Ok(())
            }
            Err(FfmpegError::Eof) => {
                self.decoder.send_eof().map_err(|error| {
                    CueSnapError::VideoDecodeError(format!("Failed to flush the decoder: {error}"))
                })?;
                self.eof_sent = true;
                Ok(())
            }
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(()),
            Err(error) => Err(CueSnapError::VideoDecodeError(format!(
                "Failed to read packet: {error}"
            ))),
        }
    }
}

impl FrameSource for MediaSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CueSnapError> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self.decoder.receive_frame(&mut self.decoded_frame) {
                Ok(()) => break,
                Err(FfmpegError::Eof) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => {}
                Err(error) => {
                    self.done = true;
                    return Err(CueSnapError::VideoDecodeError(format!(
                        "Error while receiving a frame from the decoder: {error}"
                    )));
                }
            }

            if self.eof_sent {
                // Drained without an explicit EOF from the decoder.
                self.done = true;
                return Ok(None);
            }

            if let Err(error) = self.feed_packet() {
                self.done = true;
                return Err(error);
            }
        }

        self.decoded_count += 1;
        let frame = match planar_view(&self.decoded_frame) {
            Ok(frame) => frame,
            Err(error) => {
                self.done = true;
                return Err(error);
            }
        };

        Ok(Some(DecodedFrame {
            number: self.decoded_count,
            frame,
        }))
    }
}

/// Map an FFmpeg pixel format onto the layouts the core understands.
pub(crate) fn planar_format(pixel: Pixel) -> PlanarFormat {
    match pixel {
        Pixel::YUV420P => PlanarFormat::Yuv420p,
        other => PlanarFormat::Other(format!("{other:?}").to_ascii_lowercase()),
    }
}

/// Borrow a decoded FFmpeg frame as a validated [`PlanarFrame`].
fn planar_view(frame: &VideoFrame) -> Result<PlanarFrame<'_>, CueSnapError> {
    let format = planar_format(frame.format());
    // Checked before touching planes: other layouts may have fewer than three.
    format.ensure_supported()?;

    let plane = |index: usize| Plane {
        data: frame.data(index),
        stride: frame.stride(index),
    };

    PlanarFrame::new(
        &format,
        frame.width(),
        frame.height(),
        [plane(0), plane(1), plane(2)],
    )
}
