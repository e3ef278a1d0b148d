//! Synthetic frames, sources and sinks shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use cuesnap::{
    CueSnapError, DecodedFrame, FrameSource, PlanarFormat, PlanarFrame, Plane, RgbFrame,
    SourceInfo, WriteError,
};

/// YUV that converts to rgb(0, 255, 1): armed under the default signature.
pub const ARMED_YUV: (u8, u8, u8) = (145, 54, 34);
/// YUV that converts to rgb(0, 0, 0).
pub const DARK_YUV: (u8, u8, u8) = (16, 128, 128);
/// YUV that converts to rgb(130, 130, 130): neither armed nor dark.
pub const NEUTRAL_YUV: (u8, u8, u8) = (128, 128, 128);

/// An owned planar YUV 4:2:0 frame.
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    pub width: u32,
    pub height: u32,
    pub luma_stride: usize,
    pub chroma_stride: usize,
    pub luma: Vec<u8>,
    pub chroma_blue: Vec<u8>,
    pub chroma_red: Vec<u8>,
}

impl SyntheticFrame {
    /// A frame filled with one YUV value and `padding` extra bytes per row.
    pub fn uniform(width: u32, height: u32, (y, u, v): (u8, u8, u8), padding: usize) -> Self {
        let luma_stride = width as usize + padding;
        let chroma_stride = width.div_ceil(2) as usize + padding;
        let chroma_rows = height.div_ceil(2) as usize;
        Self {
            width,
            height,
            luma_stride,
            chroma_stride,
            luma: vec![y; luma_stride * height as usize],
            chroma_blue: vec![u; chroma_stride * chroma_rows],
            chroma_red: vec![v; chroma_stride * chroma_rows],
        }
    }

    /// Set the luma sample at `(x, y)`.
    pub fn set_luma(&mut self, x: u32, y: u32, value: u8) {
        self.luma[y as usize * self.luma_stride + x as usize] = value;
    }

    /// Set the chroma pair covering luma position `(x, y)`.
    pub fn set_chroma(&mut self, x: u32, y: u32, u: u8, v: u8) {
        let offset = (y / 2) as usize * self.chroma_stride + (x / 2) as usize;
        self.chroma_blue[offset] = u;
        self.chroma_red[offset] = v;
    }

    /// Paint the 2x2 block containing `(x, y)` with one YUV value.
    pub fn paint(&mut self, x: u32, y: u32, (luma, u, v): (u8, u8, u8)) {
        let (bx, by) = (x & !1, y & !1);
        for dy in 0..2 {
            for dx in 0..2 {
                if bx + dx < self.width && by + dy < self.height {
                    self.set_luma(bx + dx, by + dy, luma);
                }
            }
        }
        self.set_chroma(x, y, u, v);
    }

    pub fn view(&self) -> PlanarFrame<'_> {
        PlanarFrame::new(
            &PlanarFormat::Yuv420p,
            self.width,
            self.height,
            [
                Plane {
                    data: &self.luma,
                    stride: self.luma_stride,
                },
                Plane {
                    data: &self.chroma_blue,
                    stride: self.chroma_stride,
                },
                Plane {
                    data: &self.chroma_red,
                    stride: self.chroma_stride,
                },
            ],
        )
        .expect("synthetic frame geometry is valid")
    }
}

/// A frame source replaying owned frames, optionally failing part way.
pub struct ScriptedSource {
    info: SourceInfo,
    frames: Vec<SyntheticFrame>,
    numbers: Vec<u64>,
    position: usize,
    fail_after: Option<usize>,
    pub frames_served: usize,
}

impl ScriptedSource {
    pub fn new(frames: Vec<SyntheticFrame>) -> Self {
        let (width, height) = frames
            .first()
            .map_or((0, 0), |frame| (frame.width, frame.height));
        let numbers = (1..=frames.len() as u64).collect();
        let info = SourceInfo {
            width,
            height,
            pixel_format: PlanarFormat::Yuv420p,
            frames_per_second: 60.0,
            total_frames: Some(frames.len() as u64),
            codec: "synthetic".to_string(),
        };
        Self {
            info,
            frames,
            numbers,
            position: 0,
            fail_after: None,
            frames_served: 0,
        }
    }

    /// Frames built from one YUV value each, all `width` x `height`.
    pub fn from_colours(width: u32, height: u32, colours: &[(u8, u8, u8)]) -> Self {
        Self::new(
            colours
                .iter()
                .map(|&colour| SyntheticFrame::uniform(width, height, colour, 0))
                .collect(),
        )
    }

    /// Override the frame numbers handed out.
    pub fn with_numbers(mut self, numbers: Vec<u64>) -> Self {
        assert_eq!(numbers.len(), self.frames.len());
        self.numbers = numbers;
        self
    }

    /// Return a decode error instead of frame `index` (0-based).
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_after = Some(index);
        self
    }

    pub fn with_info(mut self, info: SourceInfo) -> Self {
        self.info = info;
        self
    }

    pub fn info_mut(&mut self) -> &mut SourceInfo {
        &mut self.info
    }
}

impl FrameSource for ScriptedSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame<'_>>, CueSnapError> {
        if self.fail_after == Some(self.position) {
            return Err(CueSnapError::VideoDecodeError(
                "scripted decode failure".to_string(),
            ));
        }
        let Some(frame) = self.frames.get(self.position) else {
            return Ok(None);
        };
        let number = self.numbers[self.position];
        self.position += 1;
        self.frames_served += 1;
        Ok(Some(DecodedFrame {
            number,
            frame: frame.view(),
        }))
    }
}

/// A sink that keeps written images in memory, or fails every write.
#[derive(Default)]
pub struct MemorySink {
    pub written: Vec<(i64, RgbFrame)>,
    pub fail: bool,
}

impl cuesnap::SnapshotSink for MemorySink {
    fn write(&mut self, image: &RgbFrame, timestamp_seconds: i64) -> Result<PathBuf, WriteError> {
        let path = PathBuf::from(format!("memory/{timestamp_seconds}.png"));
        if self.fail {
            return Err(WriteError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.written.push((timestamp_seconds, image.clone()));
        Ok(path)
    }
}
