//! Frame buffer types.
//!
//! [`PlanarFrame`] is a borrowed, validated view of one decoded YUV frame.
//! [`RgbFrame`] is the owned, interleaved RGB buffer produced by a full
//! conversion and handed to the snapshot writer. [`PixelSample`] is a single
//! converted pixel.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::CueSnapError;

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanarFormat {
    /// Planar YUV 4:2:0, 8 bits per sample. The only layout the core handles.
    Yuv420p,
    /// Any other layout, kept by name for error messages.
    Other(String),
}

impl PlanarFormat {
    /// Fail with [`CueSnapError::UnsupportedFormat`] unless this is
    /// [`PlanarFormat::Yuv420p`].
    pub fn ensure_supported(&self) -> Result<(), CueSnapError> {
        match self {
            PlanarFormat::Yuv420p => Ok(()),
            PlanarFormat::Other(name) => Err(CueSnapError::UnsupportedFormat(name.clone())),
        }
    }
}

impl Display for PlanarFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PlanarFormat::Yuv420p => write!(f, "yuv420p"),
            PlanarFormat::Other(name) => write!(f, "{name}"),
        }
    }
}

/// One sample plane: its bytes and the distance between rows.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    /// Raw plane bytes.
    pub data: &'a [u8],
    /// Bytes per row, including any alignment padding.
    pub stride: usize,
}

/// A borrowed view of one planar YUV 4:2:0 frame.
///
/// The decoder owns the memory and may overwrite it on the next decode call,
/// so a `PlanarFrame` never outlives the processing step it was created for.
/// Geometry is checked once in [`PlanarFrame::new`]; after that every luma
/// sample `(x, y)` and chroma sample `(x / 2, y / 2)` inside the frame can be
/// indexed without bounds failures.
#[derive(Debug, Clone, Copy)]
pub struct PlanarFrame<'a> {
    width: u32,
    height: u32,
    luma: Plane<'a>,
    chroma_blue: Plane<'a>,
    chroma_red: Plane<'a>,
}

impl<'a> PlanarFrame<'a> {
    /// Build a validated view over decoder-supplied planes.
    ///
    /// `planes` are ordered luma, chroma-blue (U / Cb), chroma-red (V / Cr).
    ///
    /// # Errors
    ///
    /// - [`CueSnapError::UnsupportedFormat`] unless `format` is YUV 4:2:0.
    /// - [`CueSnapError::InvalidFrameGeometry`] if a dimension is zero, a
    ///   stride is narrower than its plane, or a plane is too short for its
    ///   rows.
    pub fn new(
        format: &PlanarFormat,
        width: u32,
        height: u32,
        planes: [Plane<'a>; 3],
    ) -> Result<Self, CueSnapError> {
        format.ensure_supported()?;

        if width == 0 || height == 0 {
            return Err(CueSnapError::InvalidFrameGeometry(format!(
                "frame dimensions {width}x{height} must be positive"
            )));
        }

        let [luma, chroma_blue, chroma_red] = planes;
        let chroma_width = width.div_ceil(2) as usize;
        let chroma_height = height.div_ceil(2) as usize;

        check_plane("luma", &luma, width as usize, height as usize)?;
        check_plane("chroma-blue", &chroma_blue, chroma_width, chroma_height)?;
        check_plane("chroma-red", &chroma_red, chroma_width, chroma_height)?;

        Ok(Self {
            width,
            height,
            luma,
            chroma_blue,
            chroma_red,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma sample at `(x, y)`. Caller guarantees the point is in the frame.
    #[inline]
    pub(crate) fn luma_at(&self, x: usize, y: usize) -> u8 {
        self.luma.data[y * self.luma.stride + x]
    }

    /// Chroma pair `(U, V)` covering luma position `(x, y)`.
    #[inline]
    pub(crate) fn chroma_at(&self, x: usize, y: usize) -> (u8, u8) {
        let (cx, cy) = (x / 2, y / 2);
        (
            self.chroma_blue.data[cy * self.chroma_blue.stride + cx],
            self.chroma_red.data[cy * self.chroma_red.stride + cx],
        )
    }

    /// Luma row `y`, trimmed to the frame width.
    #[inline]
    pub(crate) fn luma_row(&self, y: usize) -> &'a [u8] {
        let start = y * self.luma.stride;
        &self.luma.data[start..start + self.width as usize]
    }

    /// Chroma rows covering luma row `y`, trimmed to the chroma width.
    #[inline]
    pub(crate) fn chroma_rows(&self, y: usize) -> (&'a [u8], &'a [u8]) {
        let chroma_width = self.width.div_ceil(2) as usize;
        let cy = y / 2;
        let blue_start = cy * self.chroma_blue.stride;
        let red_start = cy * self.chroma_red.stride;
        (
            &self.chroma_blue.data[blue_start..blue_start + chroma_width],
            &self.chroma_red.data[red_start..red_start + chroma_width],
        )
    }
}

fn check_plane(
    name: &str,
    plane: &Plane<'_>,
    row_bytes: usize,
    rows: usize,
) -> Result<(), CueSnapError> {
    if plane.stride < row_bytes {
        return Err(CueSnapError::InvalidFrameGeometry(format!(
            "{name} stride {} is narrower than its {row_bytes}-byte rows",
            plane.stride
        )));
    }

    // The last row only needs its visible bytes; padding may be cut off.
    let required = plane
        .stride
        .checked_mul(rows - 1)
        .and_then(|bytes| bytes.checked_add(row_bytes))
        .ok_or_else(|| {
            CueSnapError::InvalidFrameGeometry(format!("{name} plane size overflows"))
        })?;

    if plane.data.len() < required {
        return Err(CueSnapError::InvalidFrameGeometry(format!(
            "{name} plane holds {} bytes, {required} required",
            plane.data.len()
        )));
    }

    Ok(())
}

/// One converted pixel at the configured sample point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelSample {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl PixelSample {
    /// Create a sample from its three channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl Display for PixelSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "rgb({}, {}, {})", self.red, self.green, self.blue)
    }
}

/// Bytes per interleaved RGB pixel.
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// An interleaved 8-bit RGB buffer, row-major.
///
/// `stride` may exceed `width * 3` when rows are padded for alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl RgbFrame {
    /// Allocate a zeroed, tightly packed buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * RGB_BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// # Errors
    ///
    /// [`CueSnapError::InvalidFrameGeometry`] if `stride` is narrower than a
    /// row or `data` is too short for `height` rows.
    pub fn from_raw(
        width: u32,
        height: u32,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, CueSnapError> {
        let row_bytes = width as usize * RGB_BYTES_PER_PIXEL;
        if stride < row_bytes {
            return Err(CueSnapError::InvalidFrameGeometry(format!(
                "RGB stride {stride} is narrower than its {row_bytes}-byte rows"
            )));
        }
        let required = stride.checked_mul(height as usize).ok_or_else(|| {
            CueSnapError::InvalidFrameGeometry(format!(
                "RGB buffer size overflows ({stride} bytes x {height} rows)"
            ))
        })?;
        if data.len() < required {
            return Err(CueSnapError::InvalidFrameGeometry(format!(
                "RGB buffer holds {} bytes, {required} required",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw buffer, including any row padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PixelSample> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * RGB_BYTES_PER_PIXEL;
        Some(PixelSample::new(
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ))
    }

    /// Copy the pixels into a tightly packed buffer (`stride == width * 3`).
    pub fn to_packed(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * RGB_BYTES_PER_PIXEL;
        let rows = self.height as usize;

        if self.stride == row_bytes {
            self.data[..row_bytes * rows].to_vec()
        } else {
            let mut buffer = Vec::with_capacity(row_bytes * rows);
            for row in 0..rows {
                let row_start = row * self.stride;
                buffer.extend_from_slice(&self.data[row_start..row_start + row_bytes]);
            }
            buffer
        }
    }

    /// Resize to `width` x `height`, reusing the allocation when possible.
    pub(crate) fn reshape(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.stride = width as usize * RGB_BYTES_PER_PIXEL;
        self.data.resize(self.stride * height as usize, 0);
    }

    /// Mutable rows, each `stride` bytes long.
    pub(crate) fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        let stride = self.stride;
        let used = stride * self.height as usize;
        self.data[..used].chunks_exact_mut(stride)
    }

    #[cfg(feature = "rayon")]
    pub(crate) fn par_rows_mut(&mut self) -> ::rayon::slice::ChunksExactMut<'_, u8> {
        use ::rayon::slice::ParallelSliceMut;

        let stride = self.stride;
        let used = stride * self.height as usize;
        self.data[..used].par_chunks_exact_mut(stride)
    }
}
