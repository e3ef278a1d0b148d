//! YUV 4:2:0 to RGB colour conversion.
//!
//! All conversions use the BT.601 limited-range matrix:
//!
//! ```text
//! R = 1.164 (Y - 16)                   + 1.596 (V - 128)
//! G = 1.164 (Y - 16) - 0.392 (U - 128) - 0.813 (V - 128)
//! B = 1.164 (Y - 16) + 2.017 (U - 128)
//! ```
//!
//! Each channel is clamped to `[0, 255]` and then rounded to the nearest
//! integer. [`sample_pixel`] and [`convert_frame`] share this transform, so a
//! pixel in an exported snapshot always equals what the detector sampled.
//!
//! [`convert_frame`] touches every pixel and is only worth calling once the
//! single-pixel check has fired.

use crate::{
    configuration::SamplePoint,
    error::CueSnapError,
    frame::{PixelSample, PlanarFrame, RGB_BYTES_PER_PIXEL, RgbFrame},
};

const LUMA_OFFSET: f64 = 16.0;
const CHROMA_OFFSET: f64 = 128.0;
const LUMA_GAIN: f64 = 1.164;
const RED_FROM_V: f64 = 1.596;
const GREEN_FROM_U: f64 = 0.392;
const GREEN_FROM_V: f64 = 0.813;
const BLUE_FROM_U: f64 = 2.017;

/// Convert one `(Y, U, V)` triple to RGB.
#[inline]
pub fn yuv_to_rgb(luma: u8, chroma_blue: u8, chroma_red: u8) -> PixelSample {
    let y = LUMA_GAIN * (f64::from(luma) - LUMA_OFFSET);
    let u = f64::from(chroma_blue) - CHROMA_OFFSET;
    let v = f64::from(chroma_red) - CHROMA_OFFSET;

    PixelSample::new(
        clamp_channel(y + RED_FROM_V * v),
        clamp_channel(y - GREEN_FROM_U * u - GREEN_FROM_V * v),
        clamp_channel(y + BLUE_FROM_U * u),
    )
}

#[inline]
fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

/// Convert the single pixel at `point` without touching the rest of the
/// frame.
///
/// # Errors
///
/// [`CueSnapError::SamplePointOutOfBounds`] if `point` is outside the frame.
pub fn sample_pixel(
    frame: &PlanarFrame<'_>,
    point: SamplePoint,
) -> Result<PixelSample, CueSnapError> {
    if point.x >= frame.width() || point.y >= frame.height() {
        return Err(CueSnapError::SamplePointOutOfBounds {
            x: point.x,
            y: point.y,
            width: frame.width(),
            height: frame.height(),
        });
    }

    let (x, y) = (point.x as usize, point.y as usize);
    let (u, v) = frame.chroma_at(x, y);
    Ok(yuv_to_rgb(frame.luma_at(x, y), u, v))
}

/// Convert a whole frame into a newly allocated [`RgbFrame`].
pub fn convert_frame(frame: &PlanarFrame<'_>) -> RgbFrame {
    let mut output = RgbFrame::new(frame.width(), frame.height());
    convert_frame_into(frame, &mut output);
    output
}

/// Convert a whole frame into `output`, resizing it to the frame's
/// dimensions if needed.
///
/// Rows are converted in parallel when the `rayon` feature is enabled; the
/// result is identical either way.
pub fn convert_frame_into(frame: &PlanarFrame<'_>, output: &mut RgbFrame) {
    output.reshape(frame.width(), frame.height());

    #[cfg(feature = "rayon")]
    {
        use ::rayon::iter::{IndexedParallelIterator, ParallelIterator};

        output
            .par_rows_mut()
            .enumerate()
            .for_each(|(y, row)| convert_row(frame, y, row));
    }

    #[cfg(not(feature = "rayon"))]
    for (y, row) in output.rows_mut().enumerate() {
        convert_row(frame, y, row);
    }
}

fn convert_row(frame: &PlanarFrame<'_>, y: usize, row: &mut [u8]) {
    let luma = frame.luma_row(y);
    let (chroma_blue, chroma_red) = frame.chroma_rows(y);

    for (x, (pixel, &luma_value)) in row
        .chunks_exact_mut(RGB_BYTES_PER_PIXEL)
        .zip(luma)
        .enumerate()
    {
        let rgb = yuv_to_rgb(luma_value, chroma_blue[x / 2], chroma_red[x / 2]);
        pixel[0] = rgb.red;
        pixel[1] = rgb.green;
        pixel[2] = rgb.blue;
    }
}
