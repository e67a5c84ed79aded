//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! single-channel grayscale image for the binarizer.
//!
//! This is the first step of the raster pipeline: raw bytes in,
//! `GrayImage` out.

use image::GrayImage;

use crate::types::PipelineError;

/// Decode raw image bytes and convert to grayscale.
///
/// Supports whatever the `image` crate is built to decode. Multi-channel
/// input is reduced with the Rec. 709 luminance weights the `image`
/// crate uses (`0.2126*R + 0.7152*G + 0.0722*B`). Transparent pixels are composited
/// over white first, so an unpainted region of a PNG reads as paper
/// rather than ink.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    if !img.color().has_alpha() {
        return Ok(img.to_luma8());
    }

    let rgba = img.to_rgba8();
    let gray = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = f64::from(a) / 255.0;
        let luma = 0.0722f64.mul_add(
            f64::from(b),
            0.2126f64.mul_add(f64::from(r), 0.7152 * f64::from(g)),
        );
        let over_white = alpha.mul_add(luma, (1.0 - alpha) * 255.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = over_white.round().clamp(0.0, 255.0) as u8;
        image::Luma([value])
    });
    Ok(gray)
}
