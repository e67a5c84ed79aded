//! Binarization: split a grayscale image into ink and paper.
//!
//! Line drawings are dark strokes on a light background, so pixels
//! whose luminance is strictly below the threshold become foreground.

use image::GrayImage;

use crate::types::BinaryImage;

/// Threshold a grayscale image.
///
/// A pixel is foreground when its value is `< threshold`. A threshold of
/// 0 therefore yields an empty image and raising the threshold can only
/// add foreground pixels.
#[must_use = "returns the binary image"]
pub fn binarize(gray: &GrayImage, threshold: u8) -> BinaryImage {
    let binary = BinaryImage::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] < threshold
    });
    tracing::debug!(
        threshold,
        foreground = binary.foreground_count(),
        "binarized image"
    );
    binary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32) -> GrayImage {
        GrayImage::from_fn(width, 4, |x, _| image::Luma([(x * 255 / (width - 1)) as u8]))
    }

    #[test]
    fn dark_pixels_are_foreground() {
        let gray = GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 10 } else { 240 }]));
        let binary = binarize(&gray, 127);
        assert!(binary.get(0, 0));
        assert!(!binary.get(1, 0));
    }

    #[test]
    fn threshold_is_strict() {
        let gray = GrayImage::from_pixel(1, 1, image::Luma([127]));
        assert!(!binarize(&gray, 127).get(0, 0));
        assert!(binarize(&gray, 128).get(0, 0));
    }

    #[test]
    fn uniform_white_is_empty() {
        let gray = GrayImage::from_pixel(20, 20, image::Luma([255]));
        assert_eq!(binarize(&gray, 127).foreground_count(), 0);
    }

    #[test]
    fn zero_threshold_is_empty() {
        let gray = GrayImage::from_pixel(5, 5, image::Luma([0]));
        assert_eq!(binarize(&gray, 0).foreground_count(), 0);
    }

    #[test]
    fn foreground_count_is_monotone_in_threshold() {
        let gray = gradient(64);
        let mut previous = 0;
        for t in 0..=255u8 {
            let count = binarize(&gray, t).foreground_count();
            assert!(count >= previous, "threshold {t}: {count} < {previous}");
            previous = count;
        }
    }

    #[test]
    fn dimensions_are_preserved() {
        let gray = gradient(13);
        let binary = binarize(&gray, 100);
        assert_eq!(binary.width(), 13);
        assert_eq!(binary.height(), 4);
    }
}
