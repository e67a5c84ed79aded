//! Morphological thinning: reduce strokes to 1-pixel-wide centerlines.
//!
//! Pencil and marker strokes vary from one to many pixels in width.
//! Tracing their borders gives two offset outlines per stroke; thinning
//! them first gives one centerline the tool can follow.
//!
//! The neighbourhood tests are those of Zhang & Suen (1984), with two
//! subiterations per pass that peel the south-east and north-west
//! boundaries alternately. Unlike the textbook parallel form, the
//! candidates of each subiteration are removed one at a time and each
//! removal is re-checked against the live image. A pixel is only removed
//! while it is *simple* (its foreground neighbours form a single run
//! around it) and is not an endpoint, so:
//!
//! - no connected component ever disappears (a 2x2 block or a lone
//!   pixel keeps at least one pixel),
//! - connectivity within a component is preserved,
//! - the result is a fixed point, so thinning is idempotent.

use crate::types::BinaryImage;

/// Offsets of the eight neighbours `P2..P9` in clockwise order starting
/// north: N, NE, E, SE, S, SW, W, NW.
const RING: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

const N: usize = 0;
const E: usize = 2;
const S: usize = 4;
const W: usize = 6;

#[derive(Debug, Clone, Copy)]
enum Subiteration {
    /// Removes south and east boundary pixels and north-west corners.
    SouthEast,
    /// Removes north and west boundary pixels and south-east corners.
    NorthWest,
}

impl Subiteration {
    const fn admits(self, ring: &[bool; 8]) -> bool {
        match self {
            Self::SouthEast => !(ring[N] && ring[E] && ring[S]) && !(ring[E] && ring[S] && ring[W]),
            Self::NorthWest => !(ring[N] && ring[E] && ring[W]) && !(ring[N] && ring[S] && ring[W]),
        }
    }
}

/// Thin every foreground region to a 1-pixel-wide skeleton.
///
/// Runs until a full pass removes nothing. The output has the same
/// dimensions as the input and never more foreground pixels.
#[must_use = "returns the thinned image"]
pub fn skeletonize(binary: &BinaryImage) -> BinaryImage {
    let mut image = binary.clone();
    let mut passes = 0usize;
    let mut removed_total = 0usize;

    loop {
        passes += 1;
        let mut removed = 0usize;

        for step in [Subiteration::SouthEast, Subiteration::NorthWest] {
            let candidates: Vec<(u32, u32)> = foreground_pixels(&image)
                .filter(|&(x, y)| {
                    let ring = neighbourhood(&image, x, y);
                    is_removable(&ring) && step.admits(&ring)
                })
                .collect();

            for (x, y) in candidates {
                if is_removable(&neighbourhood(&image, x, y)) {
                    image.set(x, y, false);
                    removed += 1;
                }
            }
        }

        removed_total += removed;
        if removed == 0 {
            break;
        }
    }

    tracing::debug!(
        passes,
        removed = removed_total,
        remaining = image.foreground_count(),
        "skeletonized image"
    );
    image
}

/// Coordinates of all foreground pixels in raster order.
fn foreground_pixels(image: &BinaryImage) -> impl Iterator<Item = (u32, u32)> + '_ {
    let width = image.width();
    image
        .as_slice()
        .iter()
        .enumerate()
        .filter(|&(_, &on)| on)
        .map(move |(i, _)| {
            #[allow(clippy::cast_possible_truncation)]
            let (x, y) = ((i % width as usize) as u32, (i / width as usize) as u32);
            (x, y)
        })
}

/// The eight neighbours of `(x, y)` in [`RING`] order.
fn neighbourhood(image: &BinaryImage, x: u32, y: u32) -> [bool; 8] {
    let (x, y) = (i64::from(x), i64::from(y));
    RING.map(|(dx, dy)| image.get(x + dx, y + dy))
}

/// A pixel may go when it has 2..=6 foreground neighbours and exactly
/// one background-to-foreground transition around its ring.
fn is_removable(ring: &[bool; 8]) -> bool {
    let neighbours = ring.iter().filter(|&&p| p).count();
    (2..=6).contains(&neighbours) && transitions(ring) == 1
}

/// Number of 0 -> 1 transitions walking the ring once.
fn transitions(ring: &[bool; 8]) -> usize {
    (0..8).filter(|&i| !ring[i] && ring[(i + 1) % 8]).count()
}
