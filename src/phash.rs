//! Perceptual hashing of frame regions.
//!
//! Produces fixed-size 64-bit fingerprints that are robust to minor pixel
//! noise and compared by Hamming distance. Three algorithms are provided:
//! averaging ([`HashKind::Average`]), gradient ([`HashKind::Gradient`]) and
//! a one-level Haar wavelet ([`HashKind::Wavelet`]). Stronger reference sets
//! store several kinds per crop and sum the distances.

use image::{GrayImage, RgbImage, imageops};

use crate::signature::CropRegion;

/// Hash grid edge length; every hash packs an 8×8 bit grid into a `u64`.
const HASH_SIZE: u32 = 8;

/// Perceptual hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    /// Bits set where a downscaled pixel is above the mean (aHash).
    Average,
    /// Bits set where a pixel is brighter than its left neighbour (dHash).
    Gradient,
    /// Bits set where a Haar low-frequency coefficient is above the median
    /// (wHash).
    Wavelet,
}

/// Extract `crop` from a frame and convert it to grayscale.
///
/// The crop is clamped to the frame bounds, so an oversized region degrades
/// to the intersection instead of panicking.
pub fn crop_to_gray(frame: &RgbImage, crop: CropRegion) -> GrayImage {
    let (fw, fh) = frame.dimensions();
    let x = crop.x.min(fw.saturating_sub(1));
    let y = crop.y.min(fh.saturating_sub(1));
    let width = crop.width.min(fw - x).max(1);
    let height = crop.height.min(fh - y).max(1);
    let view = imageops::crop_imm(frame, x, y, width, height).to_image();
    imageops::grayscale(&view)
}

/// Compute a 64-bit hash of `gray` with the given algorithm.
pub fn compute(kind: HashKind, gray: &GrayImage) -> u64 {
    match kind {
        HashKind::Average => average_hash(gray),
        HashKind::Gradient => gradient_hash(gray),
        HashKind::Wavelet => wavelet_hash(gray),
    }
}

/// Hamming distance between two hashes.
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

fn average_hash(gray: &GrayImage) -> u64 {
    let small = imageops::resize(
        gray,
        HASH_SIZE,
        HASH_SIZE,
        imageops::FilterType::Triangle,
    );
    let sum: u64 = small.pixels().map(|p| u64::from(p.0[0])).sum();
    let mean = sum / u64::from(HASH_SIZE * HASH_SIZE);
    let mut hash = 0u64;
    for (index, pixel) in small.pixels().enumerate() {
        if u64::from(pixel.0[0]) > mean {
            hash |= 1u64 << index;
        }
    }
    hash
}

fn gradient_hash(gray: &GrayImage) -> u64 {
    // One extra column so each row yields HASH_SIZE comparisons.
    let small = imageops::resize(
        gray,
        HASH_SIZE + 1,
        HASH_SIZE,
        imageops::FilterType::Triangle,
    );
    let mut hash = 0u64;
    let mut index = 0;
    for y in 0..HASH_SIZE {
        for x in 0..HASH_SIZE {
            if small.get_pixel(x + 1, y).0[0] > small.get_pixel(x, y).0[0] {
                hash |= 1u64 << index;
            }
            index += 1;
        }
    }
    hash
}

fn wavelet_hash(gray: &GrayImage) -> u64 {
    // One Haar decomposition level: average 2x2 blocks of a 16x16
    // downscale, then threshold the 8x8 low-frequency band at its median.
    let small = imageops::resize(
        gray,
        HASH_SIZE * 2,
        HASH_SIZE * 2,
        imageops::FilterType::Triangle,
    );
    let mut coefficients = [0f32; (HASH_SIZE * HASH_SIZE) as usize];
    for by in 0..HASH_SIZE {
        for bx in 0..HASH_SIZE {
            let mut sum = 0f32;
            for dy in 0..2 {
                for dx in 0..2 {
                    sum += f32::from(small.get_pixel(bx * 2 + dx, by * 2 + dy).0[0]);
                }
            }
            coefficients[(by * HASH_SIZE + bx) as usize] = sum / 4.0;
        }
    }

    let mut sorted = coefficients;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = (sorted[31] + sorted[32]) / 2.0;

    let mut hash = 0u64;
    for (index, &value) in coefficients.iter().enumerate() {
        if value > median {
            hash |= 1u64 << index;
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient_image() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, y| Luma([((x * 3 + y) % 256) as u8]))
    }

    #[test]
    fn identical_images_hash_identically() {
        let image = gradient_image();
        for kind in [HashKind::Average, HashKind::Gradient, HashKind::Wavelet] {
            assert_eq!(
                hamming(compute(kind, &image), compute(kind, &image)),
                0,
                "{kind:?} should be deterministic"
            );
        }
    }

    #[test]
    fn distinct_images_differ() {
        let a = gradient_image();
        let b = GrayImage::from_fn(64, 64, |x, y| Luma([((255 - x * 2 + y) % 256) as u8]));
        let distance = hamming(
            compute(HashKind::Gradient, &a),
            compute(HashKind::Gradient, &b),
        );
        assert!(distance > 8, "expected a large distance, got {distance}");
    }

    #[test]
    fn crop_clamps_to_frame_bounds() {
        let frame = RgbImage::from_pixel(16, 16, image::Rgb([40, 40, 40]));
        let crop = CropRegion {
            x: 8,
            y: 8,
            width: 100,
            height: 100,
        };
        let gray = crop_to_gray(&frame, crop);
        assert_eq!(gray.dimensions(), (8, 8));
    }
}
