//! Frame-to-reference comparison.
//!
//! [`compare`] scores a decoded frame against a [`ReferenceSignature`],
//! dispatching on the signature's metric kind. Scores are metric-native:
//! masked-RGB and perceptual-hash results are distances (lower = more
//! similar), histogram overlap is a similarity fraction (higher = more
//! similar). Callers gate scores through
//! [`MetricKind::beats`](crate::MetricKind::beats) so the polarity is never
//! hand-rolled.
//!
//! Comparison has no side effects and allocates only for histogram
//! computation; it is called many times per second during a scan.

use image::RgbImage;

use crate::signature::{
    HashSignature, HistogramSignature, MaskedRgbSignature, MetricKind, ReferenceSignature,
    masked_histogram,
};

/// Score `frame` against `signature` under the signature's native metric.
///
/// A dimension mismatch between the frame and the reference yields the
/// metric's worst score rather than a panic, so a malformed asset can never
/// fire a rejection bank or win a character ranking.
pub fn compare(signature: &ReferenceSignature, frame: &RgbImage) -> f64 {
    match signature {
        ReferenceSignature::MaskedRgb(reference) => masked_rgb_distance(reference, frame),
        ReferenceSignature::Histogram(reference) => {
            let bins = masked_histogram(frame, reference.mask());
            reference.overlap(&bins)
        }
        ReferenceSignature::PerceptualHash(reference) => hash_distance(reference, frame),
    }
}

/// Mean per-pixel `|ΔR| + |ΔG| + |ΔB|` over non-masked reference pixels.
///
/// Partially transparent reference pixels are alpha-composited over the
/// frame *before* diffing, which reduces to scaling the difference by the
/// pixel's weight. Zero-weight pixels never contribute, so the score is
/// invariant to frame content at masked positions.
pub fn masked_rgb_distance(reference: &MaskedRgbSignature, frame: &RgbImage) -> f64 {
    if reference.dimensions() != frame.dimensions() || reference.active_pixels() == 0 {
        return MetricKind::MaskedRgb.worst_score();
    }

    let frame_raw = frame.as_raw();
    let mut total = 0f64;
    for (index, pixel) in reference.pixels().iter().enumerate() {
        if pixel.weight == 0 {
            continue;
        }
        let base = index * 3;
        let dr = f64::from(pixel.r) - f64::from(frame_raw[base]);
        let dg = f64::from(pixel.g) - f64::from(frame_raw[base + 1]);
        let db = f64::from(pixel.b) - f64::from(frame_raw[base + 2]);
        // composite-then-diff: |a·ref + (1-a)·frame - frame| = a·|ref - frame|
        let alpha = f64::from(pixel.weight) / 255.0;
        total += alpha * (dr.abs() + dg.abs() + db.abs());
    }
    total / f64::from(reference.active_pixels())
}

/// Histogram overlap between `frame` (restricted to the reference's mask)
/// and the reference histogram. Similarity fraction in `[0, 1]`.
pub fn histogram_overlap(reference: &HistogramSignature, frame: &RgbImage) -> f64 {
    let bins = masked_histogram(frame, reference.mask());
    reference.overlap(&bins)
}

/// Summed Hamming distance across every hash kind stored in the signature,
/// computed over the signature's crop of `frame`.
pub fn hash_distance(reference: &HashSignature, frame: &RgbImage) -> f64 {
    let gray = crate::phash::crop_to_gray(frame, reference.crop());
    let mut total = 0u32;
    for &(kind, stored) in reference.hashes() {
        total += crate::phash::hamming(stored, crate::phash::compute(kind, &gray));
    }
    f64::from(total)
}
