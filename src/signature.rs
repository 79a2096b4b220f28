//! Reference signature types.
//!
//! A [`ReferenceSignature`] is an immutable, precomputed descriptor derived
//! from a reference image, tagged with the metric it is compared under. All
//! signatures are built once — at library load or in test setup — and shared
//! read-only across every frame evaluation; any per-reference invariant (the
//! active-pixel count of a mask, the bin total of a histogram) is computed at
//! construction, never per comparison.
//!
//! [`CharacterSignature`] specializes a signature to one character, one
//! screen side, and one splash pose. Side and pose are explicit enums: the
//! `-left`/`-right` filename convention of the asset directory is parsed
//! exactly once, at load, and never consulted again.

use std::fmt;
use std::sync::Arc;

use image::{GrayImage, RgbImage, RgbaImage};

use crate::phash::HashKind;

/// Which screen side a character reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left half of the splash screen (player one).
    Left,
    /// Right half of the splash screen (player two).
    Right,
}

impl Side {
    /// Split a file stem of the form `"<name>-left"` / `"<name>-right"` into
    /// the character name and its side tag.
    ///
    /// Returns `None` when the stem carries no side suffix.
    pub fn split_stem(stem: &str) -> Option<(&str, Side)> {
        if let Some(name) = stem.strip_suffix("-left") {
            Some((name, Side::Left))
        } else {
            stem.strip_suffix("-right").map(|name| (name, Side::Right))
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Temporal variant of the splash-screen character art.
///
/// Character portraits differ slightly between their first appearance
/// (`Early`) and the settled pose a moment later (`Settled`), so a library
/// may carry a distinct reference set for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    /// The frame right at the splash rising edge.
    Early,
    /// The pose after the splash animation has settled.
    Settled,
}

/// The metric family a signature is compared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Mean per-pixel RGB distance over non-masked reference pixels.
    MaskedRgb,
    /// Histogram intersection over a masked region.
    Histogram,
    /// Summed Hamming distance over perceptual hashes of a crop.
    PerceptualHash,
}

/// Score direction for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Smaller scores mean more similar (distances).
    LowerIsBetter,
    /// Larger scores mean more similar (overlap fractions).
    HigherIsBetter,
}

impl MetricKind {
    /// The score direction of this metric.
    ///
    /// Masked RGB and perceptual hash produce distances; histogram
    /// intersection produces a similarity fraction in `[0, 1]`.
    pub fn polarity(self) -> Polarity {
        match self {
            MetricKind::MaskedRgb | MetricKind::PerceptualHash => Polarity::LowerIsBetter,
            MetricKind::Histogram => Polarity::HigherIsBetter,
        }
    }

    /// Whether `score` passes `threshold` under this metric's polarity.
    ///
    /// The same threshold gates both rejection-bank firing and splash/
    /// character acceptance; callers never hand-roll the comparison
    /// direction.
    pub fn beats(self, score: f64, threshold: f64) -> bool {
        match self.polarity() {
            Polarity::LowerIsBetter => score < threshold,
            Polarity::HigherIsBetter => score >= threshold,
        }
    }

    /// The worst score this metric can report, used for dimension
    /// mismatches and empty masks.
    pub fn worst_score(self) -> f64 {
        match self.polarity() {
            Polarity::LowerIsBetter => f64::INFINITY,
            Polarity::HigherIsBetter => 0.0,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::MaskedRgb => write!(f, "masked-rgb"),
            MetricKind::Histogram => write!(f, "histogram"),
            MetricKind::PerceptualHash => write!(f, "perceptual-hash"),
        }
    }
}

/// A boolean pixel region.
///
/// Built from a 1-bit or grayscale mask image: pixels brighter than mid-gray
/// count as part of the region. Shared between signatures via [`Arc`] so the
/// left/right crop masks are stored once per library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl RegionMask {
    /// Build a region mask from a grayscale image (luma > 127 = in region).
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let bits = image.pixels().map(|p| p.0[0] > 127).collect();
        Self {
            width,
            height,
            bits,
        }
    }

    /// Build a mask that covers the entire `width` × `height` area.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![true; (width * height) as usize],
        }
    }

    /// Mask dimensions, `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the pixel at `(x, y)` is part of the region.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    /// Number of pixels inside the region.
    pub fn active_pixels(&self) -> u32 {
        self.bits.iter().filter(|&&b| b).count() as u32
    }
}

/// Number of bins in a concatenated R|G|B histogram.
pub const HISTOGRAM_BINS: usize = 768;

/// Compute the concatenated R|G|B histogram of `frame` restricted to `mask`.
///
/// Bin layout matches the stored reference JSON: red counts occupy bins
/// `0..256`, green `256..512`, blue `512..768`. A dimension mismatch between
/// frame and mask yields an all-zero histogram, which can never beat an
/// overlap threshold.
pub fn masked_histogram(frame: &RgbImage, mask: &RegionMask) -> Vec<u32> {
    let mut bins = vec![0u32; HISTOGRAM_BINS];
    if frame.dimensions() != mask.dimensions() {
        return bins;
    }
    for (x, y, pixel) in frame.enumerate_pixels() {
        if mask.is_set(x, y) {
            bins[pixel.0[0] as usize] += 1;
            bins[256 + pixel.0[1] as usize] += 1;
            bins[512 + pixel.0[2] as usize] += 1;
        }
    }
    bins
}

/// A reference pixel for masked-RGB comparison.
///
/// `weight` is the composite alpha: 0 means don't-care (pure white in an
/// opaque reference, or fully transparent), 255 means fully opaque.
#[derive(Debug, Clone, Copy)]
pub struct MaskedPixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub weight: u8,
}

/// Precomputed masked-RGB reference data.
#[derive(Debug, Clone)]
pub struct MaskedRgbSignature {
    width: u32,
    height: u32,
    pixels: Vec<MaskedPixel>,
    /// Count of pixels with non-zero weight, fixed at construction.
    active: u32,
}

impl MaskedRgbSignature {
    /// Build from an opaque RGB reference. Pure white pixels (255,255,255)
    /// are don't-care, matching the mask convention of the asset set.
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels: Vec<MaskedPixel> = image
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                let weight = if r == 255 && g == 255 && b == 255 { 0 } else { 255 };
                MaskedPixel { r, g, b, weight }
            })
            .collect();
        let active = pixels.iter().filter(|p| p.weight > 0).count() as u32;
        Self {
            width,
            height,
            pixels,
            active,
        }
    }

    /// Build from an RGBA reference with partial transparency.
    ///
    /// Fully transparent pixels are don't-care; partially transparent ones
    /// are composited over the frame before diffing at compare time.
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels: Vec<MaskedPixel> = image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                MaskedPixel { r, g, b, weight: a }
            })
            .collect();
        let active = pixels.iter().filter(|p| p.weight > 0).count() as u32;
        Self {
            width,
            height,
            pixels,
            active,
        }
    }

    /// Reference dimensions, `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reference pixels in row-major order.
    pub fn pixels(&self) -> &[MaskedPixel] {
        &self.pixels
    }

    /// Count of non-masked pixels.
    pub fn active_pixels(&self) -> u32 {
        self.active
    }
}

/// Precomputed masked-histogram reference data.
#[derive(Debug, Clone)]
pub struct HistogramSignature {
    mask: Arc<RegionMask>,
    bins: Vec<u32>,
    /// Sum of all reference bins, fixed at construction.
    total: u64,
}

impl HistogramSignature {
    /// Build from precomputed bins (e.g. loaded from JSON).
    pub fn from_bins(bins: Vec<u32>, mask: Arc<RegionMask>) -> Self {
        let total = bins.iter().map(|&b| u64::from(b)).sum();
        Self { mask, bins, total }
    }

    /// Build by histogramming a reference image under `mask`.
    pub fn from_image(image: &RgbImage, mask: Arc<RegionMask>) -> Self {
        let bins = masked_histogram(image, &mask);
        Self::from_bins(bins, mask)
    }

    /// The region mask the reference histogram was computed under.
    pub fn mask(&self) -> &Arc<RegionMask> {
        &self.mask
    }

    /// Reference histogram bins.
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Overlap fraction between a frame histogram and this reference:
    /// `Σ min(frame, reference) / Σ reference`, in `[0, 1]`.
    ///
    /// Returns the metric's worst score for an empty reference.
    pub fn overlap(&self, frame_bins: &[u32]) -> f64 {
        if self.total == 0 {
            return MetricKind::Histogram.worst_score();
        }
        let intersection: u64 = frame_bins
            .iter()
            .zip(&self.bins)
            .map(|(&f, &r)| u64::from(f.min(r)))
            .sum();
        intersection as f64 / self.total as f64
    }
}

/// Rectangular sub-region of a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Precomputed perceptual-hash reference data.
///
/// Carries one 64-bit hash per [`HashKind`]; comparison sums Hamming
/// distances across the kinds present.
#[derive(Debug, Clone)]
pub struct HashSignature {
    crop: CropRegion,
    hashes: Vec<(HashKind, u64)>,
}

impl HashSignature {
    /// Build by hashing `crop` of a reference image with the given kinds.
    pub fn from_image(image: &RgbImage, crop: CropRegion, kinds: &[HashKind]) -> Self {
        let gray = crate::phash::crop_to_gray(image, crop);
        let hashes = kinds
            .iter()
            .map(|&kind| (kind, crate::phash::compute(kind, &gray)))
            .collect();
        Self { crop, hashes }
    }

    /// Build from precomputed hashes.
    pub fn from_hashes(crop: CropRegion, hashes: Vec<(HashKind, u64)>) -> Self {
        Self { crop, hashes }
    }

    /// The frame sub-region the hashes were computed from.
    pub fn crop(&self) -> CropRegion {
        self.crop
    }

    /// The stored `(kind, hash)` pairs.
    pub fn hashes(&self) -> &[(HashKind, u64)] {
        &self.hashes
    }
}

/// An immutable precomputed descriptor derived from a reference image.
///
/// Compared against decoded frames via [`compare`](crate::compare::compare);
/// the variant selects the comparison algorithm.
#[derive(Debug, Clone)]
pub enum ReferenceSignature {
    /// Masked per-pixel RGB distance.
    MaskedRgb(MaskedRgbSignature),
    /// Masked histogram intersection.
    Histogram(HistogramSignature),
    /// Perceptual hashes over a crop.
    PerceptualHash(HashSignature),
}

impl ReferenceSignature {
    /// The metric family this signature is compared under.
    pub fn kind(&self) -> MetricKind {
        match self {
            ReferenceSignature::MaskedRgb(_) => MetricKind::MaskedRgb,
            ReferenceSignature::Histogram(_) => MetricKind::Histogram,
            ReferenceSignature::PerceptualHash(_) => MetricKind::PerceptualHash,
        }
    }
}

/// A reference signature with the asset name it was loaded from, used in
/// rejection diagnostics.
#[derive(Debug, Clone)]
pub struct NamedReference {
    /// Asset name (file stem), e.g. `"time-limit-left"`.
    pub name: String,
    /// The comparable signature.
    pub signature: ReferenceSignature,
}

/// A reference signature specialized to one character, side, and pose.
#[derive(Debug, Clone)]
pub struct CharacterSignature {
    /// Character identifier, e.g. `"sol"`.
    pub character: String,
    /// Which screen side this reference matches.
    pub side: Side,
    /// Which splash pose the reference art captures.
    pub pose: Pose,
    /// The comparable signature.
    pub signature: ReferenceSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_stem_suffix() {
        assert_eq!(Side::split_stem("sol-left"), Some(("sol", Side::Left)));
        assert_eq!(Side::split_stem("ky-right"), Some(("ky", Side::Right)));
        assert_eq!(Side::split_stem("may"), None);
        // Only the trailing tag counts.
        assert_eq!(
            Side::split_stem("left-handed-right"),
            Some(("left-handed", Side::Right))
        );
    }

    #[test]
    fn beats_respects_polarity() {
        assert!(MetricKind::MaskedRgb.beats(10.0, 75.0));
        assert!(!MetricKind::MaskedRgb.beats(80.0, 75.0));
        assert!(MetricKind::Histogram.beats(0.9, 0.7));
        assert!(!MetricKind::Histogram.beats(0.5, 0.7));
        // Threshold itself passes only for the similarity polarity.
        assert!(MetricKind::Histogram.beats(0.7, 0.7));
        assert!(!MetricKind::PerceptualHash.beats(80.0, 80.0));
    }

    #[test]
    fn white_pixels_are_masked_out() {
        let mut image = RgbImage::from_pixel(2, 1, image::Rgb([255, 255, 255]));
        image.put_pixel(1, 0, image::Rgb([10, 20, 30]));
        let signature = MaskedRgbSignature::from_rgb(&image);
        assert_eq!(signature.active_pixels(), 1);
        assert_eq!(signature.pixels()[0].weight, 0);
        assert_eq!(signature.pixels()[1].weight, 255);
    }
}
