//! Reference library loading.
//!
//! [`ReferenceLibrary`] bundles every precomputed signature the classifier
//! needs: the splash-screen histogram, the rejection banks, and the
//! per-character reference sets. It is an explicitly constructed, immutable
//! value passed into the scanner — there is no process-wide signature state,
//! and tests build libraries from synthetic parts via
//! [`ReferenceLibrary::from_parts`].
//!
//! # Asset directory layout
//!
//! Loading expects the versioned layout produced by the asset pipeline:
//!
//! ```text
//! data/
//!   splash.png            reference splash frame (RGB)
//!   splash-mask.png       splash region mask (white = counted)
//!   banks/<bank>/*.png    rejection-bank references, bank = directory name
//!   chars/
//!     left-mask.png       left character crop mask
//!     right-mask.png      right character crop mask
//!     settled/<name>-<side>.png [.json]
//!     early/<name>-<side>.png  [.json]    (optional)
//! ```
//!
//! Character histograms come from the sibling `.json` (a 768-integer array
//! precomputed offline) when present, and are otherwise computed at load
//! from the PNG under the side mask. The PNG always also supplies the
//! masked-RGB fallback signature. Any missing or corrupt required asset is
//! fatal: the classifier cannot operate on a partial bank.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{DynamicImage, GrayImage, RgbImage};

use crate::{
    error::ScanError,
    signature::{
        CharacterSignature, HISTOGRAM_BINS, HistogramSignature, MaskedRgbSignature, MetricKind,
        NamedReference, Pose, ReferenceSignature, RegionMask, Side,
    },
};

/// A named bank of non-competitive reference signatures.
///
/// Each bank is checked independently by the mode classifier with its own
/// threshold, so new exclusion categories are added by dropping a directory
/// of reference images next to the existing ones.
#[derive(Debug, Clone)]
pub struct RejectionBank {
    /// Bank name (the directory name), e.g. `"training"` or `"mom"`.
    pub name: String,
    /// References belonging to this bank.
    pub references: Vec<NamedReference>,
}

/// Per-character reference signatures for both sides and poses.
#[derive(Debug, Clone)]
pub struct CharacterLibrary {
    entries: Vec<CharacterSignature>,
    left_mask: Arc<RegionMask>,
    right_mask: Arc<RegionMask>,
}

impl CharacterLibrary {
    /// Assemble a character library from signatures and the two side masks.
    pub fn new(
        entries: Vec<CharacterSignature>,
        left_mask: Arc<RegionMask>,
        right_mask: Arc<RegionMask>,
    ) -> Self {
        Self {
            entries,
            left_mask,
            right_mask,
        }
    }

    /// The crop mask for one screen side.
    pub fn side_mask(&self, side: Side) -> &Arc<RegionMask> {
        match side {
            Side::Left => &self.left_mask,
            Side::Right => &self.right_mask,
        }
    }

    /// All signatures of `kind` valid for `(side, pose)`.
    ///
    /// When no early-pose references exist for the side, the settled set is
    /// returned instead — early art is an optional refinement of the asset
    /// contract, not a requirement.
    pub fn signatures(&self, side: Side, pose: Pose, kind: MetricKind) -> Vec<&CharacterSignature> {
        let matching: Vec<&CharacterSignature> = self.select(side, pose, kind);
        if matching.is_empty() && pose == Pose::Early {
            return self.select(side, Pose::Settled, kind);
        }
        matching
    }

    fn select(&self, side: Side, pose: Pose, kind: MetricKind) -> Vec<&CharacterSignature> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.side == side && entry.pose == pose && entry.signature.kind() == kind
            })
            .collect()
    }

    /// Every stored signature.
    pub fn entries(&self) -> &[CharacterSignature] {
        &self.entries
    }
}

/// The full immutable signature set for one game.
///
/// # Example
///
/// ```no_run
/// use matchdex::ReferenceLibrary;
///
/// let library = ReferenceLibrary::load("data")?;
/// println!(
///     "{} rejection banks, {} character references",
///     library.banks().len(),
///     library.characters().entries().len(),
/// );
/// # Ok::<(), matchdex::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    splash: HistogramSignature,
    banks: Vec<RejectionBank>,
    characters: CharacterLibrary,
}

impl ReferenceLibrary {
    /// Load every signature from the asset directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AssetLoad`] on the first missing or corrupt
    /// required asset; the scanner must never start with a partial bank.
    pub fn load<P: AsRef<Path>>(directory: P) -> Result<Self, ScanError> {
        let directory = directory.as_ref();
        log::debug!("Loading reference library from {}", directory.display());

        let splash_mask = Arc::new(load_mask(&directory.join("splash-mask.png"))?);
        let splash_image = load_rgb(&directory.join("splash.png"))?;
        let splash = HistogramSignature::from_image(&splash_image, Arc::clone(&splash_mask));

        let banks = load_banks(&directory.join("banks"))?;

        let chars_dir = directory.join("chars");
        let left_mask = Arc::new(load_mask(&chars_dir.join("left-mask.png"))?);
        let right_mask = Arc::new(load_mask(&chars_dir.join("right-mask.png"))?);

        let mut entries = Vec::new();
        load_character_set(
            &chars_dir.join("settled"),
            Pose::Settled,
            &left_mask,
            &right_mask,
            &mut entries,
        )?;
        let early_dir = chars_dir.join("early");
        if early_dir.is_dir() {
            load_character_set(&early_dir, Pose::Early, &left_mask, &right_mask, &mut entries)?;
        }

        for side in [Side::Left, Side::Right] {
            let count = entries.iter().filter(|e| e.side == side).count();
            if count == 0 {
                return Err(asset_error(
                    &chars_dir,
                    format!("no {side}-side character references found"),
                ));
            }
        }

        log::debug!(
            "Loaded {} banks, {} character signatures",
            banks.len(),
            entries.len(),
        );

        Ok(Self {
            splash,
            banks,
            characters: CharacterLibrary::new(entries, left_mask, right_mask),
        })
    }

    /// Assemble a library from already-built parts.
    ///
    /// This is the test-double constructor: synthetic signatures go in, no
    /// filesystem involved.
    pub fn from_parts(
        splash: HistogramSignature,
        banks: Vec<RejectionBank>,
        characters: CharacterLibrary,
    ) -> Self {
        Self {
            splash,
            banks,
            characters,
        }
    }

    /// The splash-screen detection signature.
    pub fn splash(&self) -> &HistogramSignature {
        &self.splash
    }

    /// The rejection banks, in load order.
    pub fn banks(&self) -> &[RejectionBank] {
        &self.banks
    }

    /// The character reference sets.
    pub fn characters(&self) -> &CharacterLibrary {
        &self.characters
    }
}

fn asset_error(path: &Path, reason: impl Into<String>) -> ScanError {
    ScanError::AssetLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, ScanError> {
    image::open(path).map_err(|error| asset_error(path, error.to_string()))
}

fn load_rgb(path: &Path) -> Result<RgbImage, ScanError> {
    Ok(open_image(path)?.to_rgb8())
}

fn load_mask(path: &Path) -> Result<RegionMask, ScanError> {
    let gray: GrayImage = open_image(path)?.to_luma8();
    let mask = RegionMask::from_gray(&gray);
    if mask.active_pixels() == 0 {
        return Err(asset_error(path, "mask selects no pixels"));
    }
    Ok(mask)
}

/// Build a masked-RGB signature, honouring an alpha channel when present.
fn load_masked_rgb(path: &Path) -> Result<MaskedRgbSignature, ScanError> {
    let image = open_image(path)?;
    let signature = match image {
        DynamicImage::ImageRgba8(rgba) => MaskedRgbSignature::from_rgba(&rgba),
        other => MaskedRgbSignature::from_rgb(&other.to_rgb8()),
    };
    if signature.active_pixels() == 0 {
        return Err(asset_error(path, "reference image is entirely masked"));
    }
    Ok(signature)
}

/// Sorted PNG entries of a directory, for deterministic load order.
fn sorted_pngs(directory: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(directory)
        .map_err(|error| asset_error(directory, error.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_banks(banks_dir: &Path) -> Result<Vec<RejectionBank>, ScanError> {
    if !banks_dir.is_dir() {
        return Err(asset_error(banks_dir, "rejection banks directory missing"));
    }

    let mut bank_dirs: Vec<PathBuf> = fs::read_dir(banks_dir)
        .map_err(|error| asset_error(banks_dir, error.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    bank_dirs.sort();

    let mut banks = Vec::with_capacity(bank_dirs.len());
    for bank_dir in bank_dirs {
        let name = bank_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| asset_error(&bank_dir, "bank directory has no valid name"))?;

        let mut references = Vec::new();
        for path in sorted_pngs(&bank_dir)? {
            let stem = file_stem(&path)?;
            references.push(NamedReference {
                name: stem,
                signature: ReferenceSignature::MaskedRgb(load_masked_rgb(&path)?),
            });
        }
        banks.push(RejectionBank { name, references });
    }
    Ok(banks)
}

fn load_character_set(
    directory: &Path,
    pose: Pose,
    left_mask: &Arc<RegionMask>,
    right_mask: &Arc<RegionMask>,
    entries: &mut Vec<CharacterSignature>,
) -> Result<(), ScanError> {
    for path in sorted_pngs(directory)? {
        let stem = file_stem(&path)?;
        let Some((name, side)) = Side::split_stem(&stem) else {
            return Err(asset_error(
                &path,
                "character file name must end in -left or -right",
            ));
        };
        let side_mask = match side {
            Side::Left => left_mask,
            Side::Right => right_mask,
        };

        let image = load_rgb(&path)?;

        // Histogram signature: precomputed JSON if present, otherwise
        // computed from the reference art under the side mask.
        let json_path = path.with_extension("json");
        let histogram = if json_path.is_file() {
            HistogramSignature::from_bins(load_histogram_json(&json_path)?, Arc::clone(side_mask))
        } else {
            HistogramSignature::from_image(&image, Arc::clone(side_mask))
        };
        entries.push(CharacterSignature {
            character: name.to_string(),
            side,
            pose,
            signature: ReferenceSignature::Histogram(histogram),
        });

        // The art itself doubles as the masked-RGB fallback reference.
        entries.push(CharacterSignature {
            character: name.to_string(),
            side,
            pose,
            signature: ReferenceSignature::MaskedRgb(load_masked_rgb(&path)?),
        });
    }
    Ok(())
}

fn load_histogram_json(path: &Path) -> Result<Vec<u32>, ScanError> {
    let contents =
        fs::read_to_string(path).map_err(|error| asset_error(path, error.to_string()))?;
    let bins: Vec<u32> =
        serde_json::from_str(&contents).map_err(|error| asset_error(path, error.to_string()))?;
    if bins.len() != HISTOGRAM_BINS {
        return Err(asset_error(
            path,
            format!("expected {HISTOGRAM_BINS} bins, found {}", bins.len()),
        ));
    }
    Ok(bins)
}

fn file_stem(path: &Path) -> Result<String, ScanError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| asset_error(path, "file has no valid stem"))
}
