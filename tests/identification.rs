//! Character identifier behavior over synthetic reference sets.

use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};
use matchdex::{
    CharacterIdentifier, CharacterLibrary, CharacterSignature, ClassifierConfig,
    HistogramSignature, IdentifyFailure, MaskedRgbSignature, Pose, ReferenceLibrary,
    ReferenceSignature, RegionMask, RejectionBank, Side,
};

const WIDTH: u32 = 8;
const HEIGHT: u32 = 8;

/// Left half / right half crop masks.
fn side_mask(side: Side) -> Arc<RegionMask> {
    let mask_image = GrayImage::from_fn(WIDTH, HEIGHT, |x, _| {
        let in_side = match side {
            Side::Left => x < WIDTH / 2,
            Side::Right => x >= WIDTH / 2,
        };
        if in_side { Luma([255]) } else { Luma([0]) }
    });
    Arc::new(RegionMask::from_gray(&mask_image))
}

/// A frame with one solid color per half.
fn half_frame(left: [u8; 3], right: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, _| {
        if x < WIDTH / 2 { Rgb(left) } else { Rgb(right) }
    })
}

/// Reference art: the side region painted, the rest pure white so the
/// masked-RGB signature ignores it.
fn side_art(side: Side, color: [u8; 3]) -> RgbImage {
    match side {
        Side::Left => half_frame(color, [255, 255, 255]),
        Side::Right => half_frame([255, 255, 255], color),
    }
}

fn histogram_entry(name: &str, side: Side, color: [u8; 3]) -> CharacterSignature {
    CharacterSignature {
        character: name.to_string(),
        side,
        pose: Pose::Settled,
        signature: ReferenceSignature::Histogram(HistogramSignature::from_image(
            &side_art(side, color),
            side_mask(side),
        )),
    }
}

fn rgb_entry(name: &str, side: Side, color: [u8; 3]) -> CharacterSignature {
    CharacterSignature {
        character: name.to_string(),
        side,
        pose: Pose::Settled,
        signature: ReferenceSignature::MaskedRgb(MaskedRgbSignature::from_rgb(&side_art(
            side, color,
        ))),
    }
}

fn library_of(entries: Vec<CharacterSignature>) -> ReferenceLibrary {
    let splash = HistogramSignature::from_image(
        &half_frame([255, 0, 0], [255, 0, 0]),
        Arc::new(RegionMask::full(WIDTH, HEIGHT)),
    );
    let characters = CharacterLibrary::new(entries, side_mask(Side::Left), side_mask(Side::Right));
    ReferenceLibrary::from_parts(splash, Vec::<RejectionBank>::new(), characters)
}

const GREEN: [u8; 3] = [0, 200, 0];
const BLUE: [u8; 3] = [0, 0, 200];
const MAGENTA: [u8; 3] = [200, 0, 200];

#[test]
fn identifies_both_sides_independently() {
    let library = library_of(vec![
        histogram_entry("sol", Side::Left, GREEN),
        histogram_entry("may", Side::Left, BLUE),
        histogram_entry("ky", Side::Right, MAGENTA),
        histogram_entry("axl", Side::Right, BLUE),
    ]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, MAGENTA);

    let left = identifier
        .identify(Side::Left, Pose::Settled, &frame)
        .expect("left side should identify");
    assert_eq!(left.character, "sol");
    assert!(!left.via_fallback);

    let right = identifier
        .identify(Side::Right, Pose::Settled, &frame)
        .expect("right side should identify");
    assert_eq!(right.character, "ky");
}

#[test]
fn sides_are_symmetric() {
    // Swap the art between sides; results swap with it.
    let library = library_of(vec![
        histogram_entry("sol", Side::Left, GREEN),
        histogram_entry("ky", Side::Right, GREEN),
    ]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, GREEN);

    let left = identifier.identify(Side::Left, Pose::Settled, &frame).unwrap();
    let right = identifier.identify(Side::Right, Pose::Settled, &frame).unwrap();
    assert_eq!(left.character, "sol");
    assert_eq!(right.character, "ky");
    assert_eq!(left.score, right.score);
}

#[test]
fn best_match_below_threshold_is_rejected() {
    let library = library_of(vec![
        histogram_entry("sol", Side::Left, GREEN),
        histogram_entry("may", Side::Left, BLUE),
    ]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);

    // Red matches neither reference; no low-confidence guess is emitted.
    let frame = half_frame([200, 0, 0], [0, 0, 0]);
    let failure = identifier
        .identify(Side::Left, Pose::Settled, &frame)
        .unwrap_err();
    assert!(matches!(
        failure,
        IdentifyFailure::BelowThreshold { side: Side::Left, .. }
    ));
}

#[test]
fn missing_side_references_fail_explicitly() {
    let library = library_of(vec![histogram_entry("sol", Side::Left, GREEN)]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, GREEN);

    let failure = identifier
        .identify(Side::Right, Pose::Settled, &frame)
        .unwrap_err();
    assert_eq!(failure, IdentifyFailure::NoReferences { side: Side::Right });
}

#[test]
fn ambiguous_ranking_resolved_by_rgb_fallback() {
    // Two characters with identical histograms (margin 0); only the RGB
    // art tells them apart.
    let library = library_of(vec![
        histogram_entry("sol", Side::Left, GREEN),
        histogram_entry("faust", Side::Left, GREEN),
        rgb_entry("sol", Side::Left, GREEN),
        rgb_entry("faust", Side::Left, BLUE),
    ]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, [0, 0, 0]);

    let result = identifier
        .identify(Side::Left, Pose::Settled, &frame)
        .expect("fallback should resolve the tie");
    assert_eq!(result.character, "sol");
    assert!(result.via_fallback);
    assert_eq!(result.score, 0.0);
}

#[test]
fn unresolvable_ambiguity_is_rejected() {
    // Histograms tie and neither RGB reference is close enough.
    let library = library_of(vec![
        histogram_entry("sol", Side::Left, GREEN),
        histogram_entry("faust", Side::Left, GREEN),
        rgb_entry("sol", Side::Left, BLUE),
        rgb_entry("faust", Side::Left, MAGENTA),
    ]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, [0, 0, 0]);

    let failure = identifier
        .identify(Side::Left, Pose::Settled, &frame)
        .unwrap_err();
    assert!(matches!(
        failure,
        IdentifyFailure::AmbiguousUnresolved { side: Side::Left, .. }
    ));
}

#[test]
fn early_pose_falls_back_to_settled_references() {
    let library = library_of(vec![histogram_entry("sol", Side::Left, GREEN)]);
    let config = ClassifierConfig::default();
    let identifier = CharacterIdentifier::new(&library, &config);
    let frame = half_frame(GREEN, [0, 0, 0]);

    let result = identifier
        .identify(Side::Left, Pose::Early, &frame)
        .expect("settled references should serve early pose");
    assert_eq!(result.character, "sol");
}
