//! Reference library loading from an on-disk asset directory.

use std::{fs, path::Path};

use image::{GrayImage, Luma, Rgb, RgbImage};
use matchdex::{MetricKind, Pose, ReferenceLibrary, ReferenceSignature, ScanError, Side};
use tempfile::TempDir;

fn solid(color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(8, 8, Rgb(color))
}

fn white_mask() -> GrayImage {
    GrayImage::from_pixel(8, 8, Luma([255]))
}

fn save_rgb(path: &Path, image: &RgbImage) {
    image.save(path).expect("fixture image should save");
}

fn save_gray(path: &Path, image: &GrayImage) {
    image.save(path).expect("fixture mask should save");
}

/// Write a minimal complete asset directory and return its guard.
fn write_fixture() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    save_rgb(&root.join("splash.png"), &solid([200, 0, 0]));
    save_gray(&root.join("splash-mask.png"), &white_mask());

    let bank_dir = root.join("banks").join("training");
    fs::create_dir_all(&bank_dir).unwrap();
    save_rgb(&bank_dir.join("pause.png"), &solid([0, 200, 200]));

    let chars = root.join("chars");
    fs::create_dir_all(chars.join("settled")).unwrap();
    save_gray(&chars.join("left-mask.png"), &white_mask());
    save_gray(&chars.join("right-mask.png"), &white_mask());
    save_rgb(&chars.join("settled").join("sol-left.png"), &solid([0, 200, 0]));
    save_rgb(&chars.join("settled").join("ky-right.png"), &solid([200, 0, 200]));

    dir
}

#[test]
fn loads_a_complete_asset_directory() {
    let dir = write_fixture();
    let library = ReferenceLibrary::load(dir.path()).expect("fixture should load");

    assert_eq!(library.banks().len(), 1);
    assert_eq!(library.banks()[0].name, "training");
    assert_eq!(library.banks()[0].references.len(), 1);
    assert_eq!(library.banks()[0].references[0].name, "pause");

    // Each character PNG yields a histogram and a masked-RGB signature.
    assert_eq!(library.characters().entries().len(), 4);
    for side in [Side::Left, Side::Right] {
        let histograms = library
            .characters()
            .signatures(side, Pose::Settled, MetricKind::Histogram);
        assert_eq!(histograms.len(), 1);
        let fallbacks = library
            .characters()
            .signatures(side, Pose::Settled, MetricKind::MaskedRgb);
        assert_eq!(fallbacks.len(), 1);
    }
    assert_eq!(
        library
            .characters()
            .signatures(Side::Left, Pose::Settled, MetricKind::Histogram)[0]
            .character,
        "sol"
    );
}

#[test]
fn banks_load_in_sorted_order() {
    let dir = write_fixture();
    // Created out of order on purpose.
    for bank in ["zz-survival", "aa-demo"] {
        let bank_dir = dir.path().join("banks").join(bank);
        fs::create_dir_all(&bank_dir).unwrap();
        save_rgb(&bank_dir.join("banner.png"), &solid([50, 50, 50]));
    }

    let library = ReferenceLibrary::load(dir.path()).unwrap();
    let names: Vec<&str> = library.banks().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["aa-demo", "training", "zz-survival"]);
}

#[test]
fn missing_splash_is_fatal() {
    let dir = write_fixture();
    fs::remove_file(dir.path().join("splash.png")).unwrap();

    let error = ReferenceLibrary::load(dir.path()).unwrap_err();
    assert!(matches!(error, ScanError::AssetLoad { .. }), "{error}");
}

#[test]
fn character_without_side_suffix_is_fatal() {
    let dir = write_fixture();
    save_rgb(
        &dir.path().join("chars").join("settled").join("sol.png"),
        &solid([0, 200, 0]),
    );

    let error = ReferenceLibrary::load(dir.path()).unwrap_err();
    match error {
        ScanError::AssetLoad { path, reason } => {
            assert!(path.ends_with("sol.png"));
            assert!(reason.contains("-left or -right"), "{reason}");
        }
        other => panic!("expected asset error, got {other}"),
    }
}

#[test]
fn missing_side_is_fatal() {
    let dir = write_fixture();
    fs::remove_file(dir.path().join("chars").join("settled").join("ky-right.png")).unwrap();

    let error = ReferenceLibrary::load(dir.path()).unwrap_err();
    match error {
        ScanError::AssetLoad { reason, .. } => {
            assert!(reason.contains("right-side"), "{reason}");
        }
        other => panic!("expected asset error, got {other}"),
    }
}

#[test]
fn precomputed_histogram_json_wins_over_the_png() {
    let dir = write_fixture();
    let mut bins = vec![0u32; 768];
    bins[5] = 42;
    fs::write(
        dir.path().join("chars").join("settled").join("sol-left.json"),
        serde_json::to_string(&bins).unwrap(),
    )
    .unwrap();

    let library = ReferenceLibrary::load(dir.path()).unwrap();
    let signatures = library
        .characters()
        .signatures(Side::Left, Pose::Settled, MetricKind::Histogram);
    match &signatures[0].signature {
        ReferenceSignature::Histogram(histogram) => {
            assert_eq!(histogram.bins()[5], 42);
            assert_eq!(histogram.bins().iter().sum::<u32>(), 42);
        }
        other => panic!("expected histogram signature, got {:?}", other.kind()),
    }
}

#[test]
fn histogram_json_with_wrong_bin_count_is_fatal() {
    let dir = write_fixture();
    fs::write(
        dir.path().join("chars").join("settled").join("sol-left.json"),
        "[1, 2, 3]",
    )
    .unwrap();

    let error = ReferenceLibrary::load(dir.path()).unwrap_err();
    match error {
        ScanError::AssetLoad { reason, .. } => {
            assert!(reason.contains("768"), "{reason}");
        }
        other => panic!("expected asset error, got {other}"),
    }
}

#[test]
fn empty_mask_is_fatal() {
    let dir = write_fixture();
    save_gray(
        &dir.path().join("splash-mask.png"),
        &GrayImage::from_pixel(8, 8, Luma([0])),
    );

    let error = ReferenceLibrary::load(dir.path()).unwrap_err();
    match error {
        ScanError::AssetLoad { reason, .. } => {
            assert!(reason.contains("no pixels"), "{reason}");
        }
        other => panic!("expected asset error, got {other}"),
    }
}

#[test]
fn early_pose_directory_is_optional() {
    let dir = write_fixture();
    let library = ReferenceLibrary::load(dir.path()).unwrap();

    // No early/ directory on disk; early lookups serve settled art.
    let early = library
        .characters()
        .signatures(Side::Left, Pose::Early, MetricKind::Histogram);
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].pose, Pose::Settled);
}
