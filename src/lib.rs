//! # matchdex
//!
//! Detect fighting-game matches in long VODs — find match-start splash
//! screens, reject non-competitive modes, identify both characters, and
//! emit timestamped match titles.
//!
//! `matchdex` decodes video through FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, compares
//! frames against a reference asset library with masked-RGB, histogram,
//! and perceptual-hash signatures, and runs a temporal state machine over
//! the decoded stream to turn per-frame scores into match results.
//!
//! ## Quick Start
//!
//! ```no_run
//! use matchdex::{ReferenceLibrary, ScanConfig, TemporalScanner, VideoFrameSource};
//!
//! let library = ReferenceLibrary::load("data")?;
//! let scanner = TemporalScanner::new(&library, ScanConfig::default(), Default::default());
//!
//! let mut source = VideoFrameSource::open("vod.webm")?;
//! let report = scanner.scan(&mut source)?;
//! for found in &report.matches {
//!     println!("{:?} {}", found.timestamp, found.title);
//! }
//! # Ok::<(), matchdex::ScanError>(())
//! ```
//!
//! ## Pipeline
//!
//! - **[`ReferenceLibrary`]** — loads splash, rejection-bank, and
//!   character references from an asset directory
//! - **[`TemporalScanner`]** — probes frames coarsely, tracks splash
//!   candidates, and commits or discards them
//! - **[`ModeClassifier`]** — rejects training, replay-viewer, and other
//!   non-competitive splash variants
//! - **[`CharacterIdentifier`]** — names both characters with histogram
//!   ranking and a masked-RGB tiebreak
//!
//! Every threshold is configurable through [`ClassifierConfig`] and
//! [`ScanConfig`]; the defaults are tuned for 256×144 frames.

pub mod audio;
pub mod buffer;
pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod identify;
pub mod library;
pub mod phash;
pub mod report;
pub mod scanner;
pub mod signature;
pub mod source;
pub mod video;

pub use audio::AudioAmplitudeProbe;
pub use buffer::FrameBuffer;
pub use classify::{ModeClassifier, Rejection};
pub use compare::compare;
pub use config::{ClassifierConfig, ScanConfig};
pub use error::ScanError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use identify::{CharacterIdentifier, Identification, IdentifyFailure};
pub use library::{CharacterLibrary, ReferenceLibrary, RejectionBank};
pub use phash::{HashKind, hamming};
pub use report::{format_timestamp, format_title};
pub use scanner::{
    MatchResult, NoOpObserver, RejectReason, RejectedCandidate, ScanObserver, ScanReport,
    TemporalScanner,
};
pub use signature::{
    CharacterSignature, CropRegion, HashSignature, HistogramSignature, MaskedRgbSignature,
    MetricKind, NamedReference, Pose, ReferenceSignature, RegionMask, Side,
};
pub use source::{AmplitudeProbe, DecodedFrame, FrameSource};
pub use video::{TARGET_HEIGHT, TARGET_WIDTH, VideoFrameSource};
