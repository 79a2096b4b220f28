//! Error types for the `matchdex` crate.
//!
//! This module defines [`ScanError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry rich context to aid
//! debugging, including file paths and upstream error messages.
//!
//! Classification outcomes below an acceptance threshold are **not** errors —
//! they surface as [`RejectedCandidate`](crate::RejectedCandidate) values in
//! the scan report instead.

use std::path::PathBuf;

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `matchdex` operations.
///
/// Every public method that can fail returns `Result<T, ScanError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    /// A reference asset could not be loaded or parsed.
    ///
    /// Raised during [`ReferenceLibrary::load`](crate::ReferenceLibrary::load);
    /// the scanner cannot operate without its full signature bank, so this is
    /// fatal before any frame is processed.
    #[error("Failed to load reference asset {path}: {reason}")]
    AssetLoad {
        /// Path of the offending asset or directory.
        path: PathBuf,
        /// Underlying reason the load failed.
        reason: String,
    },

    /// The video file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFrameSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The file does not contain an audio stream.
    #[error("No audio stream found in file")]
    NoAudioStream,

    /// A video frame could not be decoded.
    ///
    /// The scanner treats this as a skippable condition mid-scan; it is only
    /// fatal when no frame can be decoded at all.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// Audio data could not be decoded for the amplitude probe.
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// A threshold configuration file could not be parsed.
    #[error("Failed to read classifier config {path}: {reason}")]
    ConfigError {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parse or I/O failure.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl From<FfmpegError> for ScanError {
    fn from(error: FfmpegError) -> Self {
        ScanError::FfmpegError(error.to_string())
    }
}
