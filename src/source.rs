//! Core-facing input boundary.
//!
//! The scanner consumes frames through the [`FrameSource`] trait and, when
//! audio is available, peak amplitudes through [`AmplitudeProbe`]. The
//! FFmpeg-backed implementations live in [`crate::video`] and
//! [`crate::audio`]; tests drive the scanner with synthetic in-memory
//! sources instead.

use std::time::Duration;

use image::RgbImage;

use crate::error::ScanError;

/// A single video frame decoded at the target resolution.
///
/// Ephemeral: frames exist for the duration of their processing and while
/// retained in the rolling [`FrameBuffer`](crate::FrameBuffer).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Presentation timestamp of the frame.
    pub timestamp: Duration,
    /// RGB pixel data at the target resolution.
    pub image: RgbImage,
}

/// A forward-only, pull-based source of decoded frames.
///
/// `next_frame` blocks on decode and returns `Ok(None)` at end of stream.
/// A recoverable mid-stream failure surfaces as `Err`; the scanner logs it,
/// skips the frame, and keeps its temporal state.
pub trait FrameSource {
    /// Decode and return the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, ScanError>;

    /// Total duration of the source, used for progress reporting.
    /// `Duration::ZERO` when unknown.
    fn duration(&self) -> Duration {
        Duration::ZERO
    }
}

/// An audio amplitude sampler.
///
/// Supplying one to the scanner enables the silent-audio rejection signal:
/// the splash of a demo/attract match plays over a muted mix.
pub trait AmplitudeProbe {
    /// Sample amplitudes (mono, normalized to `[-1, 1]`) at `timestamp`.
    fn amplitude_at(&mut self, timestamp: Duration) -> Result<Vec<f32>, ScanError>;
}
