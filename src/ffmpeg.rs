//! FFmpeg log level configuration.
//!
//! FFmpeg logs to stderr through its own machinery, independent of the
//! Rust [`log`](https://crates.io/crates/log) crate. Scanning a long VOD
//! decodes tens of thousands of frames, so even FFmpeg's default warning
//! chatter gets noisy. This wrapper lets callers tune or silence it
//! without importing `ffmpeg-next` directly.

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity, mapping to the `AV_LOG_*` constants.
///
/// Ordered most quiet to most verbose:
/// `Quiet` < `Fatal` < `Error` < `Warning` < `Info` < `Debug`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default level).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// Controls what FFmpeg itself prints to stderr. It does **not** affect
/// Rust-side `log` crate output.
///
/// # Example
///
/// ```no_run
/// use matchdex::FfmpegLogLevel;
///
/// matchdex::set_ffmpeg_log_level(FfmpegLogLevel::Error);
/// ```
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
