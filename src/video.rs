//! FFmpeg-backed frame source.
//!
//! [`VideoFrameSource`] opens a media file, locates the best video stream,
//! and decodes frames sequentially at the fixed classification resolution.
//! Frames are scaled with FFmpeg's fast bilinear filter — the classifier
//! compares coarse color statistics, so decode speed wins over scaling
//! quality.
//!
//! # Example
//!
//! ```no_run
//! use matchdex::{FrameSource, VideoFrameSource};
//!
//! let mut source = VideoFrameSource::open("video.webm")?;
//! while let Some(frame) = source.next_frame()? {
//!     println!("{:.2}s", frame.timestamp.as_secs_f64());
//! }
//! # Ok::<(), matchdex::ScanError>(())
//! ```

use std::{path::Path, time::Duration};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    error::ScanError,
    source::{DecodedFrame, FrameSource},
};

/// Classification frame width in pixels.
pub const TARGET_WIDTH: u32 = 256;
/// Classification frame height in pixels.
pub const TARGET_HEIGHT: u32 = 144;

/// Sequential video decoder yielding frames at the target resolution.
pub struct VideoFrameSource {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    duration: Duration,
    frame_rate: f64,
    source_width: u32,
    source_height: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl VideoFrameSource {
    /// Open a media file for sequential frame decoding.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, locates the best
    /// video stream, and sets up a decoder plus a fast-bilinear scaler to
    /// [`TARGET_WIDTH`]×[`TARGET_HEIGHT`] RGB24.
    ///
    /// # Errors
    ///
    /// - [`ScanError::FileOpen`] if the file cannot be opened.
    /// - [`ScanError::NoVideoStream`] if no video stream exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();
        log::debug!("Opening video source: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| ScanError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| ScanError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(ScanError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let rate = stream.avg_frame_rate();
        let frame_rate = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;
        let source_width = decoder.width();
        let source_height = decoder.height();

        let scaler = ScalingContext::get(
            decoder.format(),
            source_width,
            source_height,
            Pixel::RGB24,
            TARGET_WIDTH,
            TARGET_HEIGHT,
            ScalingFlags::FAST_BILINEAR,
        )?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            duration,
            frame_rate,
            source_width,
            source_height,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }

    /// Average frame rate of the source stream.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Source resolution before scaling, `(width, height)`.
    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// Convert the current scaled frame into a [`DecodedFrame`].
    fn convert_current_frame(&self) -> Result<RgbImage, ScanError> {
        let buffer = frame_to_rgb_buffer(&self.scaled_frame, TARGET_WIDTH, TARGET_HEIGHT);
        RgbImage::from_raw(TARGET_WIDTH, TARGET_HEIGHT, buffer).ok_or_else(|| {
            ScanError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }

    fn pts_to_timestamp(&self, pts: i64) -> Duration {
        let seconds = pts as f64 * self.time_base.numerator() as f64
            / self.time_base.denominator() as f64;
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

impl FrameSource for VideoFrameSource {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, ScanError> {
        if self.done {
            return Ok(None);
        }

        loop {
            // Drain frames the decoder has already produced.
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let timestamp = self.pts_to_timestamp(self.decoded_frame.pts().unwrap_or(0));
                if let Err(error) = self.scaler.run(&self.decoded_frame, &mut self.scaled_frame) {
                    // The next frame may still be scalable; report this one
                    // as skippable.
                    return Err(ScanError::VideoDecodeError(format!(
                        "Scaling failed at {:.2}s: {error}",
                        timestamp.as_secs_f64(),
                    )));
                }
                let image = self.convert_current_frame()?;
                return Ok(Some(DecodedFrame { timestamp, image }));
            }

            if self.eof_sent {
                self.done = true;
                return Ok(None);
            }

            // Feed the decoder more packets.
            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index
                        && let Err(error) = self.decoder.send_packet(&packet)
                    {
                        // Corrupt packet; recoverable from the next one.
                        return Err(ScanError::VideoDecodeError(format!(
                            "Decoder rejected packet: {error}"
                        )));
                    }
                    // Non-video packets are silently skipped.
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(_) => {
                    // Non-fatal read error — try the next packet.
                }
            }
        }
    }

    fn duration(&self) -> Duration {
        self.duration
    }
}

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB
/// buffer, stripping per-row stride padding.
fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}
