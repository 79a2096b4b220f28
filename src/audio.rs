//! Seekable audio amplitude probing.
//!
//! [`AudioAmplitudeProbe`] maintains its own demuxer so it can seek to an
//! arbitrary position without disturbing the sequential video decode. A
//! probe seeks to the nearest keyframe before the requested timestamp,
//! decodes forward, and returns one frame's worth of mono f32 samples.
//! Splash screens in training and replay-viewer modes play over silence,
//! so a near-zero peak amplitude at the splash position marks the
//! candidate as non-competitive.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    ChannelLayout, Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Audio as AudioDecoder,
    format::{Sample, context::Input, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    software::resampling::Context as ResamplingContext,
};

use crate::{error::ScanError, source::AmplitudeProbe};

/// Convert a [`Duration`] to a seek timestamp in AV_TIME_BASE (microseconds).
fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}

/// Audio probe backed by an independent FFmpeg demuxer.
pub struct AudioAmplitudeProbe {
    input_context: Input,
    decoder: AudioDecoder,
    resampler: ResamplingContext,
    audio_stream_index: usize,
    time_base_num: i32,
    time_base_den: i32,
    decoded_frame: AudioFrame,
    resampled_frame: AudioFrame,
    file_path: PathBuf,
}

impl AudioAmplitudeProbe {
    /// Open a media file for audio probing.
    ///
    /// # Errors
    ///
    /// - [`ScanError::FileOpen`] if the file cannot be opened.
    /// - [`ScanError::NoAudioStream`] if no audio stream exists.
    /// - [`ScanError::AudioDecodeError`] if the decoder or resampler
    ///   cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();
        log::debug!("Opening audio probe: {}", file_path.display());

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
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or(ScanError::NoAudioStream)?;
        let audio_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().audio().map_err(|error| {
            ScanError::AudioDecodeError(format!("Failed to create audio decoder: {error}"))
        })?;

        let sample_rate = decoder.rate();
        let resampler = ResamplingContext::get(
            decoder.format(),
            decoder.channel_layout(),
            sample_rate,
            Sample::F32(SampleType::Packed),
            ChannelLayout::MONO,
            sample_rate,
        )
        .map_err(|error| {
            ScanError::AudioDecodeError(format!("Failed to create resampler: {error}"))
        })?;

        Ok(Self {
            input_context,
            decoder,
            resampler,
            audio_stream_index,
            time_base_num: time_base.numerator(),
            time_base_den: time_base.denominator(),
            decoded_frame: AudioFrame::empty(),
            resampled_frame: AudioFrame::empty(),
            file_path,
        })
    }

    fn pts_to_seconds(&self, pts: i64) -> f64 {
        pts as f64 * self.time_base_num as f64 / self.time_base_den as f64
    }

    /// Decode forward until a frame at or past `target_seconds`, then
    /// resample it to mono f32.
    fn decode_frame_at(&mut self, target_seconds: f64) -> Result<Vec<f32>, ScanError> {
        let mut eof_sent = false;

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let frame_seconds = self.pts_to_seconds(self.decoded_frame.pts().unwrap_or(0));
                if frame_seconds < target_seconds && !eof_sent {
                    continue;
                }

                self.resampler
                    .run(&self.decoded_frame, &mut self.resampled_frame)
                    .map_err(|error| {
                        ScanError::AudioDecodeError(format!("Resample error: {error}"))
                    })?;

                let data = self.resampled_frame.data(0);
                let sample_count = self.resampled_frame.samples();
                let float_samples: &[f32] = unsafe {
                    std::slice::from_raw_parts(data.as_ptr() as *const f32, sample_count)
                };
                return Ok(float_samples.to_vec());
            }

            if eof_sent {
                return Err(ScanError::AudioDecodeError(format!(
                    "No audio frame at {target_seconds:.2}s in {}",
                    self.file_path.display(),
                )));
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.audio_stream_index {
                        self.decoder.send_packet(&packet).map_err(|error| {
                            ScanError::AudioDecodeError(format!(
                                "Decoder rejected packet: {error}"
                            ))
                        })?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof().map_err(|error| {
                        ScanError::AudioDecodeError(format!("EOF flush failed: {error}"))
                    })?;
                    eof_sent = true;
                }
                Err(_) => {
                    // Non-fatal read error — try next packet.
                }
            }
        }
    }
}

impl AmplitudeProbe for AudioAmplitudeProbe {
    fn amplitude_at(&mut self, timestamp: Duration) -> Result<Vec<f32>, ScanError> {
        let seek_target = duration_to_seek_timestamp(timestamp);
        self.input_context
            .seek(seek_target, ..seek_target)
            .map_err(|error| {
                ScanError::AudioDecodeError(format!(
                    "Seek to {:.2}s failed: {error}",
                    timestamp.as_secs_f64(),
                ))
            })?;
        self.decoder.flush();
        self.decode_frame_at(timestamp.as_secs_f64())
    }
}
