//! Temporal segmentation of the video stream.
//!
//! [`TemporalScanner`] drives the frame-by-frame traversal and owns the
//! splash-screen state machine:
//!
//! ```text
//! SEEKING ──splash overlap──▶ SPLASH_RISING ──falling edge──▶ COMMIT
//!    ▲                                                          │
//!    └────────────── cooldown ◀───────────── DISCARD ◀──────────┘
//! ```
//!
//! While seeking, frames are probed at a coarse step; the instant one beats
//! the splash threshold, every subsequent frame is consumed until the splash
//! disappears. At the falling edge the buffered window is checked against
//! the rejection banks, the identification frame is chosen (early pose for a
//! short or interrupted splash, settled pose otherwise), and both characters
//! are resolved. Results are buffered in memory and returned as a
//! [`ScanReport`]; writing them anywhere is the caller's concern, so a sink
//! failure can never lose already-computed matches.
//!
//! # Example
//!
//! ```no_run
//! use matchdex::{
//!     ClassifierConfig, ReferenceLibrary, ScanConfig, TemporalScanner, VideoFrameSource,
//! };
//!
//! let library = ReferenceLibrary::load("data")?;
//! let scanner = TemporalScanner::new(&library, ScanConfig::new(), ClassifierConfig::new());
//! let mut source = VideoFrameSource::open("video.webm")?;
//! let report = scanner.scan(&mut source)?;
//! for result in &report.matches {
//!     println!("{:.0}s {}", result.timestamp.as_secs_f64(), result.title);
//! }
//! # Ok::<(), matchdex::ScanError>(())
//! ```

use std::{fmt, time::Duration};

use image::RgbImage;

use crate::{
    buffer::FrameBuffer,
    classify::{ModeClassifier, Rejection},
    config::{ClassifierConfig, ScanConfig},
    error::ScanError,
    identify::{CharacterIdentifier, IdentifyFailure},
    library::ReferenceLibrary,
    report::format_title,
    signature::{MetricKind, Pose, Side, masked_histogram},
    source::{AmplitudeProbe, DecodedFrame, FrameSource},
};

/// A finalized match detection.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Timestamp of the splash rising edge (the match start).
    pub timestamp: Duration,
    /// Left-side character identifier.
    pub left: String,
    /// Right-side character identifier.
    pub right: String,
    /// Formatted title, e.g. `"sol vs ky"`.
    pub title: String,
}

/// Why a splash candidate was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// A rejection bank fired inside the candidate window.
    Bank(Rejection),
    /// The splash audio was silent (demo/attract mode).
    SilentAudio {
        /// Peak amplitude observed at the splash timestamp.
        peak: f32,
        /// The configured silence floor.
        threshold: f32,
    },
    /// One side could not be identified confidently.
    Character(IdentifyFailure),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Bank(rejection) => write!(f, "{rejection}"),
            RejectReason::SilentAudio { peak, threshold } => {
                write!(f, "silent audio (peak {peak:.5} < {threshold:.5})")
            }
            RejectReason::Character(failure) => write!(f, "{failure}"),
        }
    }
}

/// A discarded candidate, kept for diagnostics and threshold tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    /// Timestamp of the candidate's splash rising edge.
    pub timestamp: Duration,
    /// What fired.
    pub reason: RejectReason,
}

/// The ordered output of a full scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Committed matches in chronological detection order.
    pub matches: Vec<MatchResult>,
    /// Discarded candidates in chronological order.
    pub rejections: Vec<RejectedCandidate>,
}

/// Observer for scan progress and per-candidate outcomes.
///
/// All methods default to no-ops; implement only what you need. The CLI
/// uses this for its progress bar and live match printing, and a tuning
/// harness can collect rejections without touching the scan loop.
pub trait ScanObserver {
    /// Called once per decoded frame with the current position.
    fn on_progress(&self, _position: Duration, _duration: Duration) {}

    /// Called when a candidate commits.
    fn on_match(&self, _result: &MatchResult) {}

    /// Called when a candidate is discarded.
    fn on_rejection(&self, _rejection: &RejectedCandidate) {}
}

/// The default observer: does nothing.
pub struct NoOpObserver;

impl ScanObserver for NoOpObserver {}

/// Transient state between a splash rising edge and its resolution.
struct Candidate {
    early_timestamp: Duration,
    early_frame: RgbImage,
    settled_timestamp: Duration,
    settled_frame: RgbImage,
    /// Masked histogram of the latest rising frame, for the continuity
    /// re-trigger check.
    previous_histogram: Vec<u32>,
}

impl Candidate {
    fn rising(frame: &DecodedFrame, histogram: Vec<u32>) -> Self {
        Self {
            early_timestamp: frame.timestamp,
            early_frame: frame.image.clone(),
            settled_timestamp: frame.timestamp,
            settled_frame: frame.image.clone(),
            previous_histogram: histogram,
        }
    }

    fn extend(&mut self, frame: &DecodedFrame, histogram: Vec<u32>) {
        self.settled_timestamp = frame.timestamp;
        self.settled_frame = frame.image.clone();
        self.previous_histogram = histogram;
    }
}

/// The frame-classification driver.
///
/// Holds the immutable reference library plus scan and classifier
/// configuration; one scanner can process any number of sources.
pub struct TemporalScanner<'a> {
    library: &'a ReferenceLibrary,
    scan_config: ScanConfig,
    classifier_config: ClassifierConfig,
}

impl<'a> TemporalScanner<'a> {
    /// Create a scanner over `library` with the given configuration.
    pub fn new(
        library: &'a ReferenceLibrary,
        scan_config: ScanConfig,
        classifier_config: ClassifierConfig,
    ) -> Self {
        Self {
            library,
            scan_config,
            classifier_config,
        }
    }

    /// Scan a frame source with no audio probe and no observer.
    pub fn scan(&self, source: &mut dyn FrameSource) -> Result<ScanReport, ScanError> {
        self.scan_with_observer(source, None, &NoOpObserver)
    }

    /// Scan with an optional audio amplitude probe for silent-demo
    /// rejection.
    pub fn scan_with_probe(
        &self,
        source: &mut dyn FrameSource,
        probe: Option<&mut dyn AmplitudeProbe>,
    ) -> Result<ScanReport, ScanError> {
        self.scan_with_observer(source, probe, &NoOpObserver)
    }

    /// Full-control scan: optional probe plus an observer for progress and
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Only source-fatal conditions (e.g. a broken demuxer) return `Err`;
    /// individual undecodable frames are logged and skipped without
    /// disturbing the temporal state, and below-threshold classifications
    /// land in [`ScanReport::rejections`].
    pub fn scan_with_observer(
        &self,
        source: &mut dyn FrameSource,
        mut probe: Option<&mut dyn AmplitudeProbe>,
        observer: &dyn ScanObserver,
    ) -> Result<ScanReport, ScanError> {
        let classifier = ModeClassifier::new(self.library, &self.classifier_config);
        let identifier = CharacterIdentifier::new(self.library, &self.classifier_config);
        let splash = self.library.splash();

        let mut buffer = FrameBuffer::new(self.scan_config.buffer_window);
        let mut report = ScanReport::default();
        let mut candidate: Option<Candidate> = None;
        let mut next_probe = Duration::ZERO;
        let mut last_timestamp = Duration::ZERO;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(error) => {
                    // A single bad frame must not reset SPLASH_RISING.
                    log::warn!("Skipping undecodable frame: {error}");
                    continue;
                }
            };
            last_timestamp = frame.timestamp;
            observer.on_progress(frame.timestamp, source.duration());

            // Every frame enters the buffer, including coarsely skipped
            // ones; the rejection lookback needs them.
            buffer.push(frame.clone());

            match candidate.take() {
                None => {
                    if frame.timestamp < next_probe {
                        continue;
                    }
                    let histogram = masked_histogram(&frame.image, splash.mask());
                    let score = splash.overlap(&histogram);
                    if MetricKind::Histogram.beats(score, self.classifier_config.splash_overlap) {
                        log::debug!(
                            "Splash rising edge at {:.2}s (overlap {score:.3})",
                            frame.timestamp.as_secs_f64(),
                        );
                        candidate = Some(Candidate::rising(&frame, histogram));
                    } else {
                        next_probe = frame.timestamp + self.scan_config.probe_step;
                    }
                }
                Some(mut current) => {
                    let histogram = masked_histogram(&frame.image, splash.mask());
                    let score = splash.overlap(&histogram);
                    let still_splash = MetricKind::Histogram
                        .beats(score, self.classifier_config.splash_overlap)
                        || self.histogram_continuity(&histogram, &current.previous_histogram);
                    if still_splash {
                        current.extend(&frame, histogram);
                        candidate = Some(current);
                    } else {
                        self.resolve(
                            current,
                            frame.timestamp,
                            &buffer,
                            &classifier,
                            &identifier,
                            probe.as_deref_mut(),
                            observer,
                            &mut report,
                        );
                        next_probe = frame.timestamp + self.scan_config.cooldown;
                    }
                }
            }
        }

        // End of stream is a falling edge for a pending candidate.
        if let Some(current) = candidate {
            self.resolve(
                current,
                last_timestamp,
                &buffer,
                &classifier,
                &identifier,
                probe.as_deref_mut(),
                observer,
                &mut report,
            );
        }

        log::info!(
            "Scan complete: {} matches, {} rejected candidates",
            report.matches.len(),
            report.rejections.len(),
        );
        Ok(report)
    }

    /// Secondary splash check: the splash silhouette shifting slightly as
    /// overlay text animates in still overlaps the previous rising frame.
    fn histogram_continuity(&self, current: &[u32], previous: &[u32]) -> bool {
        let total: u64 = previous.iter().map(|&b| u64::from(b)).sum();
        if total == 0 {
            return false;
        }
        let intersection: u64 = current
            .iter()
            .zip(previous)
            .map(|(&c, &p)| u64::from(c.min(p)))
            .sum();
        intersection as f64 / total as f64 >= self.classifier_config.splash_continuity
    }

    /// Resolve a candidate at its falling edge: rejection banks, silence
    /// probe, pose selection, then both character identifications.
    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        candidate: Candidate,
        exit_timestamp: Duration,
        buffer: &FrameBuffer,
        classifier: &ModeClassifier<'_>,
        identifier: &CharacterIdentifier<'_>,
        probe: Option<&mut (dyn AmplitudeProbe + '_)>,
        observer: &dyn ScanObserver,
        report: &mut ScanReport,
    ) {
        let discard = |report: &mut ScanReport, reason: RejectReason| {
            let rejection = RejectedCandidate {
                timestamp: candidate.early_timestamp,
                reason,
            };
            log::debug!(
                "Discarding candidate at {:.2}s: {}",
                rejection.timestamp.as_secs_f64(),
                rejection.reason,
            );
            observer.on_rejection(&rejection);
            report.rejections.push(rejection);
        };

        let lookback_start = candidate
            .early_timestamp
            .saturating_sub(self.scan_config.rejection_lookback);
        if let Some(rejection) = classifier.check_window(buffer.range(lookback_start, exit_timestamp))
        {
            discard(report, RejectReason::Bank(rejection));
            return;
        }

        if let Some(probe) = probe {
            match probe.amplitude_at(candidate.early_timestamp) {
                Ok(samples) => {
                    let peak = samples.iter().fold(0f32, |max, &s| max.max(s.abs()));
                    if peak < self.classifier_config.silence_amplitude {
                        discard(
                            report,
                            RejectReason::SilentAudio {
                                peak,
                                threshold: self.classifier_config.silence_amplitude,
                            },
                        );
                        return;
                    }
                }
                Err(error) => {
                    // Audio is an optional signal; a probe failure never
                    // discards a candidate on its own.
                    log::warn!("Amplitude probe failed, skipping silence check: {error}");
                }
            }
        }

        // An uninterrupted splash sequence settles into the final pose; a
        // short window (rematch, quick transition) only ever shows the
        // early art.
        let splash_span = candidate
            .settled_timestamp
            .saturating_sub(candidate.early_timestamp);
        let (frame, pose) = if splash_span > self.scan_config.settle_gap {
            (&candidate.settled_frame, Pose::Settled)
        } else {
            (&candidate.early_frame, Pose::Early)
        };

        let left = match identifier.identify(Side::Left, pose, frame) {
            Ok(identification) => identification,
            Err(failure) => {
                discard(report, RejectReason::Character(failure));
                return;
            }
        };
        let right = match identifier.identify(Side::Right, pose, frame) {
            Ok(identification) => identification,
            Err(failure) => {
                discard(report, RejectReason::Character(failure));
                return;
            }
        };

        let result = MatchResult {
            timestamp: candidate.early_timestamp,
            title: format_title(&left.character, &right.character),
            left: left.character,
            right: right.character,
        };
        log::info!(
            "Match at {:.0}s: {}",
            result.timestamp.as_secs_f64(),
            result.title,
        );
        observer.on_match(&result);
        report.matches.push(result);
    }
}
