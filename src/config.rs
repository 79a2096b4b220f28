//! Scan and classifier configuration.
//!
//! Every empirically tuned threshold lives in [`ClassifierConfig`], keyed by
//! name (and by bank name for the rejection banks), so tuning never touches
//! decision logic. The defaults reproduce the values calibrated against the
//! game's rendering; treat them as calibration inputs, not contract.
//!
//! [`ScanConfig`] carries the temporal parameters of the scanner — probe
//! step, cooldown, buffer window — as a builder in the same style:
//!
//! ```
//! use std::time::Duration;
//!
//! use matchdex::ScanConfig;
//!
//! let config = ScanConfig::new()
//!     .with_probe_step(Duration::from_millis(250))
//!     .with_cooldown(Duration::from_secs(10));
//! assert_eq!(config.probe_step, Duration::from_millis(250));
//! ```

use std::{collections::HashMap, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::ScanError;
use crate::signature::MetricKind;

fn default_splash_overlap() -> f64 {
    0.7
}

fn default_splash_continuity() -> f64 {
    0.8
}

fn default_character_overlap() -> f64 {
    0.7
}

fn default_ambiguity_delta() -> f64 {
    0.03
}

fn default_rgb_distance() -> f64 {
    75.0
}

fn default_hash_distance() -> f64 {
    80.0
}

fn default_silence_amplitude() -> f32 {
    0.001
}

/// Classification thresholds, one per decision point.
///
/// Deserializable from JSON so a tuning run can sweep values without a
/// rebuild; any omitted field keeps its default. Rejection banks each get
/// their own threshold — thresholds are never shared across banks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum masked-histogram overlap for a frame to count as the splash
    /// screen.
    pub splash_overlap: f64,
    /// Minimum overlap between consecutive rising-window histograms for the
    /// splash window to survive a frame that fails `splash_overlap` (overlay
    /// text animating in).
    pub splash_continuity: f64,
    /// Minimum histogram overlap for the best-ranked character to be
    /// accepted at all.
    pub character_overlap: f64,
    /// Best-to-second-best overlap margin at or below which the identifier
    /// switches to the masked-RGB fallback.
    pub ambiguity_delta: f64,
    /// Maximum masked-RGB distance for a reference to count as a match
    /// (rejection banks and the character fallback).
    pub rgb_distance: f64,
    /// Maximum summed perceptual-hash distance for a hash reference to
    /// count as a match.
    pub hash_distance: f64,
    /// Peak amplitude below which the splash audio counts as silent
    /// (demo/attract mode).
    pub silence_amplitude: f32,
    /// Per-bank threshold overrides, keyed by bank directory name.
    #[serde(rename = "banks")]
    bank_thresholds: HashMap<String, f64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            splash_overlap: default_splash_overlap(),
            splash_continuity: default_splash_continuity(),
            character_overlap: default_character_overlap(),
            ambiguity_delta: default_ambiguity_delta(),
            rgb_distance: default_rgb_distance(),
            hash_distance: default_hash_distance(),
            silence_amplitude: default_silence_amplitude(),
            bank_thresholds: HashMap::new(),
        }
    }
}

impl ClassifierConfig {
    /// Create a configuration with the calibrated defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ConfigError`] if the file cannot be read or
    /// parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|error| ScanError::ConfigError {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|error| ScanError::ConfigError {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }

    /// The threshold for a rejection bank, falling back to the default for
    /// the reference's metric when no override exists for `bank`.
    pub fn bank_threshold(&self, bank: &str, kind: MetricKind) -> f64 {
        self.bank_thresholds
            .get(bank)
            .copied()
            .unwrap_or_else(|| self.metric_default(kind))
    }

    /// The default acceptance threshold for a metric kind.
    pub fn metric_default(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::MaskedRgb => self.rgb_distance,
            MetricKind::PerceptualHash => self.hash_distance,
            MetricKind::Histogram => self.splash_overlap,
        }
    }

    /// Override the threshold for one rejection bank.
    #[must_use]
    pub fn with_bank_threshold(mut self, bank: impl Into<String>, threshold: f64) -> Self {
        self.bank_thresholds.insert(bank.into(), threshold);
        self
    }

    /// Set the splash-screen overlap threshold.
    #[must_use]
    pub fn with_splash_overlap(mut self, threshold: f64) -> Self {
        self.splash_overlap = threshold;
        self
    }

    /// Set the character acceptance overlap threshold.
    #[must_use]
    pub fn with_character_overlap(mut self, threshold: f64) -> Self {
        self.character_overlap = threshold;
        self
    }

    /// Set the ambiguity margin that triggers the fallback comparison.
    #[must_use]
    pub fn with_ambiguity_delta(mut self, delta: f64) -> Self {
        self.ambiguity_delta = delta;
        self
    }

    /// Set the masked-RGB distance threshold.
    #[must_use]
    pub fn with_rgb_distance(mut self, threshold: f64) -> Self {
        self.rgb_distance = threshold;
        self
    }
}

/// Temporal parameters of the scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Coarse seek step while no splash is in progress.
    pub probe_step: Duration,
    /// Skip applied after a candidate commits or is discarded; a real match
    /// cannot immediately restart.
    pub cooldown: Duration,
    /// Retention window of the rolling frame buffer.
    pub buffer_window: Duration,
    /// How far before the splash rising edge the mode classifier looks for
    /// rejection banners.
    pub rejection_lookback: Duration,
    /// Minimum early-to-settled gap for the splash to count as
    /// uninterrupted (settled frame + settled references); shorter windows
    /// identify from the early frame with the early-pose set.
    pub settle_gap: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_step: Duration::from_millis(500),
            cooldown: Duration::from_secs(5),
            buffer_window: Duration::from_secs(8),
            rejection_lookback: Duration::from_secs(2),
            settle_gap: Duration::from_secs(1),
        }
    }
}

impl ScanConfig {
    /// Create a configuration with default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coarse probe step used while seeking.
    #[must_use]
    pub fn with_probe_step(mut self, step: Duration) -> Self {
        self.probe_step = step;
        self
    }

    /// Set the post-candidate cooldown skip.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the frame-buffer retention window.
    #[must_use]
    pub fn with_buffer_window(mut self, window: Duration) -> Self {
        self.buffer_window = window;
        self
    }

    /// Set the rejection lookback span.
    #[must_use]
    pub fn with_rejection_lookback(mut self, lookback: Duration) -> Self {
        self.rejection_lookback = lookback;
        self
    }

    /// Set the early/settled decision gap.
    #[must_use]
    pub fn with_settle_gap(mut self, gap: Duration) -> Self {
        self.settle_gap = gap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibration() {
        let config = ClassifierConfig::default();
        assert_eq!(config.splash_overlap, 0.7);
        assert_eq!(config.rgb_distance, 75.0);
        assert_eq!(config.ambiguity_delta, 0.03);
        assert_eq!(config.bank_threshold("training", MetricKind::MaskedRgb), 75.0);
    }

    #[test]
    fn bank_override_does_not_leak() {
        let config = ClassifierConfig::new().with_bank_threshold("mom", 60.0);
        assert_eq!(config.bank_threshold("mom", MetricKind::MaskedRgb), 60.0);
        assert_eq!(config.bank_threshold("training", MetricKind::MaskedRgb), 75.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"splash_overlap": 0.8, "banks": {"mom": 50.0}}"#).unwrap();
        assert_eq!(config.splash_overlap, 0.8);
        assert_eq!(config.character_overlap, 0.7);
        assert_eq!(config.bank_threshold("mom", MetricKind::Histogram), 50.0);
    }
}
