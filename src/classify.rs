//! Non-competitive mode rejection.
//!
//! [`ModeClassifier`] decides whether a suspected splash window belongs to a
//! real head-to-head match or to a mode that merely resembles one — attract
//! demos, practice timers, single-elimination variants. Each rejection bank
//! is checked independently with its own threshold, so new exclusion
//! categories are new banks, not new code.
//!
//! Rejections carry (bank, reference, score, threshold) for diagnostic
//! logging and threshold tuning; a discarded candidate is a normal outcome,
//! never an error.

use std::fmt;

use image::RgbImage;

use crate::{
    compare::compare,
    config::ClassifierConfig,
    library::ReferenceLibrary,
    source::DecodedFrame,
};

/// A rejection-bank hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Name of the bank that fired.
    pub bank: String,
    /// Name of the specific reference that matched.
    pub reference: String,
    /// The comparator score of the match.
    pub score: f64,
    /// The threshold the score beat.
    pub threshold: f64,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bank {} reference {} (score {:.3}, threshold {:.3})",
            self.bank, self.reference, self.score, self.threshold
        )
    }
}

/// State-free classifier over the library's rejection banks.
pub struct ModeClassifier<'a> {
    library: &'a ReferenceLibrary,
    config: &'a ClassifierConfig,
}

impl<'a> ModeClassifier<'a> {
    /// Create a classifier borrowing the library and thresholds.
    pub fn new(library: &'a ReferenceLibrary, config: &'a ClassifierConfig) -> Self {
        Self { library, config }
    }

    /// Check one frame against every bank; the first hit wins.
    ///
    /// Banks are evaluated in load order and independently, so the result
    /// for one bank never depends on another's contents.
    pub fn check_frame(&self, frame: &RgbImage) -> Option<Rejection> {
        for bank in self.library.banks() {
            for reference in &bank.references {
                let kind = reference.signature.kind();
                let threshold = self.config.bank_threshold(&bank.name, kind);
                let score = compare(&reference.signature, frame);
                if kind.beats(score, threshold) {
                    return Some(Rejection {
                        bank: bank.name.clone(),
                        reference: reference.name.clone(),
                        score,
                        threshold,
                    });
                }
            }
        }
        None
    }

    /// Check a window of buffered frames, oldest first.
    ///
    /// Used at the splash falling edge with the lookback span, catching
    /// banners that appear just before or during the splash without landing
    /// on the exact transition frame.
    pub fn check_window<'f, I>(&self, frames: I) -> Option<Rejection>
    where
        I: IntoIterator<Item = &'f DecodedFrame>,
    {
        for frame in frames {
            if let Some(rejection) = self.check_frame(&frame.image) {
                log::debug!(
                    "Rejection at {:.2}s: {rejection}",
                    frame.timestamp.as_secs_f64(),
                );
                return Some(rejection);
            }
        }
        None
    }
}
