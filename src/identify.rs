//! Character identification.
//!
//! [`CharacterIdentifier`] resolves which character occupies one side of a
//! confirmed splash frame. The primary signal is histogram overlap against
//! the per-character reference set; when the ranking is too close to call,
//! it falls back to the more expensive masked-RGB comparison. A best match
//! below the absolute acceptance threshold rejects the whole candidate —
//! the identifier never emits a low-confidence guess.
//!
//! Both sides are resolved independently and symmetrically: the algorithm
//! only ever sees the reference set and crop mask tagged for the requested
//! [`Side`].

use std::fmt;

use image::RgbImage;

use crate::{
    compare::compare,
    config::ClassifierConfig,
    library::ReferenceLibrary,
    signature::{MetricKind, Pose, Side},
};

/// A resolved character for one side.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    /// The winning character identifier.
    pub character: String,
    /// Score of the winning comparison (metric-native).
    pub score: f64,
    /// Margin between best and second-best primary scores; `f64::INFINITY`
    /// when only one reference exists.
    pub margin: f64,
    /// Whether the masked-RGB fallback decided the result.
    pub via_fallback: bool,
}

/// Why one side could not be identified.
///
/// Any failure discards the whole match candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifyFailure {
    /// The library holds no references for this side and pose.
    NoReferences {
        side: Side,
    },
    /// The best-ranked character fell below the acceptance threshold.
    BelowThreshold {
        side: Side,
        character: String,
        score: f64,
        threshold: f64,
    },
    /// The ranking was ambiguous and the fallback could not resolve it
    /// either.
    AmbiguousUnresolved {
        side: Side,
        best: String,
        runner_up: String,
        margin: f64,
    },
}

impl fmt::Display for IdentifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifyFailure::NoReferences { side } => {
                write!(f, "no {side}-side character references")
            }
            IdentifyFailure::BelowThreshold {
                side,
                character,
                score,
                threshold,
            } => write!(
                f,
                "{side} best match {character} below threshold ({score:.3} < {threshold:.3})"
            ),
            IdentifyFailure::AmbiguousUnresolved {
                side,
                best,
                runner_up,
                margin,
            } => write!(
                f,
                "{side} ambiguous between {best} and {runner_up} (margin {margin:.3}), fallback unresolved"
            ),
        }
    }
}

/// Nearest-signature character matcher with an ambiguity fallback.
pub struct CharacterIdentifier<'a> {
    library: &'a ReferenceLibrary,
    config: &'a ClassifierConfig,
}

impl<'a> CharacterIdentifier<'a> {
    /// Create an identifier borrowing the library and thresholds.
    pub fn new(library: &'a ReferenceLibrary, config: &'a ClassifierConfig) -> Self {
        Self { library, config }
    }

    /// Identify the character on `side` of `frame`, using the reference art
    /// for `pose`.
    ///
    /// Ranks every histogram reference for the side, requires the winner to
    /// clear `character_overlap`, and defers to the masked-RGB fallback when
    /// the winning margin is at or below `ambiguity_delta`. The fallback
    /// winner must in turn beat `rgb_distance` or the side is rejected.
    pub fn identify(
        &self,
        side: Side,
        pose: Pose,
        frame: &RgbImage,
    ) -> Result<Identification, IdentifyFailure> {
        let references = self
            .library
            .characters()
            .signatures(side, pose, MetricKind::Histogram);
        if references.is_empty() {
            return Err(IdentifyFailure::NoReferences { side });
        }

        let mut ranked: Vec<(f64, &str)> = references
            .iter()
            .map(|reference| {
                (
                    compare(&reference.signature, frame),
                    reference.character.as_str(),
                )
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let (best_score, best_name) = ranked[0];
        if !MetricKind::Histogram.beats(best_score, self.config.character_overlap) {
            return Err(IdentifyFailure::BelowThreshold {
                side,
                character: best_name.to_string(),
                score: best_score,
                threshold: self.config.character_overlap,
            });
        }

        let margin = match ranked.get(1) {
            Some(&(runner_up_score, _)) => best_score - runner_up_score,
            None => f64::INFINITY,
        };
        if margin > self.config.ambiguity_delta {
            return Ok(Identification {
                character: best_name.to_string(),
                score: best_score,
                margin,
                via_fallback: false,
            });
        }

        let runner_up = ranked[1].1.to_string();
        log::debug!(
            "{side} ranking ambiguous ({best_name} vs {runner_up}, margin {margin:.4}); \
             trying masked-RGB fallback",
        );
        self.fallback(side, pose, frame, best_name, &runner_up, margin)
    }

    /// Secondary comparison: raw masked-RGB distance against the character
    /// art, still gated by the absolute distance threshold.
    fn fallback(
        &self,
        side: Side,
        pose: Pose,
        frame: &RgbImage,
        best: &str,
        runner_up: &str,
        margin: f64,
    ) -> Result<Identification, IdentifyFailure> {
        let references = self
            .library
            .characters()
            .signatures(side, pose, MetricKind::MaskedRgb);

        let winner = references
            .iter()
            .map(|reference| {
                (
                    compare(&reference.signature, frame),
                    reference.character.as_str(),
                )
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match winner {
            Some((score, character))
                if MetricKind::MaskedRgb.beats(score, self.config.rgb_distance) =>
            {
                Ok(Identification {
                    character: character.to_string(),
                    score,
                    margin,
                    via_fallback: true,
                })
            }
            _ => Err(IdentifyFailure::AmbiguousUnresolved {
                side,
                best: best.to_string(),
                runner_up: runner_up.to_string(),
                margin,
            }),
        }
    }
}
