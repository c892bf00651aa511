//! Confidence scoring
//!
//! Each provider tier owns a score band. Profile richness moves a score up
//! inside its band, validator advisories move it down; neither can leave the
//! band. With ordered, non-overlapping bands a higher tier therefore never
//! scores below a lower one for the same profile.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sheetsmith_model::ProfileMetrics;
use sheetsmith_providers::ProviderTier;

/// Closed score interval for one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    /// Lowest score in the tier
    pub floor: f64,
    /// Highest score in the tier
    pub ceiling: f64,
}

impl TierBand {
    /// Create band
    #[inline]
    #[must_use]
    pub const fn new(floor: f64, ceiling: f64) -> Self {
        Self { floor, ceiling }
    }

    /// Width of the band
    #[inline]
    #[must_use]
    pub fn span(&self) -> f64 {
        self.ceiling - self.floor
    }

    fn is_well_formed(&self) -> bool {
        self.floor.is_finite()
            && self.ceiling.is_finite()
            && 0.0 <= self.floor
            && self.floor <= self.ceiling
            && self.ceiling <= 1.0
    }
}

/// Scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Remote-model tier band
    pub remote: TierBand,
    /// Template tier band
    pub template: TierBand,
    /// Terminal-fallback tier band
    pub fallback: TierBand,
    /// Position in the band before richness and advisories
    pub base: f64,
    /// Maximum richness bonus
    pub richness_bonus: f64,
    /// Maximum advisory penalty
    pub advisory_penalty: f64,
    /// Penalty fraction per advisory
    pub per_advisory: f64,
    /// Sheet count at which the sheet term saturates
    pub sheet_saturation: usize,
    /// Formula count at which the formula term saturates
    pub formula_saturation: usize,
    /// Weight of the sheet term in richness
    pub sheet_weight: f64,
    /// Weight of the formula term in richness
    pub formula_weight: f64,
    /// Weight of domain confidence in richness
    pub domain_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            remote: TierBand::new(0.70, 1.0),
            template: TierBand::new(0.40, 0.69),
            fallback: TierBand::new(0.10, 0.39),
            base: 0.5,
            richness_bonus: 0.5,
            advisory_penalty: 0.3,
            per_advisory: 0.25,
            sheet_saturation: 5,
            formula_saturation: 50,
            sheet_weight: 1.0,
            formula_weight: 1.0,
            domain_weight: 1.0,
        }
    }
}

impl ScoringWeights {
    /// Band for a tier
    #[must_use]
    pub fn band(&self, tier: ProviderTier) -> TierBand {
        match tier {
            ProviderTier::Remote => self.remote,
            ProviderTier::Template => self.template,
            ProviderTier::TerminalFallback => self.fallback,
        }
    }

    /// Check bands and weights
    ///
    /// # Errors
    /// `InvalidScoring` naming the first offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::InvalidScoring(msg.to_string()));

        for (name, band) in [
            ("remote", self.remote),
            ("template", self.template),
            ("fallback", self.fallback),
        ] {
            if !band.is_well_formed() {
                return Err(ConfigError::InvalidScoring(format!(
                    "{name} band must satisfy 0 <= floor <= ceiling <= 1"
                )));
            }
        }
        if self.fallback.ceiling >= self.template.floor || self.template.ceiling >= self.remote.floor {
            return invalid("tier bands must be ordered and non-overlapping");
        }
        let weights = [
            self.base,
            self.richness_bonus,
            self.advisory_penalty,
            self.per_advisory,
            self.sheet_weight,
            self.formula_weight,
            self.domain_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("weights must be finite and non-negative");
        }
        if self.sheet_weight + self.formula_weight + self.domain_weight <= 0.0 {
            return invalid("at least one richness weight must be positive");
        }
        if self.sheet_saturation == 0 || self.formula_saturation == 0 {
            return invalid("saturation points must be greater than zero");
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn saturate(count: usize, at: usize) -> f64 {
    (count as f64 / at.max(1) as f64).min(1.0)
}

/// Pure scoring function over a fixed policy
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    /// Create scorer
    #[inline]
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Policy in use
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Profile richness in [0, 1]
    #[must_use]
    pub fn richness(&self, metrics: &ProfileMetrics) -> f64 {
        let w = &self.weights;
        let total = w.sheet_weight + w.formula_weight + w.domain_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let domain = if metrics.domain_confidence.is_finite() {
            metrics.domain_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let weighted = w.sheet_weight * saturate(metrics.sheet_count, w.sheet_saturation)
            + w.formula_weight * saturate(metrics.formula_count, w.formula_saturation)
            + w.domain_weight * domain;
        (weighted / total).clamp(0.0, 1.0)
    }

    /// Score an accepted result
    #[must_use]
    pub fn score(&self, metrics: &ProfileMetrics, tier: ProviderTier, advisories: usize) -> f64 {
        let w = &self.weights;
        let band = w.band(tier);

        #[allow(clippy::cast_precision_loss)]
        let penalty = w.advisory_penalty * (advisories as f64 * w.per_advisory).min(1.0);
        let position = (w.base + w.richness_bonus * self.richness(metrics) - penalty).clamp(0.0, 1.0);

        (band.floor + band.span() * position).clamp(band.floor, band.ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsmith_model::ProfileMetrics;

    fn metrics(sheets: usize, formulas: usize, domain: f64) -> ProfileMetrics {
        ProfileMetrics {
            sheet_count: sheets,
            column_count: sheets * 4,
            formula_count: formulas,
            named_sheet_ratio: 1.0,
            domain_confidence: domain,
        }
    }

    #[test]
    fn default_policy_is_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn overlapping_bands_are_rejected() {
        let weights = ScoringWeights {
            template: TierBand::new(0.3, 0.75),
            ..ScoringWeights::default()
        };
        assert!(matches!(weights.validate(), Err(ConfigError::InvalidScoring(_))));
    }

    #[test]
    fn richness_raises_score_within_band() {
        let scorer = ConfidenceScorer::default();
        let sparse = scorer.score(&metrics(0, 0, 0.0), ProviderTier::Template, 0);
        let rich = scorer.score(&metrics(6, 80, 0.9), ProviderTier::Template, 0);

        assert!(rich > sparse);
        assert!(rich <= 0.69 && sparse >= 0.40);
    }

    #[test]
    fn advisories_lower_score_within_band() {
        let scorer = ConfidenceScorer::default();
        let m = metrics(3, 29, 0.8);
        let clean = scorer.score(&m, ProviderTier::Remote, 0);
        let noisy = scorer.score(&m, ProviderTier::Remote, 12);

        assert!(noisy < clean);
        assert!(noisy >= 0.70);
    }

    #[test]
    fn nan_domain_confidence_counts_as_zero() {
        let scorer = ConfidenceScorer::default();
        let a = scorer.score(&metrics(1, 1, f64::NAN), ProviderTier::Template, 0);
        let b = scorer.score(&metrics(1, 1, 0.0), ProviderTier::Template, 0);
        assert!((a - b).abs() < f64::EPSILON);
    }
}
