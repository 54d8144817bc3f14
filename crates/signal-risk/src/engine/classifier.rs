use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::{Signal, SourceId};

/// Ordered severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Moderate,
    High,
    Critical,
}

impl Tier {
    pub const fn ordered() -> [Self; 4] {
        [Self::Low, Self::Moderate, Self::High, Self::Critical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive lower bound of one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierBand {
    pub tier: Tier,
    pub min_score: f64,
}

/// Non-overlapping numeric tier boundaries; scores below every band are `Low`.
#[derive(Debug, Clone, PartialEq)]
pub struct TierBands {
    bands: Vec<TierBand>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TierBandError {
    #[error("tier band for {0} is not finite")]
    NotFinite(Tier),
    #[error("tier bands must increase with severity ({lower} at {lower_min}, {higher} at {higher_min})")]
    NotIncreasing {
        lower: Tier,
        lower_min: f64,
        higher: Tier,
        higher_min: f64,
    },
}

impl TierBands {
    pub fn new(mut bands: Vec<TierBand>) -> Result<Self, TierBandError> {
        if let Some(band) = bands.iter().find(|band| !band.min_score.is_finite()) {
            return Err(TierBandError::NotFinite(band.tier));
        }

        bands.sort_by_key(|band| band.tier);
        for pair in bands.windows(2) {
            if pair[0].tier == pair[1].tier || pair[0].min_score >= pair[1].min_score {
                return Err(TierBandError::NotIncreasing {
                    lower: pair[0].tier,
                    lower_min: pair[0].min_score,
                    higher: pair[1].tier,
                    higher_min: pair[1].min_score,
                });
            }
        }

        Ok(Self { bands })
    }

    pub fn tier_for(&self, score: f64) -> Tier {
        self.bands
            .iter()
            .rev()
            .find(|band| score >= band.min_score)
            .map(|band| band.tier)
            .unwrap_or(Tier::Low)
    }
}

/// Boolean condition that forces a minimum tier regardless of the numeric score.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub name: String,
    pub triggers: Vec<SourceId>,
    pub minimum: Tier,
    /// Tier whose urgent recommendations apply while the override is active.
    pub advise_as: Tier,
}

impl OverrideRule {
    pub fn is_triggered_by(&self, signals: &[Signal]) -> bool {
        signals.iter().any(|signal| {
            self.triggers.contains(&signal.source_id) && signal.value.as_flag() == Some(true)
        })
    }

    pub fn activate(&self) -> ActiveOverride {
        ActiveOverride {
            rule: self.name.clone(),
            minimum: self.minimum,
            advise_as: self.advise_as,
        }
    }
}

/// Override flag raised for one computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveOverride {
    pub rule: String,
    pub minimum: Tier,
    pub advise_as: Tier,
}

/// Stateless mapping from `(score, overrides)` to a tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    bands: TierBands,
}

impl Classifier {
    pub fn new(bands: TierBands) -> Self {
        Self { bands }
    }

    pub fn classify(&self, score: f64, overrides: &[ActiveOverride]) -> Tier {
        let numeric = self.bands.tier_for(score);
        overrides
            .iter()
            .map(|active| active.minimum)
            .fold(numeric, Tier::max)
    }
}
