use chrono::{DateTime, Utc};

use super::alerts::AlertPolicy;
use super::classifier::{OverrideRule, TierBandError, TierBands};
use super::fallback::FallbackPolicy;
use super::recommend::{FactorRule, RecommendationPlan};
use super::scoring::ScoringTable;
use super::signal::{SourceId, ValueKind};

/// Complete, declarative instantiation of the engine for one domain.
#[derive(Debug, Clone)]
pub struct DomainProfile {
    pub name: String,
    pub table: ScoringTable,
    pub fallbacks: FallbackPolicy,
    pub bands: TierBands,
    pub overrides: Vec<OverrideRule>,
    pub factor_rules: Vec<FactorRule>,
    pub plan: RecommendationPlan,
    pub checklist: Vec<SourceId>,
    pub alert_policy: AlertPolicy,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("source `{0}` is listed more than once")]
    DuplicateSource(SourceId),
    #[error("source `{0}` has no registered fallback")]
    MissingFallback(SourceId),
    #[error("fallback for `{entry}` is {found:?}, expected {expected:?}")]
    FallbackKind {
        entry: SourceId,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("weight for `{0}` must be finite and non-negative")]
    InvalidWeight(SourceId),
    #[error("`{0}` is referenced by a rule or checklist but missing from the table")]
    UnknownSource(SourceId),
    #[error(transparent)]
    Bands(#[from] TierBandError),
}

impl DomainProfile {
    /// Check the table, fallbacks and rule references against each other.
    ///
    /// Fallback kinds are checked by materializing each default at `at`.
    pub fn validate(&self, at: DateTime<Utc>) -> Result<(), ProfileError> {
        let entries = self.table.entries();
        for (index, entry) in entries.iter().enumerate() {
            if entries[..index]
                .iter()
                .any(|earlier| earlier.source == entry.source)
            {
                return Err(ProfileError::DuplicateSource(entry.source.clone()));
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(ProfileError::InvalidWeight(entry.source.clone()));
            }

            let fallback = self
                .fallbacks
                .default_for(&entry.source, at)
                .ok_or_else(|| ProfileError::MissingFallback(entry.source.clone()))?;
            if fallback.kind() != entry.expects {
                return Err(ProfileError::FallbackKind {
                    entry: entry.source.clone(),
                    expected: entry.expects,
                    found: fallback.kind(),
                });
            }
        }

        let referenced = self
            .checklist
            .iter()
            .chain(self.factor_rules.iter().map(|rule| &rule.source))
            .chain(self.overrides.iter().flat_map(|rule| rule.triggers.iter()));
        for source in referenced {
            if !self.table.contains(source) {
                return Err(ProfileError::UnknownSource(source.clone()));
            }
        }

        Ok(())
    }
}
