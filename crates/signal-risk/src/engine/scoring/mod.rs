mod quality;
mod transfer;

pub use quality::{completeness, confidence, source_health, DataQuality, SourceHealth};
pub use transfer::{Band, TransferFunction, WeatherCrowdFactor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{ActiveOverride, Classifier, OverrideRule, Tier};
use super::recommend::{identify_factors, FactorRule, RiskFactor};
use super::signal::{Signal, SourceCategory, SourceId, SubjectId, ValueKind};
use quality::effective_weight;

/// One row of a domain table: how a source's reading becomes a partial score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringEntry {
    pub source: SourceId,
    pub expects: ValueKind,
    pub transfer: TransferFunction,
    pub weight: f64,
    pub category: SourceCategory,
    pub unit: Option<String>,
}

impl ScoringEntry {
    pub fn new(source: &str, expects: ValueKind, transfer: TransferFunction) -> Self {
        Self {
            source: SourceId::new(source),
            expects,
            transfer,
            weight: 1.0,
            category: SourceCategory::Clinical,
            unit: None,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn category(mut self, category: SourceCategory) -> Self {
        self.category = category;
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// Ordered per-domain table of `{source, transfer, weight}` rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringTable {
    entries: Vec<ScoringEntry>,
}

impl ScoringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: ScoringEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[ScoringEntry] {
        &self.entries
    }

    pub fn entry(&self, source: &SourceId) -> Option<&ScoringEntry> {
        self.entries.iter().find(|entry| &entry.source == source)
    }

    pub fn contains(&self, source: &SourceId) -> bool {
        self.entry(source).is_some()
    }
}

/// Per-signal contribution kept for audit trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub source: SourceId,
    pub partial: f64,
    pub weighted: f64,
    pub is_fallback: bool,
}

/// Immutable result of one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub subject_id: SubjectId,
    pub domain: String,
    pub score: f64,
    pub tier: Tier,
    pub confidence: f64,
    pub completeness: f64,
    pub contributing_factors: Vec<String>,
    pub components: Vec<ScoreComponent>,
    pub overrides: Vec<ActiveOverride>,
    pub source_health: SourceHealth,
    pub computed_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn data_quality(&self) -> DataQuality {
        DataQuality {
            confidence: self.confidence,
            completeness: self.completeness,
        }
    }

    /// Tier whose urgent actions apply, taking override advisories into account.
    pub fn urgency(&self) -> Tier {
        self.overrides
            .iter()
            .map(|active| active.advise_as)
            .fold(self.tier, Tier::max)
    }
}

/// Stateless aggregator applying a domain table to a signal set.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    domain: String,
    table: ScoringTable,
    checklist: Vec<SourceId>,
    classifier: Classifier,
    overrides: Vec<OverrideRule>,
    factor_rules: Vec<FactorRule>,
}

impl ScoringEngine {
    pub fn new(
        domain: impl Into<String>,
        table: ScoringTable,
        checklist: Vec<SourceId>,
        classifier: Classifier,
        overrides: Vec<OverrideRule>,
        factor_rules: Vec<FactorRule>,
    ) -> Self {
        Self {
            domain: domain.into(),
            table,
            checklist,
            classifier,
            overrides,
            factor_rules,
        }
    }

    pub fn table(&self) -> &ScoringTable {
        &self.table
    }

    pub fn risk_factors(&self, signals: &[Signal]) -> Vec<RiskFactor> {
        identify_factors(&self.factor_rules, signals)
    }

    /// Score `signals` as of `at`. The record is a pure function of both arguments.
    pub fn compute_score(
        &self,
        subject_id: &SubjectId,
        signals: &[Signal],
        at: DateTime<Utc>,
    ) -> ScoreRecord {
        let mut components = Vec::with_capacity(signals.len());
        let mut total = 0.0;

        for signal in signals {
            let Some(entry) = self.table.entry(&signal.source_id) else {
                continue;
            };
            let partial = entry.transfer.apply(&signal.value, at);
            let weighted = partial * effective_weight(signal);
            total += weighted;
            components.push(ScoreComponent {
                source: signal.source_id.clone(),
                partial,
                weighted,
                is_fallback: signal.is_fallback,
            });
        }

        let score = clamp_score(total);
        let confidence = confidence(signals);
        let completeness = completeness(&self.checklist, signals);

        let overrides: Vec<ActiveOverride> = self
            .overrides
            .iter()
            .filter(|rule| rule.is_triggered_by(signals))
            .map(OverrideRule::activate)
            .collect();
        let tier = self.classifier.classify(score, &overrides);

        let contributing_factors = self
            .risk_factors(signals)
            .into_iter()
            .map(|factor| factor.label)
            .collect();

        debug!(
            subject = %subject_id,
            domain = %self.domain,
            score,
            tier = %tier,
            confidence,
            "recomputed score"
        );

        ScoreRecord {
            subject_id: subject_id.clone(),
            domain: self.domain.clone(),
            score,
            tier,
            confidence,
            completeness,
            contributing_factors,
            components,
            overrides,
            source_health: source_health(&self.table, signals, completeness),
            computed_at: at,
        }
    }
}

fn clamp_score(total: f64) -> f64 {
    if total.is_nan() {
        return 0.0;
    }
    total.min(100.0).max(0.0)
}
