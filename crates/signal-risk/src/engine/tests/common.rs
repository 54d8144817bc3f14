use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::engine::alerts::AlertPolicy;
use crate::engine::classifier::{OverrideRule, Tier, TierBand, TierBands};
use crate::engine::fallback::FallbackPolicy;
use crate::engine::profile::DomainProfile;
use crate::engine::recommend::{Condition, FactorRule, RecommendationPlan};
use crate::engine::scoring::{Band, ScoringEntry, ScoringTable, TransferFunction};
use crate::engine::signal::{Signal, SignalValue, SourceCategory, SourceId, ValueKind};
use crate::engine::source::{AcquireError, SignalProvider};

pub(super) const URGENT_CRITICAL: &str = "Seek immediate attention";
pub(super) const CLOSING: &str = "Continue monitoring";
pub(super) const CLOSING_INCOMPLETE: &str = "Continue monitoring and data collection";

pub(super) fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
}

pub(super) fn table() -> ScoringTable {
    ScoringTable::new()
        .with(
            ScoringEntry::new(
                "age",
                ValueKind::Number,
                TransferFunction::Banded {
                    bands: vec![
                        Band {
                            above: 65.0,
                            partial: 25.0,
                        },
                        Band {
                            above: 45.0,
                            partial: 15.0,
                        },
                    ],
                    otherwise: 5.0,
                },
            )
            .unit("years"),
        )
        .with(
            ScoringEntry::new(
                "pulse",
                ValueKind::Number,
                TransferFunction::OutsideRange {
                    low: 50.0,
                    low_partial: 8.0,
                    high: 100.0,
                    high_partial: 10.0,
                },
            )
            .unit("bpm"),
        )
        .with(ScoringEntry::new(
            "alarm",
            ValueKind::Flag,
            TransferFunction::Flag { partial: 25.0 },
        ))
        .with(
            ScoringEntry::new(
                "steps",
                ValueKind::Number,
                TransferFunction::Below {
                    threshold: 5_000.0,
                    partial: 12.0,
                },
            )
            .category(SourceCategory::RealTime),
        )
        .with(
            ScoringEntry::new(
                "history",
                ValueKind::Label,
                TransferFunction::LabelMatch {
                    label: "stroke".to_string(),
                    partial: 12.0,
                },
            )
            .category(SourceCategory::Historical),
        )
}

pub(super) fn fallbacks() -> FallbackPolicy {
    FallbackPolicy::new()
        .with("age", SignalValue::Number(0.0))
        .with("pulse", SignalValue::Number(72.0))
        .with("alarm", SignalValue::Flag(false))
        .with("steps", SignalValue::Number(8_239.0))
        .with("history", SignalValue::Label("none".to_string()))
}

pub(super) fn profile() -> DomainProfile {
    DomainProfile {
        name: "demo".to_string(),
        table: table(),
        fallbacks: fallbacks(),
        bands: TierBands::new(vec![
            TierBand {
                tier: Tier::Moderate,
                min_score: 30.0,
            },
            TierBand {
                tier: Tier::High,
                min_score: 60.0,
            },
            TierBand {
                tier: Tier::Critical,
                min_score: 80.0,
            },
        ])
        .expect("valid bands"),
        overrides: vec![OverrideRule {
            name: "alarm_raised".to_string(),
            triggers: vec![SourceId::new("alarm")],
            minimum: Tier::High,
            advise_as: Tier::Critical,
        }],
        factor_rules: vec![
            FactorRule::new("steps", Condition::Below(8_000.0), "Low physical activity")
                .advising("Increase daily activity"),
            FactorRule::new("history", Condition::Equals("stroke".to_string()), "Family history"),
        ],
        plan: RecommendationPlan::new(CLOSING, CLOSING_INCOMPLETE)
            .urgent(Tier::Critical, &[URGENT_CRITICAL, "Call emergency services"])
            .urgent(Tier::High, &["Schedule urgent consultation"]),
        checklist: vec![
            SourceId::new("age"),
            SourceId::new("pulse"),
            SourceId::new("steps"),
            SourceId::new("history"),
        ],
        alert_policy: AlertPolicy::new(Tier::High, "Elevated risk detected"),
    }
}

pub(super) fn signal(source: &str, value: SignalValue, is_fallback: bool) -> Signal {
    Signal {
        source_id: SourceId::new(source),
        value,
        unit: None,
        weight: 1.0,
        is_fallback,
        captured_at: at(),
    }
}

/// Full real signal set; callers override individual readings.
pub(super) fn real_signals(overrides: &[(&str, SignalValue)]) -> Vec<Signal> {
    let mut values: Vec<(&str, SignalValue)> = vec![
        ("age", SignalValue::Number(40.0)),
        ("pulse", SignalValue::Number(72.0)),
        ("alarm", SignalValue::Flag(false)),
        ("steps", SignalValue::Number(9_000.0)),
        ("history", SignalValue::Label("none".to_string())),
    ];
    for (source, value) in overrides {
        if let Some(slot) = values.iter_mut().find(|(name, _)| name == source) {
            slot.1 = value.clone();
        }
    }
    values
        .into_iter()
        .map(|(source, value)| signal(source, value, false))
        .collect()
}

#[derive(Debug, Clone)]
pub(super) enum Scripted {
    Value(SignalValue),
    Delayed(Duration, SignalValue),
    Fail(AcquireError),
}

/// Provider answering from a fixed script and counting fetches.
#[derive(Debug, Default)]
pub(super) struct ScriptedProvider {
    script: HashMap<SourceId, Scripted>,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with(mut self, source: &str, scripted: Scripted) -> Self {
        self.script.insert(SourceId::new(source), scripted);
        self
    }

    pub(super) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalProvider for ScriptedProvider {
    async fn fetch(&self, source: &SourceId) -> Result<SignalValue, AcquireError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.script.get(source).cloned() {
            Some(Scripted::Value(value)) => Ok(value),
            Some(Scripted::Delayed(delay, value)) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(AcquireError::Absent),
        }
    }
}
