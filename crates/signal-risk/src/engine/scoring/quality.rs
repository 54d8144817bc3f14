use serde::{Deserialize, Serialize};

use super::super::signal::{Signal, SourceCategory, SourceId};
use super::ScoringTable;

/// Which collaborator families supplied real data for a computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceHealth {
    pub real_time_used: bool,
    pub historical_used: bool,
    pub clinical_used: bool,
    pub completeness: f64,
}

/// Data-quality summary handed to the recommendation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub confidence: f64,
    pub completeness: f64,
}

impl DataQuality {
    pub fn is_complete(&self) -> bool {
        self.completeness >= 100.0
    }
}

/// Weight used for quality accounting; negative or non-finite weights count as zero.
pub(crate) fn effective_weight(signal: &Signal) -> f64 {
    if signal.weight.is_finite() {
        signal.weight.max(0.0)
    } else {
        0.0
    }
}

/// `1 - fallback_weight / total_weight`, clamped to `[0, 1]`; zero when no weight is present.
pub fn confidence(signals: &[Signal]) -> f64 {
    let (total, fallback) = signals.iter().fold((0.0, 0.0), |(total, fallback), signal| {
        let weight = effective_weight(signal);
        if signal.is_fallback {
            (total + weight, fallback + weight)
        } else {
            (total + weight, fallback)
        }
    });

    if total <= 0.0 {
        return 0.0;
    }
    (1.0 - fallback / total).clamp(0.0, 1.0)
}

/// Share of checklist fields carrying real, non-empty data, on a 0-100 scale.
///
/// An empty checklist is treated as fully complete.
pub fn completeness(checklist: &[SourceId], signals: &[Signal]) -> f64 {
    if checklist.is_empty() {
        return 100.0;
    }

    let populated = checklist
        .iter()
        .filter(|required| {
            signals.iter().any(|signal| {
                &signal.source_id == *required && !signal.is_fallback && signal.value.has_content()
            })
        })
        .count();

    populated as f64 / checklist.len() as f64 * 100.0
}

pub fn source_health(table: &ScoringTable, signals: &[Signal], completeness: f64) -> SourceHealth {
    let used = |category: SourceCategory| {
        signals.iter().any(|signal| {
            !signal.is_fallback
                && table
                    .entry(&signal.source_id)
                    .map(|entry| entry.category == category)
                    .unwrap_or(false)
        })
    };

    SourceHealth {
        real_time_used: used(SourceCategory::RealTime),
        historical_used: used(SourceCategory::Historical),
        clinical_used: used(SourceCategory::Clinical),
        completeness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::signal::SignalValue;
    use chrono::Utc;

    fn signal(source: &str, value: SignalValue, weight: f64, is_fallback: bool) -> Signal {
        Signal {
            source_id: SourceId::new(source),
            value,
            unit: None,
            weight,
            is_fallback,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn confidence_tracks_fallback_weight_share() {
        let signals = vec![
            signal("a", SignalValue::Number(1.0), 3.0, false),
            signal("b", SignalValue::Number(1.0), 1.0, true),
        ];
        assert!((confidence(&signals) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_zero_when_everything_is_fallback() {
        let signals = vec![
            signal("a", SignalValue::Number(1.0), 1.0, true),
            signal("b", SignalValue::Flag(false), 2.0, true),
        ];
        assert_eq!(confidence(&signals), 0.0);
        assert_eq!(confidence(&[]), 0.0);
    }

    #[test]
    fn completeness_ignores_fallbacks_and_blank_labels() {
        let checklist = vec![
            SourceId::new("age"),
            SourceId::new("gender"),
            SourceId::new("steps"),
            SourceId::new("sleep_hours"),
        ];
        let signals = vec![
            signal("age", SignalValue::Number(70.0), 1.0, false),
            signal("gender", SignalValue::Label("  ".to_string()), 1.0, false),
            signal("steps", SignalValue::Number(8_239.0), 1.0, true),
        ];
        assert_eq!(completeness(&checklist, &signals), 25.0);
        assert_eq!(completeness(&[], &signals), 100.0);
    }

    #[test]
    fn empty_lists_do_not_count_as_complete() {
        let checklist = vec![SourceId::new("venues"), SourceId::new("events")];
        let signals = vec![
            signal("venues", SignalValue::Venues(Vec::new()), 1.0, false),
            signal("events", SignalValue::Events(Vec::new()), 1.0, false),
        ];
        assert_eq!(completeness(&checklist, &signals), 0.0);
        assert_eq!(confidence(&signals), 1.0);
    }
}
