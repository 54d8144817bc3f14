use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classifier::Tier;
use super::scoring::DataQuality;
use super::signal::{Signal, SourceId};

/// Threshold test applied to one signal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Below(f64),
    Above(f64),
    IsTrue,
    /// Case-insensitive label equality.
    Equals(String),
}

impl Condition {
    fn holds(&self, signal: &Signal) -> bool {
        match self {
            Condition::Below(threshold) => signal
                .value
                .as_number()
                .map(|value| value < *threshold)
                .unwrap_or(false),
            Condition::Above(threshold) => signal
                .value
                .as_number()
                .map(|value| value > *threshold)
                .unwrap_or(false),
            Condition::IsTrue => signal.value.as_flag().unwrap_or(false),
            Condition::Equals(expected) => signal
                .value
                .as_label()
                .map(|label| label.trim().eq_ignore_ascii_case(expected))
                .unwrap_or(false),
        }
    }
}

/// Names a contributing factor, and optionally the advice it triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRule {
    pub source: SourceId,
    pub condition: Condition,
    pub label: String,
    pub advice: Option<String>,
}

impl FactorRule {
    pub fn new(source: &str, condition: Condition, label: &str) -> Self {
        Self {
            source: SourceId::new(source),
            condition,
            label: label.to_string(),
            advice: None,
        }
    }

    pub fn advising(mut self, advice: &str) -> Self {
        self.advice = Some(advice.to_string());
        self
    }

    /// Only real readings describe the subject; substituted defaults never raise a factor.
    pub fn matches(&self, signal: &Signal) -> bool {
        signal.source_id == self.source && !signal.is_fallback && self.condition.holds(signal)
    }
}

/// Factor raised by a rule for one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub source: SourceId,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Evaluate every rule in order, yielding one factor per matching rule.
pub fn identify_factors(rules: &[FactorRule], signals: &[Signal]) -> Vec<RiskFactor> {
    rules
        .iter()
        .filter(|rule| signals.iter().any(|signal| rule.matches(signal)))
        .map(|rule| RiskFactor {
            source: rule.source.clone(),
            label: rule.label.clone(),
            advice: rule.advice.clone(),
        })
        .collect()
}

/// Static wording for one domain's recommendation list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecommendationPlan {
    pub urgent: BTreeMap<Tier, Vec<String>>,
    pub closing: String,
    pub closing_when_incomplete: String,
}

impl RecommendationPlan {
    pub fn new(closing: &str, closing_when_incomplete: &str) -> Self {
        Self {
            urgent: BTreeMap::new(),
            closing: closing.to_string(),
            closing_when_incomplete: closing_when_incomplete.to_string(),
        }
    }

    pub fn urgent(mut self, tier: Tier, actions: &[&str]) -> Self {
        self.urgent
            .insert(tier, actions.iter().map(|action| action.to_string()).collect());
        self
    }
}

/// Orders urgent actions, factor advice, then a closing monitoring entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationGenerator {
    plan: RecommendationPlan,
}

impl RecommendationGenerator {
    pub fn new(plan: RecommendationPlan) -> Self {
        Self { plan }
    }

    pub fn recommend(
        &self,
        tier: Tier,
        factors: &[RiskFactor],
        quality: &DataQuality,
    ) -> Vec<String> {
        let mut recommendations: Vec<String> = self
            .plan
            .urgent
            .get(&tier)
            .cloned()
            .unwrap_or_default();

        for advice in factors.iter().filter_map(|factor| factor.advice.as_ref()) {
            if !recommendations.contains(advice) {
                recommendations.push(advice.clone());
            }
        }

        let closing = if quality.is_complete() {
            &self.plan.closing
        } else {
            &self.plan.closing_when_incomplete
        };
        if !closing.is_empty() {
            recommendations.push(closing.clone());
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::signal::SignalValue;
    use chrono::Utc;

    fn signal(source: &str, value: SignalValue, is_fallback: bool) -> Signal {
        Signal {
            source_id: SourceId::new(source),
            value,
            unit: None,
            weight: 1.0,
            is_fallback,
            captured_at: Utc::now(),
        }
    }

    fn generator() -> RecommendationGenerator {
        RecommendationGenerator::new(
            RecommendationPlan::new("Continue monitoring", "Continue monitoring and data collection")
                .urgent(Tier::Critical, &["Seek immediate attention", "Call emergency services"])
                .urgent(Tier::High, &["Schedule urgent consultation"]),
        )
    }

    fn quality(completeness: f64) -> DataQuality {
        DataQuality {
            confidence: 1.0,
            completeness,
        }
    }

    #[test]
    fn urgent_actions_precede_advice_and_closing() {
        let factors = vec![RiskFactor {
            source: SourceId::new("steps"),
            label: "Low physical activity".to_string(),
            advice: Some("Increase daily activity".to_string()),
        }];
        let list = generator().recommend(Tier::Critical, &factors, &quality(100.0));
        assert_eq!(
            list,
            vec![
                "Seek immediate attention".to_string(),
                "Call emergency services".to_string(),
                "Increase daily activity".to_string(),
                "Continue monitoring".to_string(),
            ]
        );
    }

    #[test]
    fn closing_reflects_incomplete_data() {
        let list = generator().recommend(Tier::Low, &[], &quality(45.0));
        assert_eq!(list, vec!["Continue monitoring and data collection".to_string()]);
    }

    #[test]
    fn factor_rules_skip_fallback_readings() {
        let rules = vec![
            FactorRule::new("steps", Condition::Below(8_000.0), "Low activity")
                .advising("Increase daily activity"),
            FactorRule::new("hypertension", Condition::IsTrue, "Hypertension"),
            FactorRule::new("family_history", Condition::Equals("stroke".to_string()), "Family history"),
        ];
        let signals = vec![
            signal("steps", SignalValue::Number(3_000.0), true),
            signal("hypertension", SignalValue::Flag(true), false),
            signal("family_history", SignalValue::Label(" Stroke ".to_string()), false),
        ];

        let labels: Vec<String> = identify_factors(&rules, &signals)
            .into_iter()
            .map(|factor| factor.label)
            .collect();
        assert_eq!(labels, vec!["Hypertension".to_string(), "Family history".to_string()]);
    }
}
