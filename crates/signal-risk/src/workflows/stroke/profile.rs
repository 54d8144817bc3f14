//! Stroke-risk instantiation of the scoring engine.
//!
//! Thresholds and partials are demonstration values, kept configurable here
//! rather than treated as clinically validated constants.

use crate::engine::{
    AlertPolicy, Band, Condition, DomainProfile, FactorRule, FallbackPolicy, OverrideRule,
    ProfileError, RecommendationPlan, ScoringEntry, ScoringTable, SignalValue, SourceCategory,
    SourceId, Tier, TierBand, TierBands, TransferFunction, ValueKind,
};

pub const DOMAIN: &str = "stroke";

pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const ETHNICITY: &str = "ethnicity";
pub const HYPERTENSION: &str = "hypertension";
pub const DIABETES: &str = "diabetes";
pub const HEART_DISEASE: &str = "heart_disease";
pub const STROKE_HISTORY: &str = "stroke_history";
pub const SMOKING_STATUS: &str = "smoking_status";
pub const SYSTOLIC_BP: &str = "systolic_bp";
pub const DIASTOLIC_BP: &str = "diastolic_bp";
pub const HEART_RATE: &str = "heart_rate";
pub const OXYGEN_SATURATION: &str = "oxygen_saturation";
pub const CHOLESTEROL: &str = "cholesterol";
pub const GLUCOSE: &str = "glucose";
pub const STEPS: &str = "steps";
pub const SLEEP_HOURS: &str = "sleep_hours";
pub const ACTIVE_MINUTES: &str = "active_minutes";
pub const TRACKED_HEART_RATE: &str = "tracked_heart_rate";
pub const FACIAL_DROOP: &str = "facial_droop";
pub const ARM_WEAKNESS: &str = "arm_weakness";
pub const SPEECH_DIFFICULTY: &str = "speech_difficulty";
pub const SYMPTOM_SEVERITY: &str = "symptom_severity";
pub const BMI: &str = "bmi";
pub const FAMILY_HISTORY: &str = "family_history";

pub const EMERGENCY_ACTIONS: [&str; 2] = [
    "EMERGENCY: Seek immediate medical attention",
    "Call 911 or go to the nearest emergency room",
];
pub const HIGH_ACTIONS: [&str; 2] = [
    "Schedule urgent consultation with a neurologist",
    "Monitor symptoms closely",
];
pub const MODERATE_ACTIONS: [&str; 2] = [
    "Schedule routine follow-up with primary care physician",
    "Implement lifestyle modifications",
];
pub const CLOSING: &str = "Continue health monitoring";
pub const CLOSING_INCOMPLETE: &str = "Continue health monitoring and data collection";

fn flag(source: &str, partial: f64) -> ScoringEntry {
    ScoringEntry::new(source, ValueKind::Flag, TransferFunction::Flag { partial })
}

fn informational(source: &str, kind: ValueKind) -> ScoringEntry {
    ScoringEntry::new(source, kind, TransferFunction::Informational)
}

pub fn scoring_table() -> ScoringTable {
    ScoringTable::new()
        .with(
            ScoringEntry::new(
                AGE,
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
        .with(informational(GENDER, ValueKind::Label))
        .with(informational(ETHNICITY, ValueKind::Label))
        .with(flag(HYPERTENSION, 15.0))
        .with(flag(DIABETES, 10.0))
        .with(flag(HEART_DISEASE, 20.0))
        .with(flag(STROKE_HISTORY, 30.0))
        .with(ScoringEntry::new(
            SMOKING_STATUS,
            ValueKind::Label,
            TransferFunction::LabelMatch {
                label: "current".to_string(),
                partial: 10.0,
            },
        ))
        .with(
            ScoringEntry::new(
                SYSTOLIC_BP,
                ValueKind::Number,
                TransferFunction::Above {
                    threshold: 140.0,
                    partial: 15.0,
                },
            )
            .unit("mmHg"),
        )
        .with(
            ScoringEntry::new(
                DIASTOLIC_BP,
                ValueKind::Number,
                TransferFunction::Above {
                    threshold: 90.0,
                    partial: 10.0,
                },
            )
            .unit("mmHg"),
        )
        .with(
            ScoringEntry::new(
                HEART_RATE,
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
        .with(informational(OXYGEN_SATURATION, ValueKind::Number).unit("%"))
        .with(informational(CHOLESTEROL, ValueKind::Number).unit("mg/dL"))
        .with(informational(GLUCOSE, ValueKind::Number).unit("mg/dL"))
        .with(
            ScoringEntry::new(
                STEPS,
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
                SLEEP_HOURS,
                ValueKind::Number,
                TransferFunction::Below {
                    threshold: 6.0,
                    partial: 10.0,
                },
            )
            .category(SourceCategory::RealTime)
            .unit("h"),
        )
        .with(
            ScoringEntry::new(
                ACTIVE_MINUTES,
                ValueKind::Number,
                TransferFunction::Below {
                    threshold: 30.0,
                    partial: 8.0,
                },
            )
            .category(SourceCategory::RealTime)
            .unit("min"),
        )
        .with(
            informational(TRACKED_HEART_RATE, ValueKind::Number)
                .category(SourceCategory::RealTime)
                .unit("bpm"),
        )
        .with(flag(FACIAL_DROOP, 25.0))
        .with(flag(ARM_WEAKNESS, 25.0))
        .with(flag(SPEECH_DIFFICULTY, 25.0))
        .with(ScoringEntry::new(
            SYMPTOM_SEVERITY,
            ValueKind::Number,
            TransferFunction::Linear {
                per_unit: 3.0,
                cap: 30.0,
            },
        ))
        .with(
            ScoringEntry::new(
                BMI,
                ValueKind::Number,
                TransferFunction::Above {
                    threshold: 30.0,
                    partial: 8.0,
                },
            )
            .category(SourceCategory::Historical),
        )
        .with(
            ScoringEntry::new(
                FAMILY_HISTORY,
                ValueKind::Label,
                TransferFunction::LabelMatch {
                    label: "stroke".to_string(),
                    partial: 12.0,
                },
            )
            .category(SourceCategory::Historical),
        )
}

pub fn fallbacks() -> FallbackPolicy {
    let unspecified = || SignalValue::Label("unspecified".to_string());
    FallbackPolicy::new()
        .with(AGE, SignalValue::Number(0.0))
        .with(GENDER, unspecified())
        .with(ETHNICITY, unspecified())
        .with(HYPERTENSION, SignalValue::Flag(false))
        .with(DIABETES, SignalValue::Flag(false))
        .with(HEART_DISEASE, SignalValue::Flag(false))
        .with(STROKE_HISTORY, SignalValue::Flag(false))
        .with(SMOKING_STATUS, SignalValue::Label("never".to_string()))
        .with(SYSTOLIC_BP, SignalValue::Number(120.0))
        .with(DIASTOLIC_BP, SignalValue::Number(80.0))
        .with(HEART_RATE, SignalValue::Number(72.0))
        .with(OXYGEN_SATURATION, SignalValue::Number(98.0))
        .with(CHOLESTEROL, SignalValue::Number(180.0))
        .with(GLUCOSE, SignalValue::Number(95.0))
        .with(STEPS, SignalValue::Number(8_239.0))
        .with(SLEEP_HOURS, SignalValue::Number(7.54))
        .with(ACTIVE_MINUTES, SignalValue::Number(74.0))
        .with(TRACKED_HEART_RATE, SignalValue::Number(72.0))
        .with(FACIAL_DROOP, SignalValue::Flag(false))
        .with(ARM_WEAKNESS, SignalValue::Flag(false))
        .with(SPEECH_DIFFICULTY, SignalValue::Flag(false))
        .with(SYMPTOM_SEVERITY, SignalValue::Number(1.0))
        .with(BMI, SignalValue::Number(22.0))
        .with(FAMILY_HISTORY, SignalValue::Label("none".to_string()))
}

pub fn factor_rules() -> Vec<FactorRule> {
    vec![
        FactorRule::new(
            STEPS,
            Condition::Below(8_000.0),
            "Low physical activity (< 8000 steps/day)",
        )
        .advising("Increase daily activity to 10,000+ steps"),
        FactorRule::new(SLEEP_HOURS, Condition::Below(7.0), "Insufficient sleep (< 7 hours)")
            .advising("Improve sleep quality - aim for 7-9 hours nightly"),
        FactorRule::new(
            ACTIVE_MINUTES,
            Condition::Below(60.0),
            "Limited exercise (< 60 active minutes)",
        )
        .advising("Add structured exercise to daily routine"),
        FactorRule::new(HYPERTENSION, Condition::IsTrue, "Hypertension"),
        FactorRule::new(DIABETES, Condition::IsTrue, "Diabetes"),
        FactorRule::new(BMI, Condition::Above(30.0), "Obesity (BMI > 30)"),
    ]
}

pub fn checklist() -> Vec<SourceId> {
    [
        AGE,
        GENDER,
        ETHNICITY,
        SYSTOLIC_BP,
        DIASTOLIC_BP,
        HEART_RATE,
        OXYGEN_SATURATION,
        STEPS,
        SLEEP_HOURS,
        ACTIVE_MINUTES,
        TRACKED_HEART_RATE,
    ]
    .into_iter()
    .map(SourceId::new)
    .collect()
}

pub fn domain_profile() -> Result<DomainProfile, ProfileError> {
    let bands = TierBands::new(vec![
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
    ])?;

    Ok(DomainProfile {
        name: DOMAIN.to_string(),
        table: scoring_table(),
        fallbacks: fallbacks(),
        bands,
        overrides: vec![OverrideRule {
            name: "critical_symptoms".to_string(),
            triggers: [FACIAL_DROOP, ARM_WEAKNESS, SPEECH_DIFFICULTY]
                .into_iter()
                .map(SourceId::new)
                .collect(),
            minimum: Tier::High,
            advise_as: Tier::Critical,
        }],
        factor_rules: factor_rules(),
        plan: RecommendationPlan::new(CLOSING, CLOSING_INCOMPLETE)
            .urgent(Tier::Critical, &EMERGENCY_ACTIONS)
            .urgent(Tier::High, &HIGH_ACTIONS)
            .urgent(Tier::Moderate, &MODERATE_ACTIONS),
        checklist: checklist(),
        alert_policy: AlertPolicy::new(Tier::High, "High stroke risk detected"),
    })
}
