use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const SMOKING_STATUSES: [&str; 3] = ["never", "former", "current"];

const AGE: RangeInclusive<f64> = 0.0..=120.0;
const SYSTOLIC: RangeInclusive<f64> = 50.0..=260.0;
const DIASTOLIC: RangeInclusive<f64> = 30.0..=180.0;
const HEART_RATE: RangeInclusive<f64> = 20.0..=250.0;
const TEMPERATURE: RangeInclusive<f64> = 30.0..=45.0;
const OXYGEN: RangeInclusive<f64> = 50.0..=100.0;
const CHOLESTEROL: RangeInclusive<f64> = 50.0..=600.0;
const GLUCOSE: RangeInclusive<f64> = 20.0..=800.0;
const SEVERITY: RangeInclusive<f64> = 1.0..=10.0;
const STEPS: RangeInclusive<f64> = 0.0..=200_000.0;
const SLEEP: RangeInclusive<f64> = 0.0..=24.0;
const ACTIVE_MINUTES: RangeInclusive<f64> = 0.0..=1_440.0;
const BMI: RangeInclusive<f64> = 10.0..=90.0;

/// Patient record assembled from manual entry, wearable tracking and bulk import.
///
/// Every field is optional; a missing field is an acquisition failure for its source.
/// The same shape doubles as a partial update where only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeProfile {
    pub demographics: Demographics,
    pub medical_history: MedicalHistory,
    pub vital_signs: VitalSigns,
    pub lab_results: LabResults,
    pub symptoms: Symptoms,
    pub tracking: HealthTracking,
    pub history: HistoricalRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Demographics {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalHistory {
    pub hypertension: Option<bool>,
    pub diabetes: Option<bool>,
    pub heart_disease: Option<bool>,
    pub stroke_history: Option<bool>,
    pub smoking_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSigns {
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabResults {
    pub cholesterol: Option<f64>,
    pub glucose: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symptoms {
    pub facial_droop: Option<bool>,
    pub arm_weakness: Option<bool>,
    pub speech_difficulty: Option<bool>,
    pub severity: Option<f64>,
}

/// Wearable readings accumulated over the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthTracking {
    pub steps: Option<f64>,
    pub heart_rate: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub active_minutes: Option<f64>,
}

/// Values backfilled from historical records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalRecord {
    pub bmi: Option<f64>,
    pub family_history: Option<String>,
}

/// One wearable sample; `step_delta` adds to the running step count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySample {
    pub step_delta: Option<u32>,
    pub heart_rate: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub active_minutes: Option<f64>,
}

/// A manually supplied value that failed validation; the previous value was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRejection {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl StrokeProfile {
    /// Apply every present field of `update`, rejecting invalid ones individually.
    pub fn merge(&mut self, update: &StrokeProfile) -> Vec<FieldRejection> {
        let mut rejected = Vec::new();
        let mut checker = Checker {
            rejected: &mut rejected,
        };

        let demographics = &update.demographics;
        checker.number("age", &mut self.demographics.age, demographics.age, AGE);
        checker.label("gender", &mut self.demographics.gender, &demographics.gender);
        checker.label(
            "ethnicity",
            &mut self.demographics.ethnicity,
            &demographics.ethnicity,
        );

        let history = &update.medical_history;
        flag(&mut self.medical_history.hypertension, history.hypertension);
        flag(&mut self.medical_history.diabetes, history.diabetes);
        flag(&mut self.medical_history.heart_disease, history.heart_disease);
        flag(&mut self.medical_history.stroke_history, history.stroke_history);
        checker.choice(
            "smoking_status",
            &mut self.medical_history.smoking_status,
            &history.smoking_status,
            &SMOKING_STATUSES,
        );

        let vitals = &update.vital_signs;
        checker.number(
            "systolic_bp",
            &mut self.vital_signs.systolic_bp,
            vitals.systolic_bp,
            SYSTOLIC,
        );
        checker.number(
            "diastolic_bp",
            &mut self.vital_signs.diastolic_bp,
            vitals.diastolic_bp,
            DIASTOLIC,
        );
        checker.number(
            "heart_rate",
            &mut self.vital_signs.heart_rate,
            vitals.heart_rate,
            HEART_RATE,
        );
        checker.number(
            "temperature",
            &mut self.vital_signs.temperature,
            vitals.temperature,
            TEMPERATURE,
        );
        checker.number(
            "oxygen_saturation",
            &mut self.vital_signs.oxygen_saturation,
            vitals.oxygen_saturation,
            OXYGEN,
        );

        checker.number(
            "cholesterol",
            &mut self.lab_results.cholesterol,
            update.lab_results.cholesterol,
            CHOLESTEROL,
        );
        checker.number(
            "glucose",
            &mut self.lab_results.glucose,
            update.lab_results.glucose,
            GLUCOSE,
        );

        let symptoms = &update.symptoms;
        flag(&mut self.symptoms.facial_droop, symptoms.facial_droop);
        flag(&mut self.symptoms.arm_weakness, symptoms.arm_weakness);
        flag(&mut self.symptoms.speech_difficulty, symptoms.speech_difficulty);
        checker.number(
            "symptom_severity",
            &mut self.symptoms.severity,
            symptoms.severity,
            SEVERITY,
        );

        let tracking = &update.tracking;
        checker.number("steps", &mut self.tracking.steps, tracking.steps, STEPS);
        checker.number(
            "tracked_heart_rate",
            &mut self.tracking.heart_rate,
            tracking.heart_rate,
            HEART_RATE,
        );
        checker.number(
            "sleep_hours",
            &mut self.tracking.sleep_hours,
            tracking.sleep_hours,
            SLEEP,
        );
        checker.number(
            "active_minutes",
            &mut self.tracking.active_minutes,
            tracking.active_minutes,
            ACTIVE_MINUTES,
        );

        checker.number("bmi", &mut self.history.bmi, update.history.bmi, BMI);
        checker.label(
            "family_history",
            &mut self.history.family_history,
            &update.history.family_history,
        );

        rejected
    }

    /// Add a wearable sample. The step counter is read-modify-write and must be
    /// called under the owner's lock.
    pub fn record_activity(&mut self, sample: &ActivitySample) -> Vec<FieldRejection> {
        let mut rejected = Vec::new();
        let mut checker = Checker {
            rejected: &mut rejected,
        };

        if let Some(delta) = sample.step_delta {
            let total = self.tracking.steps.unwrap_or(0.0) + f64::from(delta);
            checker.number("steps", &mut self.tracking.steps, Some(total), STEPS);
        }
        checker.number(
            "tracked_heart_rate",
            &mut self.tracking.heart_rate,
            sample.heart_rate,
            HEART_RATE,
        );
        checker.number(
            "sleep_hours",
            &mut self.tracking.sleep_hours,
            sample.sleep_hours,
            SLEEP,
        );
        checker.number(
            "active_minutes",
            &mut self.tracking.active_minutes,
            sample.active_minutes,
            ACTIVE_MINUTES,
        );

        rejected
    }
}

fn flag(current: &mut Option<bool>, incoming: Option<bool>) {
    if incoming.is_some() {
        *current = incoming;
    }
}

struct Checker<'a> {
    rejected: &'a mut Vec<FieldRejection>,
}

impl Checker<'_> {
    fn reject(&mut self, field: &str, value: String, reason: String) {
        self.rejected.push(FieldRejection {
            field: field.to_string(),
            value,
            reason,
        });
    }

    fn number(
        &mut self,
        field: &str,
        current: &mut Option<f64>,
        incoming: Option<f64>,
        range: RangeInclusive<f64>,
    ) {
        let Some(value) = incoming else {
            return;
        };
        if range.contains(&value) {
            *current = Some(value);
        } else {
            self.reject(
                field,
                value.to_string(),
                format!("must be between {} and {}", range.start(), range.end()),
            );
        }
    }

    fn label(&mut self, field: &str, current: &mut Option<String>, incoming: &Option<String>) {
        let Some(value) = incoming else {
            return;
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.reject(field, value.clone(), "must not be empty".to_string());
        } else {
            *current = Some(trimmed.to_string());
        }
    }

    fn choice(
        &mut self,
        field: &str,
        current: &mut Option<String>,
        incoming: &Option<String>,
        allowed: &[&str],
    ) {
        let Some(value) = incoming else {
            return;
        };
        let normalized = value.trim().to_ascii_lowercase();
        if allowed.contains(&normalized.as_str()) {
            *current = Some(normalized);
        } else {
            self.reject(
                field,
                value.clone(),
                format!("must be one of {}", allowed.join(", ")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_fields_are_rejected_and_previous_values_kept() {
        let mut profile = StrokeProfile::default();
        profile.demographics.age = Some(58.0);
        profile.vital_signs.systolic_bp = Some(132.0);

        let mut update = StrokeProfile::default();
        update.demographics.age = Some(430.0);
        update.demographics.gender = Some("  female ".to_string());
        update.vital_signs.systolic_bp = Some(f64::NAN);
        update.medical_history.smoking_status = Some("Sometimes".to_string());
        update.medical_history.diabetes = Some(true);

        let rejected = profile.merge(&update);
        let fields: Vec<&str> = rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "smoking_status", "systolic_bp"]);
        assert_eq!(profile.demographics.age, Some(58.0));
        assert_eq!(profile.vital_signs.systolic_bp, Some(132.0));
        assert_eq!(profile.demographics.gender.as_deref(), Some("female"));
        assert_eq!(profile.medical_history.diabetes, Some(true));
        assert_eq!(profile.medical_history.smoking_status, None);
    }

    #[test]
    fn smoking_status_is_normalized() {
        let mut profile = StrokeProfile::default();
        let mut update = StrokeProfile::default();
        update.medical_history.smoking_status = Some(" Current".to_string());
        assert!(profile.merge(&update).is_empty());
        assert_eq!(profile.medical_history.smoking_status.as_deref(), Some("current"));
    }

    #[test]
    fn activity_accumulates_steps() {
        let mut profile = StrokeProfile::default();
        for _ in 0..3 {
            profile.record_activity(&ActivitySample {
                step_delta: Some(250),
                ..ActivitySample::default()
            });
        }
        let rejected = profile.record_activity(&ActivitySample {
            step_delta: Some(10),
            sleep_hours: Some(30.0),
            ..ActivitySample::default()
        });
        assert_eq!(profile.tracking.steps, Some(760.0));
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].field, "sleep_hours");
    }
}
