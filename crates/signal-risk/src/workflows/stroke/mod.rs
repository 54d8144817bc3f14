//! Stroke-risk assessments for individual patients.

pub mod domain;
pub mod import;
pub mod intake;
pub mod profile;

pub use domain::{
    ActivitySample, Demographics, FieldRejection, HealthTracking, HistoricalRecord, LabResults,
    MedicalHistory, StrokeProfile, Symptoms, VitalSigns,
};
pub use import::ImportError;
pub use intake::Intake;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::assessments::{AssessmentRepository, AssessmentService, MonitorHandle};
use crate::engine::{AcquireError, Assessment, SignalProvider, SignalValue, SourceId, SubjectId};

/// In-memory patient records keyed by patient id.
#[derive(Debug, Default)]
pub struct PatientRegistry {
    patients: Mutex<HashMap<SubjectId, StrokeProfile>>,
}

/// Profile after an update, plus any fields that were rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdateOutcome {
    pub patient_id: SubjectId,
    pub profile: StrokeProfile,
    pub rejected: Vec<FieldRejection>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn patients(&self) -> MutexGuard<'_, HashMap<SubjectId, StrokeProfile>> {
        self.patients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, patient: &SubjectId, update: &StrokeProfile) -> ProfileUpdateOutcome {
        let mut patients = self.patients();
        let profile = patients.entry(patient.clone()).or_default();
        let rejected = profile.merge(update);
        log_rejections(patient, &rejected);
        ProfileUpdateOutcome {
            patient_id: patient.clone(),
            profile: profile.clone(),
            rejected,
        }
    }

    /// Apply a wearable sample; the step counter is updated while the registry lock is held.
    pub fn record_activity(
        &self,
        patient: &SubjectId,
        sample: &ActivitySample,
    ) -> ProfileUpdateOutcome {
        let mut patients = self.patients();
        let profile = patients.entry(patient.clone()).or_default();
        let rejected = profile.record_activity(sample);
        log_rejections(patient, &rejected);
        ProfileUpdateOutcome {
            patient_id: patient.clone(),
            profile: profile.clone(),
            rejected,
        }
    }

    /// Point-in-time copy; unknown patients yield an empty profile.
    pub fn snapshot(&self, patient: &SubjectId) -> StrokeProfile {
        self.patients().get(patient).cloned().unwrap_or_default()
    }
}

fn log_rejections(patient: &SubjectId, rejected: &[FieldRejection]) {
    for rejection in rejected {
        warn!(
            subject = %patient,
            field = %rejection.field,
            value = %rejection.value,
            reason = %rejection.reason,
            "rejected invalid input; keeping previous value"
        );
    }
}

/// Signal provider reading from one snapshot of a patient record.
#[derive(Debug, Clone)]
pub struct PatientFeed {
    profile: StrokeProfile,
}

impl PatientFeed {
    pub fn new(profile: StrokeProfile) -> Self {
        Self { profile }
    }

    fn reading(&self, source: &str) -> Result<Option<SignalValue>, AcquireError> {
        let p = &self.profile;
        let number = |value: Option<f64>| value.map(SignalValue::Number);
        let flag = |value: Option<bool>| value.map(SignalValue::Flag);
        let label = |value: &Option<String>| value.clone().map(SignalValue::Label);

        let reading = match source {
            profile::AGE => number(p.demographics.age),
            profile::GENDER => label(&p.demographics.gender),
            profile::ETHNICITY => label(&p.demographics.ethnicity),
            profile::HYPERTENSION => flag(p.medical_history.hypertension),
            profile::DIABETES => flag(p.medical_history.diabetes),
            profile::HEART_DISEASE => flag(p.medical_history.heart_disease),
            profile::STROKE_HISTORY => flag(p.medical_history.stroke_history),
            profile::SMOKING_STATUS => label(&p.medical_history.smoking_status),
            profile::SYSTOLIC_BP => number(p.vital_signs.systolic_bp),
            profile::DIASTOLIC_BP => number(p.vital_signs.diastolic_bp),
            profile::HEART_RATE => number(p.vital_signs.heart_rate.or(p.tracking.heart_rate)),
            profile::OXYGEN_SATURATION => number(p.vital_signs.oxygen_saturation),
            profile::CHOLESTEROL => number(p.lab_results.cholesterol),
            profile::GLUCOSE => number(p.lab_results.glucose),
            profile::STEPS => number(p.tracking.steps),
            profile::SLEEP_HOURS => number(p.tracking.sleep_hours),
            profile::ACTIVE_MINUTES => number(p.tracking.active_minutes),
            profile::TRACKED_HEART_RATE => number(p.tracking.heart_rate),
            profile::FACIAL_DROOP => flag(p.symptoms.facial_droop),
            profile::ARM_WEAKNESS => flag(p.symptoms.arm_weakness),
            profile::SPEECH_DIFFICULTY => flag(p.symptoms.speech_difficulty),
            profile::SYMPTOM_SEVERITY => number(p.symptoms.severity),
            profile::BMI => number(p.history.bmi),
            profile::FAMILY_HISTORY => label(&p.history.family_history),
            other => {
                return Err(AcquireError::Unavailable(format!(
                    "unknown patient field `{other}`"
                )))
            }
        };
        Ok(reading)
    }
}

#[async_trait]
impl SignalProvider for PatientFeed {
    async fn fetch(&self, source: &SourceId) -> Result<SignalValue, AcquireError> {
        self.reading(source.as_str())?.ok_or(AcquireError::Absent)
    }
}

/// Patient registry wired to the stroke assessment service.
pub struct StrokeWorkflow<R> {
    registry: Arc<PatientRegistry>,
    service: Arc<AssessmentService<R>>,
}

impl<R> StrokeWorkflow<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(registry: Arc<PatientRegistry>, service: Arc<AssessmentService<R>>) -> Self {
        Self { registry, service }
    }

    pub fn registry(&self) -> &Arc<PatientRegistry> {
        &self.registry
    }

    pub fn service(&self) -> &Arc<AssessmentService<R>> {
        &self.service
    }

    pub fn update_profile(
        &self,
        patient: &SubjectId,
        update: &StrokeProfile,
    ) -> ProfileUpdateOutcome {
        self.registry.update(patient, update)
    }

    /// Backfill from a CSV export. Imported values go through the same validation
    /// as manual entry.
    pub fn import_csv<Rd: Read>(
        &self,
        patient: &SubjectId,
        reader: Rd,
    ) -> Result<ProfileUpdateOutcome, ImportError> {
        let parsed = import::parse_reader(reader)?;
        Ok(self.apply_intake(patient, parsed))
    }

    pub fn import_path<P: AsRef<Path>>(
        &self,
        patient: &SubjectId,
        path: P,
    ) -> Result<ProfileUpdateOutcome, ImportError> {
        let parsed = import::parse_path(path)?;
        Ok(self.apply_intake(patient, parsed))
    }

    /// Manual update from raw JSON. Mistyped members are rejected individually.
    pub fn update_profile_json(&self, patient: &SubjectId, body: Value) -> ProfileUpdateOutcome {
        self.apply_intake(patient, intake::profile_update(body))
    }

    /// Wearable sample from raw JSON. Mistyped members are rejected individually.
    pub fn record_activity_json(&self, patient: &SubjectId, body: Value) -> ProfileUpdateOutcome {
        let Intake { update, rejected } = intake::activity_sample(body);
        log_rejections(patient, &rejected);
        let mut outcome = self.registry.record_activity(patient, &update);
        outcome.rejected.splice(0..0, rejected);
        outcome
    }

    fn apply_intake(
        &self,
        patient: &SubjectId,
        parsed: Intake<StrokeProfile>,
    ) -> ProfileUpdateOutcome {
        let Intake { update, rejected } = parsed;
        log_rejections(patient, &rejected);
        let mut outcome = self.registry.update(patient, &update);
        outcome.rejected.splice(0..0, rejected);
        outcome
    }

    pub fn record_activity(
        &self,
        patient: &SubjectId,
        sample: &ActivitySample,
    ) -> ProfileUpdateOutcome {
        self.registry.record_activity(patient, sample)
    }

    /// Recompute now, without the submit latency.
    pub async fn assess(&self, patient: &SubjectId) -> Assessment {
        let registry = Arc::clone(&self.registry);
        self.service
            .recompute_with(patient, || PatientFeed::new(registry.snapshot(patient)))
            .await
    }

    /// Explicit user submit, delayed by the configured latency.
    pub async fn submit(&self, patient: &SubjectId) -> Assessment {
        let registry = Arc::clone(&self.registry);
        self.service
            .submit_with(patient, || PatientFeed::new(registry.snapshot(patient)))
            .await
    }

    /// Periodically reassess `patient` until the handle is stopped.
    pub fn monitor(&self, patient: SubjectId, interval: Duration) -> MonitorHandle {
        let registry = Arc::clone(&self.registry);
        let target = patient.clone();
        self.service.monitor(patient, interval, move || {
            PatientFeed::new(registry.snapshot(&target))
        })
    }
}
