use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::engine::{
    AcquireError, AlertError, AlertLog, AlertSink, Assessment, NotificationPayload, RiskPipeline,
    SignalProvider, SignalValue, SourceId, SubjectId,
};
use crate::workflows::assessments::{
    risk_router, AssessmentRepository, AssessmentService, RepositoryError, RiskApi,
};
use crate::workflows::crowd::{self, CrowdWorkflow, SiteRegistry};
use crate::workflows::stroke::{self, PatientRegistry, StrokeWorkflow};

pub(super) const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Default)]
pub(super) struct MemoryRepository {
    latest: Mutex<HashMap<SubjectId, Assessment>>,
}

impl AssessmentRepository for MemoryRepository {
    fn store(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        self.latest
            .lock()
            .unwrap()
            .insert(assessment.record.subject_id.clone(), assessment);
        Ok(())
    }

    fn latest(&self, subject: &SubjectId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self.latest.lock().unwrap().get(subject).cloned())
    }

    fn subjects(&self) -> Result<Vec<SubjectId>, RepositoryError> {
        let mut subjects: Vec<SubjectId> = self.latest.lock().unwrap().keys().cloned().collect();
        subjects.sort();
        Ok(subjects)
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn store(&self, _assessment: Assessment) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest(&self, _subject: &SubjectId) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn subjects(&self) -> Result<Vec<SubjectId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    payloads: Mutex<Vec<NotificationPayload>>,
}

impl RecordingSink {
    pub(super) fn payloads(&self) -> Vec<NotificationPayload> {
        self.payloads.lock().unwrap().clone()
    }

    /// Detached deliveries land shortly after the assessment returns.
    pub(super) async fn wait_for(&self, count: usize) -> Vec<NotificationPayload> {
        for _ in 0..100 {
            let payloads = self.payloads();
            if payloads.len() >= count {
                return payloads;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.payloads()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), AlertError> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Provider that answers nothing but counts every fetch.
#[derive(Clone, Default)]
pub(super) struct CountingFeed {
    fetches: Arc<AtomicUsize>,
}

impl CountingFeed {
    pub(super) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalProvider for CountingFeed {
    async fn fetch(&self, _source: &SourceId) -> Result<SignalValue, AcquireError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(AcquireError::Absent)
    }
}

/// Provider that logs its tag before and after a delay on every fetch.
pub(super) struct TaggedFeed {
    pub(super) tag: usize,
    pub(super) delay: Duration,
    pub(super) log: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl SignalProvider for TaggedFeed {
    async fn fetch(&self, _source: &SourceId) -> Result<SignalValue, AcquireError> {
        self.log.lock().unwrap().push(self.tag);
        tokio::time::sleep(self.delay).await;
        self.log.lock().unwrap().push(self.tag);
        Err(AcquireError::Absent)
    }
}

/// Number of times the tag changes along the log.
pub(super) fn tag_switches(log: &[usize]) -> usize {
    log.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

pub(super) fn stroke_pipeline() -> RiskPipeline {
    let profile = stroke::profile::domain_profile().expect("stroke profile is valid");
    RiskPipeline::from_profile(profile, ACQUIRE_TIMEOUT).expect("stroke pipeline builds")
}

pub(super) fn crowd_pipeline() -> RiskPipeline {
    let profile = crowd::profile::domain_profile().expect("crowd profile is valid");
    RiskPipeline::from_profile(profile, ACQUIRE_TIMEOUT).expect("crowd pipeline builds")
}

pub(super) fn stroke_service<R>(
    repository: Arc<R>,
    sink: Option<Arc<dyn AlertSink>>,
    submit_latency: Duration,
) -> Arc<AssessmentService<R>>
where
    R: AssessmentRepository + 'static,
{
    Arc::new(AssessmentService::new(
        stroke_pipeline(),
        repository,
        Arc::new(AlertLog::new()),
        sink,
        submit_latency,
    ))
}

pub(super) struct TestApi {
    pub(super) api: Arc<RiskApi<MemoryRepository>>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) alerts: Arc<AlertLog>,
}

pub(super) fn build_api() -> TestApi {
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(AlertLog::new());

    let stroke_service = Arc::new(AssessmentService::new(
        stroke_pipeline(),
        Arc::clone(&repository),
        Arc::clone(&alerts),
        None,
        Duration::ZERO,
    ));
    let crowd_service = Arc::new(AssessmentService::new(
        crowd_pipeline(),
        Arc::clone(&repository),
        Arc::clone(&alerts),
        None,
        Duration::ZERO,
    ));

    let api = Arc::new(RiskApi::new(
        StrokeWorkflow::new(Arc::new(PatientRegistry::new()), stroke_service),
        CrowdWorkflow::new(Arc::new(SiteRegistry::new()), crowd_service),
        Arc::clone(&repository),
        Arc::clone(&alerts),
    ));

    TestApi {
        api,
        repository,
        alerts,
    }
}

pub(super) fn router(test_api: &TestApi) -> axum::Router {
    risk_router(Arc::clone(&test_api.api))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
