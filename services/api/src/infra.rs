use metrics_exporter_prometheus::PrometheusHandle;
use signal_risk::config::EngineConfig;
use signal_risk::engine::{AlertLog, AlertSink, Assessment, HttpAlertSink, RiskPipeline, SubjectId};
use signal_risk::error::AppError;
use signal_risk::workflows::assessments::{
    AssessmentRepository, AssessmentService, RepositoryError, RiskApi,
};
use signal_risk::workflows::crowd::{self, CrowdWorkflow, SiteRegistry};
use signal_risk::workflows::stroke::{self, PatientRegistry, StrokeWorkflow};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    latest: Arc<Mutex<HashMap<SubjectId, Assessment>>>,
}

impl InMemoryAssessmentRepository {
    fn guard(&self) -> MutexGuard<'_, HashMap<SubjectId, Assessment>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn store(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        self.guard()
            .insert(assessment.record.subject_id.clone(), assessment);
        Ok(())
    }

    fn latest(&self, subject: &SubjectId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self.guard().get(subject).cloned())
    }

    fn subjects(&self) -> Result<Vec<SubjectId>, RepositoryError> {
        let mut subjects: Vec<SubjectId> = self.guard().keys().cloned().collect();
        subjects.sort();
        Ok(subjects)
    }
}

pub(crate) type Api = RiskApi<InMemoryAssessmentRepository>;

/// Outbound alert hook; absent when no endpoint is configured or the client cannot be built.
pub(crate) fn alert_sink(config: &EngineConfig) -> Option<Arc<dyn AlertSink>> {
    let endpoint = config.alert_endpoint.as_deref()?;
    match HttpAlertSink::new(endpoint, config.notify_timeout) {
        Ok(sink) => Some(Arc::new(sink)),
        Err(error) => {
            warn!(endpoint, error = %error, "alert sink unavailable; deliveries will be simulated");
            None
        }
    }
}

/// Wire both domains to one repository and one alert log.
pub(crate) fn build_api(config: &EngineConfig) -> Result<Arc<Api>, AppError> {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let alerts = Arc::new(AlertLog::new());
    let sink = alert_sink(config);

    let stroke_pipeline =
        RiskPipeline::from_profile(stroke::profile::domain_profile()?, config.acquire_timeout)?;
    let crowd_pipeline =
        RiskPipeline::from_profile(crowd::profile::domain_profile()?, config.acquire_timeout)?;

    let stroke_service = Arc::new(AssessmentService::new(
        stroke_pipeline,
        Arc::clone(&repository),
        Arc::clone(&alerts),
        sink.clone(),
        config.submit_latency,
    ));
    let crowd_service = Arc::new(AssessmentService::new(
        crowd_pipeline,
        Arc::clone(&repository),
        Arc::clone(&alerts),
        sink,
        config.submit_latency,
    ));

    Ok(Arc::new(RiskApi::new(
        StrokeWorkflow::new(Arc::new(PatientRegistry::new()), stroke_service),
        CrowdWorkflow::new(Arc::new(SiteRegistry::new()), crowd_service),
        repository,
        alerts,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_endpoint_means_no_sink() {
        assert!(alert_sink(&EngineConfig::default()).is_none());
    }

    #[test]
    fn configured_endpoint_builds_http_sink() {
        let config = EngineConfig {
            alert_endpoint: Some("http://127.0.0.1:9/api/emergency-alert".to_string()),
            notify_timeout: Duration::from_millis(100),
            ..EngineConfig::default()
        };
        assert!(alert_sink(&config).is_some());
    }

    #[tokio::test]
    async fn both_domains_share_the_repository() {
        let api = build_api(&EngineConfig::default()).expect("profiles are valid");
        let patient = SubjectId::new("patient-1");
        let site = SubjectId::new("site-1");

        api.stroke().assess(&patient).await;
        api.crowd().assess(&site).await;

        let latest = api.stroke().service().latest(&site).expect("repository reads");
        assert_eq!(
            latest.map(|assessment| assessment.record.domain),
            Some(crowd::profile::DOMAIN.to_string())
        );
    }
}
