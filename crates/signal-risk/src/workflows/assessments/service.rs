use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::warn;

use super::monitor::{spawn_monitor, MonitorHandle};
use super::repository::{AssessmentRepository, RepositoryError};
use crate::engine::{
    AlertDispatcher, AlertLog, AlertSink, Assessment, RiskPipeline, ScoreRecord, SignalProvider,
    SubjectId,
};

const UPDATE_CAPACITY: usize = 64;

/// Service composing the risk pipeline, alert dispatcher and repository for one domain.
pub struct AssessmentService<R> {
    pipeline: Arc<RiskPipeline>,
    dispatcher: AlertDispatcher,
    repository: Arc<R>,
    subjects: Mutex<HashMap<SubjectId, Arc<tokio::sync::Mutex<()>>>>,
    updates: broadcast::Sender<ScoreRecord>,
    submit_latency: Duration,
}

impl<R> AssessmentService<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(
        pipeline: RiskPipeline,
        repository: Arc<R>,
        alerts: Arc<AlertLog>,
        sink: Option<Arc<dyn AlertSink>>,
        submit_latency: Duration,
    ) -> Self {
        let dispatcher = AlertDispatcher::new(pipeline.alert_policy().clone(), alerts, sink);
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

        Self {
            pipeline: Arc::new(pipeline),
            dispatcher,
            repository,
            subjects: Mutex::new(HashMap::new()),
            updates,
            submit_latency,
        }
    }

    pub fn domain(&self) -> &str {
        self.pipeline.domain()
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Receive every new score record as it is produced.
    pub fn subscribe(&self) -> broadcast::Receiver<ScoreRecord> {
        self.updates.subscribe()
    }

    pub fn latest(&self, subject: &SubjectId) -> Result<Option<Assessment>, RepositoryError> {
        self.repository.latest(subject)
    }

    fn subject_lock(&self, subject: &SubjectId) -> Arc<tokio::sync::Mutex<()>> {
        let mut subjects = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(subjects.entry(subject.clone()).or_default())
    }

    /// Drop the subject's lock entry once nobody else holds or awaits it.
    fn release_subject(&self, subject: &SubjectId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut subjects = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            subjects.remove(subject);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_subjects(&self) -> usize {
        self.subjects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Recompute one subject. Calls for the same subject are serialized; other
    /// subjects proceed independently.
    pub async fn recompute<P>(&self, subject: &SubjectId, provider: &P) -> Assessment
    where
        P: SignalProvider + ?Sized,
    {
        let lock = self.subject_lock(subject);
        let assessment = {
            let _guard = lock.lock().await;
            self.assess_locked(subject, provider).await
        };
        self.release_subject(subject, lock);
        assessment
    }

    /// Like [`recompute`](Self::recompute), but the provider is built after the
    /// subject lock is taken so it reflects the latest inputs.
    pub async fn recompute_with<F, P>(&self, subject: &SubjectId, feed: F) -> Assessment
    where
        F: FnOnce() -> P + Send,
        P: SignalProvider,
    {
        let lock = self.subject_lock(subject);
        let assessment = {
            let _guard = lock.lock().await;
            let provider = feed();
            self.assess_locked(subject, &provider).await
        };
        self.release_subject(subject, lock);
        assessment
    }

    /// Explicit submit: waits the configured latency, then recomputes.
    pub async fn submit_with<F, P>(&self, subject: &SubjectId, feed: F) -> Assessment
    where
        F: FnOnce() -> P + Send,
        P: SignalProvider,
    {
        if !self.submit_latency.is_zero() {
            tokio::time::sleep(self.submit_latency).await;
        }
        self.recompute_with(subject, feed).await
    }

    /// Start periodic recomputation of `subject` until the handle is stopped.
    pub fn monitor<F, P>(
        self: &Arc<Self>,
        subject: SubjectId,
        interval: Duration,
        feed: F,
    ) -> MonitorHandle
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: SignalProvider + 'static,
    {
        let service = Arc::clone(self);
        let feed = Arc::new(feed);
        let target = subject.clone();

        spawn_monitor(subject, interval, move || {
            let service = Arc::clone(&service);
            let feed = Arc::clone(&feed);
            let subject = target.clone();
            async move {
                service.recompute_with(&subject, || feed()).await;
            }
        })
    }

    async fn assess_locked<P>(&self, subject: &SubjectId, provider: &P) -> Assessment
    where
        P: SignalProvider + ?Sized,
    {
        let mut assessment = self.pipeline.assess(subject, provider, Utc::now()).await;

        if let Some(alert) = self.dispatcher.maybe_alert(&assessment.record) {
            self.dispatcher.deliver_detached(alert.clone());
            assessment.alert = Some(alert);
        }

        if let Err(error) = self.repository.store(assessment.clone()) {
            warn!(subject = %subject, error = %error, "failed to store assessment");
        }

        // No subscribers is fine.
        let _ = self.updates.send(assessment.record.clone());

        assessment
    }
}
