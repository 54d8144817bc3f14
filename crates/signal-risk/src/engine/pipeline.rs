use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alerts::{Alert, AlertPolicy};
use super::classifier::Classifier;
use super::profile::{DomainProfile, ProfileError};
use super::recommend::RecommendationGenerator;
use super::scoring::{ScoreRecord, ScoringEngine};
use super::signal::{Signal, SubjectId};
use super::source::{SignalProvider, SignalSource};

/// Latest outcome kept per subject: the record, its recommendations and the inputs used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub record: ScoreRecord,
    pub recommendations: Vec<String>,
    pub signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

/// Acquire, score and recommend for one domain.
#[derive(Debug, Clone)]
pub struct RiskPipeline {
    domain: String,
    source: SignalSource,
    engine: ScoringEngine,
    recommender: RecommendationGenerator,
    alert_policy: AlertPolicy,
}

impl RiskPipeline {
    /// Validate `profile` and assemble the pipeline around it.
    pub fn from_profile(
        profile: DomainProfile,
        acquire_timeout: Duration,
    ) -> Result<Self, ProfileError> {
        profile.validate(Utc::now())?;

        let DomainProfile {
            name,
            table,
            fallbacks,
            bands,
            overrides,
            factor_rules,
            plan,
            checklist,
            alert_policy,
        } = profile;

        let source = SignalSource::new(table.clone(), fallbacks, acquire_timeout);
        let engine = ScoringEngine::new(
            name.clone(),
            table,
            checklist,
            Classifier::new(bands),
            overrides,
            factor_rules,
        );

        Ok(Self {
            domain: name,
            source,
            engine,
            recommender: RecommendationGenerator::new(plan),
            alert_policy,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn alert_policy(&self) -> &AlertPolicy {
        &self.alert_policy
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn acquire<P>(
        &self,
        subject: &SubjectId,
        provider: &P,
        at: DateTime<Utc>,
    ) -> Vec<Signal>
    where
        P: SignalProvider + ?Sized,
    {
        self.source.acquire_all(subject, provider, at).await
    }

    /// Score an already acquired signal set. Pure in `(signals, at)`.
    pub fn evaluate(
        &self,
        subject: &SubjectId,
        signals: Vec<Signal>,
        at: DateTime<Utc>,
    ) -> Assessment {
        let record = self.engine.compute_score(subject, &signals, at);
        let factors = self.engine.risk_factors(&signals);
        let recommendations =
            self.recommender
                .recommend(record.urgency(), &factors, &record.data_quality());

        Assessment {
            record,
            recommendations,
            signals,
            alert: None,
        }
    }

    pub async fn assess<P>(
        &self,
        subject: &SubjectId,
        provider: &P,
        at: DateTime<Utc>,
    ) -> Assessment
    where
        P: SignalProvider + ?Sized,
    {
        let signals = self.acquire(subject, provider, at).await;
        self.evaluate(subject, signals, at)
    }
}
