use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use super::fallback::FallbackPolicy;
use super::scoring::{ScoringEntry, ScoringTable};
use super::signal::{Signal, SignalValue, SourceId, SubjectId, ValueKind};

/// Collaborator supplying raw readings for one subject.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    async fn fetch(&self, source: &SourceId) -> Result<SignalValue, AcquireError>;
}

/// Reasons a single fetch may fail. None of them is fatal to an assessment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AcquireError {
    #[error("acquisition timed out after {0:?}")]
    Timeout(Duration),
    #[error("no reading available")]
    Absent,
    #[error("malformed reading: expected {expected:?}, received {received:?}")]
    Malformed {
        expected: ValueKind,
        received: ValueKind,
    },
    #[error("permission denied")]
    PermissionDenied,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Acquires every table entry for a subject, substituting registered defaults on failure.
#[derive(Debug, Clone)]
pub struct SignalSource {
    table: ScoringTable,
    fallbacks: FallbackPolicy,
    timeout: Duration,
}

impl SignalSource {
    pub fn new(table: ScoringTable, fallbacks: FallbackPolicy, timeout: Duration) -> Self {
        Self {
            table,
            fallbacks,
            timeout,
        }
    }

    /// One fetch attempt, never retried. `None` only when the source has no registered default.
    pub async fn acquire<P>(
        &self,
        subject: &SubjectId,
        provider: &P,
        entry: &ScoringEntry,
        at: DateTime<Utc>,
    ) -> Option<Signal>
    where
        P: SignalProvider + ?Sized,
    {
        let fetched = match tokio::time::timeout(self.timeout, provider.fetch(&entry.source)).await
        {
            Ok(result) => result.and_then(|value| validate(entry, value)),
            Err(_) => Err(AcquireError::Timeout(self.timeout)),
        };

        match fetched {
            Ok(value) => Some(self.signal(entry, value, false, at)),
            Err(reason) => {
                let Some(value) = self.fallbacks.default_for(&entry.source, at) else {
                    warn!(
                        source = %entry.source,
                        subject = %subject,
                        reason = %reason,
                        "no fallback registered; dropping signal"
                    );
                    return None;
                };
                info!(
                    source = %entry.source,
                    subject = %subject,
                    reason = %reason,
                    "substituted fallback signal"
                );
                Some(self.signal(entry, value, true, at))
            }
        }
    }

    /// Acquire every entry concurrently; the result keeps table order.
    pub async fn acquire_all<P>(
        &self,
        subject: &SubjectId,
        provider: &P,
        at: DateTime<Utc>,
    ) -> Vec<Signal>
    where
        P: SignalProvider + ?Sized,
    {
        let pending = self
            .table
            .entries()
            .iter()
            .map(|entry| self.acquire(subject, provider, entry, at));

        join_all(pending).await.into_iter().flatten().collect()
    }

    fn signal(
        &self,
        entry: &ScoringEntry,
        value: SignalValue,
        is_fallback: bool,
        at: DateTime<Utc>,
    ) -> Signal {
        Signal {
            source_id: entry.source.clone(),
            value,
            unit: entry.unit.clone(),
            weight: entry.weight,
            is_fallback,
            captured_at: at,
        }
    }
}

fn validate(entry: &ScoringEntry, value: SignalValue) -> Result<SignalValue, AcquireError> {
    if value.kind() != entry.expects {
        return Err(AcquireError::Malformed {
            expected: entry.expects,
            received: value.kind(),
        });
    }
    if !value.is_finite() && value.kind() != ValueKind::Number {
        return Err(AcquireError::Malformed {
            expected: entry.expects,
            received: value.kind(),
        });
    }
    if !value.is_populated() {
        return Err(AcquireError::Absent);
    }
    Ok(value)
}
