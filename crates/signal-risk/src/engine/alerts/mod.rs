//! Alert creation, the append-only alert log, and best-effort outbound delivery.

mod http;

pub use http::HttpAlertSink;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classifier::Tier;
use super::scoring::{ScoreRecord, SourceHealth};
use super::signal::SubjectId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertId(pub String);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable alert record created only by [`AlertDispatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub subject_id: SubjectId,
    pub severity: Tier,
    pub message: String,
    pub snapshot: ScoreRecord,
    pub created_at: DateTime<Utc>,
}

/// Unbounded, ordered alert log. Nothing is ever removed.
#[derive(Debug, Default)]
pub struct AlertLog {
    sequence: AtomicU64,
    alerts: Mutex<Vec<Alert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(
        &self,
        subject_id: SubjectId,
        severity: Tier,
        message: String,
        snapshot: ScoreRecord,
        created_at: DateTime<Utc>,
    ) -> Alert {
        let mut entries = self.entries();
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let alert = Alert {
            id: AlertId(format!("alert-{id:06}")),
            subject_id,
            severity,
            message,
            snapshot,
            created_at,
        };
        entries.push(alert.clone());
        alert
    }

    /// Every alert in creation order.
    pub fn all(&self) -> Vec<Alert> {
        self.entries().clone()
    }

    pub fn get(&self, id: &AlertId) -> Option<Alert> {
        self.entries().iter().find(|alert| &alert.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// When a record warrants an alert, and how it is worded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    pub threshold: Tier,
    pub headline: String,
}

impl AlertPolicy {
    pub fn new(threshold: Tier, headline: &str) -> Self {
        Self {
            threshold,
            headline: headline.to_string(),
        }
    }

    pub fn triggers(&self, record: &ScoreRecord) -> bool {
        record.tier >= self.threshold || !record.overrides.is_empty()
    }

    fn message(&self, record: &ScoreRecord) -> String {
        let mut message = format!(
            "{} for {}: score {:.0} ({})",
            self.headline, record.subject_id, record.score, record.tier
        );
        if !record.overrides.is_empty() {
            let names: Vec<&str> = record
                .overrides
                .iter()
                .map(|active| active.rule.as_str())
                .collect();
            message.push_str(&format!("; overrides: {}", names.join(", ")));
        }
        message
    }
}

/// Body of the outbound notification POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub alert: Alert,
    pub source_health: SourceHealth,
}

impl NotificationPayload {
    pub fn for_alert(alert: &Alert) -> Self {
        Self {
            source_health: alert.snapshot.source_health,
            alert: alert.clone(),
        }
    }
}

/// Outcome surfaced to callers of [`AlertDispatcher::deliver`]; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReceipt {
    Delivered { alert_id: AlertId },
    /// The sink failed or is absent; the alert was prepared locally instead.
    Simulated { alert_id: AlertId, reason: String },
}

impl DeliveryReceipt {
    pub fn alert_id(&self) -> &AlertId {
        match self {
            DeliveryReceipt::Delivered { alert_id } | DeliveryReceipt::Simulated { alert_id, .. } => {
                alert_id
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeliveryReceipt::Delivered { .. } => "alert sent to the alerting endpoint",
            DeliveryReceipt::Simulated { .. } => {
                "alert prepared; it would be sent to the alerting endpoint in production"
            }
        }
    }
}

/// Outbound hook for alert notifications (HTTP endpoint, pager, test double).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
    #[error("alert endpoint rejected the notification with status {0}")]
    Rejected(u16),
}

/// Creates alerts for qualifying records and delivers them best-effort.
#[derive(Clone)]
pub struct AlertDispatcher {
    policy: AlertPolicy,
    log: Arc<AlertLog>,
    sink: Option<Arc<dyn AlertSink>>,
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("policy", &self.policy)
            .field("alerts", &self.log.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(policy: AlertPolicy, log: Arc<AlertLog>, sink: Option<Arc<dyn AlertSink>>) -> Self {
        Self { policy, log, sink }
    }

    pub fn log(&self) -> &Arc<AlertLog> {
        &self.log
    }

    /// Append an alert when the record crosses the policy threshold or carries an override.
    pub fn maybe_alert(&self, record: &ScoreRecord) -> Option<Alert> {
        if !self.policy.triggers(record) {
            return None;
        }

        let alert = self.log.append(
            record.subject_id.clone(),
            record.tier,
            self.policy.message(record),
            record.clone(),
            record.computed_at,
        );
        info!(
            alert = %alert.id,
            subject = %alert.subject_id,
            severity = %alert.severity,
            "alert raised"
        );
        Some(alert)
    }

    /// Send the alert to the sink. Failures are logged and reported as simulated delivery.
    pub async fn deliver(&self, alert: &Alert) -> DeliveryReceipt {
        let Some(sink) = &self.sink else {
            warn!(alert = %alert.id, "no alert endpoint configured; reporting simulated delivery");
            return DeliveryReceipt::Simulated {
                alert_id: alert.id.clone(),
                reason: "no alert endpoint configured".to_string(),
            };
        };

        match sink.send(&NotificationPayload::for_alert(alert)).await {
            Ok(()) => DeliveryReceipt::Delivered {
                alert_id: alert.id.clone(),
            },
            Err(error) => {
                warn!(alert = %alert.id, error = %error, "alert delivery failed; reporting simulated delivery");
                DeliveryReceipt::Simulated {
                    alert_id: alert.id.clone(),
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Deliver on a background task so the caller never waits on the sink.
    pub fn deliver_detached(&self, alert: Alert) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.deliver(&alert).await;
        });
    }
}
