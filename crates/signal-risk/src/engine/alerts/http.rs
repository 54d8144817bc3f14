use std::time::Duration;

use async_trait::async_trait;

use super::{AlertError, AlertSink, NotificationPayload};

/// Posts notification payloads as JSON to an external alerting endpoint.
#[derive(Debug, Clone)]
pub struct HttpAlertSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAlertSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AlertError::Transport(error.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|error| AlertError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AlertError::Rejected(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::alerts::{
        Alert, AlertDispatcher, AlertId, AlertLog, AlertPolicy, DeliveryReceipt,
    };
    use crate::engine::classifier::Tier;
    use crate::engine::scoring::{ScoreRecord, SourceHealth};
    use crate::engine::signal::SubjectId;
    use chrono::Utc;
    use std::sync::Arc;

    fn alert() -> Alert {
        let health = SourceHealth {
            real_time_used: true,
            historical_used: false,
            clinical_used: false,
            completeness: 50.0,
        };
        Alert {
            id: AlertId("alert-000042".to_string()),
            subject_id: SubjectId::new("site-1"),
            severity: Tier::Critical,
            message: "Very high crowd density".to_string(),
            snapshot: ScoreRecord {
                subject_id: SubjectId::new("site-1"),
                domain: "crowd".to_string(),
                score: 91.0,
                tier: Tier::Critical,
                confidence: 0.5,
                completeness: 50.0,
                contributing_factors: Vec::new(),
                components: Vec::new(),
                overrides: Vec::new(),
                source_health: health,
                computed_at: Utc::now(),
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_simulated_receipt() {
        let sink = HttpAlertSink::new(
            "http://127.0.0.1:9/api/emergency-alert",
            Duration::from_millis(500),
        )
        .expect("client builds");
        let dispatcher = AlertDispatcher::new(
            AlertPolicy::new(Tier::High, "High crowd density"),
            Arc::new(AlertLog::new()),
            Some(Arc::new(sink) as Arc<dyn AlertSink>),
        );

        let receipt = dispatcher.deliver(&alert()).await;
        assert!(matches!(receipt, DeliveryReceipt::Simulated { .. }));
        assert_eq!(receipt.alert_id(), &AlertId("alert-000042".to_string()));
    }

    #[test]
    fn payload_carries_source_health_summary() {
        let payload = NotificationPayload::for_alert(&alert());
        let json = serde_json::to_value(&payload).expect("serializes");
        assert_eq!(json["source_health"]["real_time_used"], true);
        assert_eq!(json["source_health"]["completeness"], 50.0);
        assert_eq!(json["alert"]["snapshot"]["tier"], "critical");
    }
}
