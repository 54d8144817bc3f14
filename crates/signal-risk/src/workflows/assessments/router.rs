use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

use super::repository::AssessmentRepository;
use crate::engine::{AlertId, AlertLog, SubjectId};
use crate::error::AppError;
use crate::workflows::crowd::{self, CrowdReadings, CrowdWorkflow};
use crate::workflows::stroke::StrokeWorkflow;

/// Shared state behind the HTTP surface.
pub struct RiskApi<R> {
    stroke: StrokeWorkflow<R>,
    crowd: CrowdWorkflow<R>,
    repository: Arc<R>,
    alerts: Arc<AlertLog>,
}

impl<R> RiskApi<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(
        stroke: StrokeWorkflow<R>,
        crowd: CrowdWorkflow<R>,
        repository: Arc<R>,
        alerts: Arc<AlertLog>,
    ) -> Self {
        Self {
            stroke,
            crowd,
            repository,
            alerts,
        }
    }

    pub fn stroke(&self) -> &StrokeWorkflow<R> {
        &self.stroke
    }

    pub fn crowd(&self) -> &CrowdWorkflow<R> {
        &self.crowd
    }

    pub fn alerts(&self) -> &Arc<AlertLog> {
        &self.alerts
    }
}

/// Router builder exposing manual input, recompute, and alert endpoints.
pub fn risk_router<R>(api: Arc<RiskApi<R>>) -> Router
where
    R: AssessmentRepository + 'static,
{
    Router::new()
        .route("/api/v1/stroke/patients/:id", put(update_patient_handler::<R>))
        .route(
            "/api/v1/stroke/patients/:id/import",
            post(import_patient_handler::<R>),
        )
        .route(
            "/api/v1/stroke/patients/:id/tracking",
            post(tracking_handler::<R>),
        )
        .route(
            "/api/v1/stroke/patients/:id/assessment",
            post(stroke_assessment_handler::<R>),
        )
        .route(
            "/api/v1/crowd/sites/:id/readings",
            put(site_readings_handler::<R>),
        )
        .route(
            "/api/v1/crowd/sites/:id/assessment",
            post(crowd_assessment_handler::<R>),
        )
        .route("/api/v1/assessments", get(subjects_handler::<R>))
        .route("/api/v1/assessments/:id", get(latest_handler::<R>))
        .route("/api/v1/alerts", get(alerts_handler::<R>))
        .route("/api/v1/alerts/:id/notify", post(notify_handler::<R>))
        .with_state(api)
}

pub(crate) async fn update_patient_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(patient_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let outcome = api.stroke.update_profile_json(&SubjectId(patient_id), body);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn import_patient_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(patient_id): Path<String>,
    body: String,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match api.stroke.import_csv(&SubjectId(patient_id), body.as_bytes()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn tracking_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(patient_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let outcome = api.stroke.record_activity_json(&SubjectId(patient_id), body);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn stroke_assessment_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(patient_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let assessment = api.stroke.submit(&SubjectId(patient_id)).await;
    (StatusCode::OK, axum::Json(assessment)).into_response()
}

pub(crate) async fn site_readings_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(site_id): Path<String>,
    axum::Json(update): axum::Json<CrowdReadings>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let readings = api.crowd.update_readings(&SubjectId(site_id), &update);
    (StatusCode::OK, axum::Json(readings)).into_response()
}

pub(crate) async fn crowd_assessment_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(site_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let assessment = api.crowd.assess(&SubjectId(site_id)).await;
    (StatusCode::OK, axum::Json(assessment)).into_response()
}

pub(crate) async fn latest_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(subject_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let subject = SubjectId(subject_id);
    match api.repository.latest(&subject) {
        Ok(Some(assessment)) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "no assessment recorded",
                "subject_id": subject.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn subjects_handler<R>(State(api): State<Arc<RiskApi<R>>>) -> Response
where
    R: AssessmentRepository + 'static,
{
    match api.repository.subjects() {
        Ok(subjects) => {
            (StatusCode::OK, axum::Json(json!({ "subjects": subjects }))).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn alerts_handler<R>(State(api): State<Arc<RiskApi<R>>>) -> Response
where
    R: AssessmentRepository + 'static,
{
    (StatusCode::OK, axum::Json(api.alerts.all())).into_response()
}

/// Manual delivery. A failed or missing sink still answers 200 with a simulated receipt.
pub(crate) async fn notify_handler<R>(
    State(api): State<Arc<RiskApi<R>>>,
    Path(alert_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let id = AlertId(alert_id);
    let Some(alert) = api.alerts.get(&id) else {
        let payload = json!({
            "error": "alert not found",
            "alert_id": id.0,
        });
        return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
    };

    let dispatcher = if alert.snapshot.domain == crowd::profile::DOMAIN {
        api.crowd.service().dispatcher()
    } else {
        api.stroke.service().dispatcher()
    };

    let receipt = dispatcher.deliver(&alert).await;
    let message = receipt.message();
    let payload = json!({
        "receipt": receipt,
        "message": message,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}
