use crate::infra::{deserialize_optional_instant, AppState};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDateTime};
use newborn_care::clinical::bilirubin::WeightBand;
use newborn_care::clinical::PatientRecord;
use newborn_care::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentRequest {
    #[serde(flatten)]
    pub(crate) patient: PatientRecord,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub(crate) evaluated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WeightBandEntry {
    pub(crate) band: WeightBand,
    pub(crate) label: &'static str,
    pub(crate) by_day: [f64; 8],
}

#[derive(Debug, Serialize)]
pub(crate) struct WeightBandsResponse {
    pub(crate) unit: &'static str,
    pub(crate) bands: Vec<WeightBandEntry>,
}

pub(crate) fn with_assessment_routes() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/newborn/assessment",
            axum::routing::post(assessment_endpoint),
        )
        .route(
            "/api/v1/bilirubin/weight-bands",
            axum::routing::get(weight_bands_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn assessment_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<AssessmentRequest>,
) -> Result<Response, AppError> {
    let AssessmentRequest {
        patient,
        evaluated_at,
    } = payload;

    let evaluated_at = evaluated_at.unwrap_or_else(|| Local::now().naive_local());
    let assessment = state.assessor.assess(&patient, evaluated_at)?;
    info!(
        size_class = assessment.growth.size_label,
        days_old = assessment.age.days_old,
        "newborn assessment served"
    );

    Ok(Json(assessment.to_view()).into_response())
}

pub(crate) async fn weight_bands_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<WeightBandsResponse> {
    let bands = state
        .assessor
        .tables()
        .bilirubin
        .weight_bands
        .curves()
        .iter()
        .map(|curve| WeightBandEntry {
            band: curve.band,
            label: curve.band.label(),
            by_day: curve.by_day,
        })
        .collect();

    Json(WeightBandsResponse {
        unit: "mg/dL",
        bands,
    })
}
