use crate::infra::{answer_store, AnswerUpload, AppState};
use adoption_params::config::DerivationParameters;
use adoption_params::error::AppError;
use adoption_params::workflows::derivation::{DerivationSummary, SurveyDerivation};
use adoption_params::workflows::tables::{MemoryTableSink, Table};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct DeriveRequest {
    pub(crate) parameters: DerivationParameters,
    #[serde(default)]
    pub(crate) answers: Vec<AnswerUpload>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeriveResponse {
    pub(crate) summary: DerivationSummary,
    pub(crate) tables: Vec<Table>,
}

pub(crate) fn router() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/derive", axum::routing::post(derive_endpoint))
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

/// Runs a full derivation over the posted answers and returns every table
/// instead of writing them to disk.
pub(crate) async fn derive_endpoint(
    Json(payload): Json<DeriveRequest>,
) -> Result<Json<DeriveResponse>, AppError> {
    let DeriveRequest {
        parameters,
        answers,
    } = payload;

    let store = answer_store(&answers)?;
    info!(
        response_codes = store.len(),
        stakeholders = parameters.stakeholders.len(),
        "derivation requested"
    );

    let derivation = SurveyDerivation::new(
        Arc::new(parameters),
        Arc::new(store),
        Arc::new(MemoryTableSink::new()),
    );
    let outcome = derivation.run()?;

    Ok(Json(DeriveResponse {
        summary: outcome.summary,
        tables: outcome.tables,
    }))
}
