use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use subsidy_intake::documents::{
    derive_requirements, document_router, ApplicationFacts, DocumentService,
    DocumentServiceError, RequiredDocumentSet, UserId,
};
use subsidy_intake::error::AppError;
use tracing::info;

pub(crate) fn with_document_routes(service: Arc<DocumentService>) -> axum::Router {
    document_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/facts/:user_id",
            axum::routing::put(replace_facts_endpoint),
        )
        .route(
            "/api/v1/requirements",
            axum::routing::post(requirements_endpoint),
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

/// Stand-in for the form wizard writing application facts.
pub(crate) async fn replace_facts_endpoint(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
    Json(facts): Json<ApplicationFacts>,
) -> Result<StatusCode, AppError> {
    let user_id = UserId(user_id);
    state
        .facts
        .replace(&user_id, facts)
        .map_err(DocumentServiceError::from)?;
    info!(user_id = %user_id, "application facts replaced");
    Ok(StatusCode::NO_CONTENT)
}

/// Stateless derivation for ad-hoc fact sets.
pub(crate) async fn requirements_endpoint(
    Json(facts): Json<ApplicationFacts>,
) -> Json<RequiredDocumentSet> {
    Json(derive_requirements(&facts))
}
