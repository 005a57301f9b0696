use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicantKey, DocumentTypeId, UserId};
use super::service::{DocumentService, DocumentServiceError};
use super::slots::SlotId;
use super::store::StoreError;
use super::upload::UploadError;

#[derive(Debug, Deserialize)]
pub struct OptionalDocumentRequest {
    pub applicant_key: String,
    pub document_type_id: DocumentTypeId,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFileRequest {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Router builder exposing the document page, uploads and optional selections.
pub fn document_router(service: Arc<DocumentService>) -> Router {
    // Leave room above the limit so oversized files reach the pipeline's own check.
    let body_limit = usize::try_from(service.upload_limit())
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/api/v1/documents/types", get(catalogue_handler))
        .route("/api/v1/documents/:user_id", get(overview_handler))
        .route(
            "/api/v1/documents/:user_id/optional",
            post(select_optional_handler).delete(deselect_optional_handler),
        )
        .route(
            "/api/v1/documents/:user_id/files/:applicant_key/:document_type_id/:file_name",
            put(upload_handler),
        )
        .route(
            "/api/v1/documents/:user_id/files/:applicant_key/:document_type_id",
            delete(remove_handler),
        )
        .route(
            "/api/v1/documents/:user_id/errors/:slot_id",
            delete(dismiss_error_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

pub(crate) async fn catalogue_handler(State(service): State<Arc<DocumentService>>) -> Response {
    (StatusCode::OK, axum::Json(service.catalogue())).into_response()
}

pub(crate) async fn overview_handler(
    State(service): State<Arc<DocumentService>>,
    Path(user_id): Path<String>,
) -> Response {
    let overview = service.load(&UserId(user_id)).await;
    (StatusCode::OK, axum::Json(overview)).into_response()
}

pub(crate) async fn select_optional_handler(
    State(service): State<Arc<DocumentService>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<OptionalDocumentRequest>,
) -> Response {
    let applicant_key = match parse_key(&request.applicant_key) {
        Ok(key) => key,
        Err(response) => return response,
    };
    match service
        .select_optional(&UserId(user_id), applicant_key, request.document_type_id)
        .await
    {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn deselect_optional_handler(
    State(service): State<Arc<DocumentService>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<OptionalDocumentRequest>,
) -> Response {
    let applicant_key = match parse_key(&request.applicant_key) {
        Ok(key) => key,
        Err(response) => return response,
    };
    match service
        .deselect_optional(&UserId(user_id), applicant_key, request.document_type_id)
        .await
    {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upload_handler(
    State(service): State<Arc<DocumentService>>,
    Path((user_id, applicant_key, document_type_id, file_name)): Path<(
        String,
        String,
        String,
        String,
    )>,
    body: Bytes,
) -> Response {
    let applicant_key = match parse_key(&applicant_key) {
        Ok(key) => key,
        Err(response) => return response,
    };
    match service
        .upload(
            &UserId(user_id),
            applicant_key,
            DocumentTypeId(document_type_id),
            &file_name,
            body.to_vec(),
        )
        .await
    {
        Ok(overview) => (StatusCode::CREATED, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_handler(
    State(service): State<Arc<DocumentService>>,
    Path((user_id, applicant_key, document_type_id)): Path<(String, String, String)>,
    axum::Json(request): axum::Json<RemoveFileRequest>,
) -> Response {
    let applicant_key = match parse_key(&applicant_key) {
        Ok(key) => key,
        Err(response) => return response,
    };
    match service
        .remove(
            &UserId(user_id),
            applicant_key,
            &DocumentTypeId(document_type_id),
            &request.file_name,
            request.uploaded_at,
        )
        .await
    {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dismiss_error_handler(
    State(service): State<Arc<DocumentService>>,
    Path((user_id, slot_id)): Path<(String, String)>,
) -> Response {
    if service.dismiss_error(&UserId(user_id), &SlotId(slot_id)) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let payload = json!({ "error": "no error recorded for this slot" });
        (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
    }
}

fn parse_key(raw: &str) -> Result<ApplicantKey, Response> {
    raw.parse::<ApplicantKey>().map_err(|error| {
        let payload = json!({ "error": error.to_string() });
        (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
    })
}

pub(crate) fn status_for(error: &DocumentServiceError) -> StatusCode {
    match error {
        DocumentServiceError::UnknownApplicant(_) | DocumentServiceError::UnknownDocument(_) => {
            StatusCode::NOT_FOUND
        }
        DocumentServiceError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
        DocumentServiceError::CategoryMismatch { .. }
        | DocumentServiceError::SlotUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DocumentServiceError::AlreadyRequired(_)
        | DocumentServiceError::FilesRemain(_)
        | DocumentServiceError::DuplicateFileName(_) => StatusCode::CONFLICT,
        DocumentServiceError::Upload(upload) => match upload {
            UploadError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::SlotBusy(_) => StatusCode::CONFLICT,
            UploadError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            UploadError::Transfer(_)
            | UploadError::Persistence(_)
            | UploadError::Fetch(_)
            | UploadError::Removal(_) => StatusCode::BAD_GATEWAY,
            UploadError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        DocumentServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        DocumentServiceError::Store(StoreError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn error_response(error: DocumentServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}
