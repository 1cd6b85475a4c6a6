use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Query, State,
    },
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use crate::server::AppState;
use crate::importer::{ImportSummary, Importer};
use crate::query::{QueryEngine, SymptomFilter};
use crate::storage::{DbStats, SqliteStore};
use crate::business::BusinessSymptomRecord;
use crate::{Error, Result};
use std::sync::Arc;

/// Multipart field carrying the CSV file
pub const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct BusinessSymptomParams {
    pub business_id: Option<String>,
    pub diagnostic: Option<String>,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub status: &'static str,
    pub rows_processed: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a crate error onto an HTTP status and JSON body
pub fn error_response(err: Error) -> ApiError {
    let status = if matches!(err, Error::UploadTooLarge(_)) {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_busy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::warn!(error = %err, "Rejected request");
    }

    (status, Json(ErrorResponse { error: err.to_string() }))
}

/// Run `f` against a per-request connection on the blocking pool
async fn with_store<T, F>(state: Arc<AppState>, f: F) -> Result<T>
where
    F: FnOnce(&mut SqliteStore, &AppState) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut store = state.open_store()?;
        f(&mut store, &state)
    })
    .await?
}

/// Keep the body-limit rejection distinct from other malformed uploads
fn upload_error(status: StatusCode, message: String) -> Error {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        Error::UploadTooLarge(message)
    } else {
        Error::Upload(message)
    }
}

fn multipart_error(e: MultipartError) -> Error {
    upload_error(e.status(), e.body_text())
}

async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }
    Err(Error::MissingUpload(UPLOAD_FIELD.to_string()))
}

pub async fn import_business_symptoms(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ImportResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| error_response(upload_error(e.status(), e.body_text())))?;
    let bytes = read_upload(&mut multipart).await.map_err(error_response)?;
    tracing::info!(bytes = bytes.len(), "Received CSV upload");

    let summary: ImportSummary = with_store(state, move |store, state| {
        Importer::new(store)
            .with_name_policy(state.name_policy)
            .import_bytes(&bytes)
    })
    .await
    .map_err(error_response)?;

    Ok(Json(ImportResponse {
        status: "import complete",
        rows_processed: summary.rows_processed,
    }))
}

pub async fn list_business_symptoms(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BusinessSymptomParams>,
) -> std::result::Result<Json<Vec<BusinessSymptomRecord>>, ApiError> {
    let filter = SymptomFilter::from_params(params.business_id.as_deref(), params.diagnostic.as_deref())
        .map_err(error_response)?;

    let records = with_store(state, move |store, _| QueryEngine::new(store).business_symptoms(&filter))
        .await
        .map_err(error_response)?;

    Ok(Json(records))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<DbStats>, ApiError> {
    let stats = with_store(state, |store, _| store.stats())
        .await
        .map_err(error_response)?;

    Ok(Json(stats))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
