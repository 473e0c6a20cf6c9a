//! HTTP endpoints of the encoder service.
//!
//! Endpoints:
//! - POST /encode          - encode one student's photos into a bundle
//! - POST /merge-encodings - merge student bundles into a class bundle
//! - GET  /health          - liveness and model status

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use mira_encoder_core::encoding::domain::embedding_oracle::EmbeddingOracle;
use mira_encoder_core::pipeline::encode_subject_use_case::EncodeSubjectUseCase;
use mira_encoder_core::pipeline::merge_class_use_case::MergeClassUseCase;
use mira_encoder_core::pipeline::pipeline_error::PipelineError;
use mira_encoder_core::pipeline::pipeline_settings::PipelineSettings;
use mira_encoder_core::shared::store_keys::validate_segment;
use mira_encoder_core::storage::domain::blob_store::BlobStore;

use crate::error::ApiError;

/// Loaded embedding oracle, or the reason it could not be loaded.
pub type OracleHandle = Result<Arc<dyn EmbeddingOracle>, String>;

/// Combined application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub oracle: OracleHandle,
    pub settings: PipelineSettings,
}

/// Build the axum router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/encode", post(encode))
        .route("/merge-encodings", post(merge_encodings))
        .route("/health", get(health))
        .with_state(state)
}

// ── Request / Response types ────────────────────────────────────────

#[derive(Deserialize)]
pub struct EncodeRequest {
    pub nim: String,
}

#[derive(Serialize)]
pub struct EncodeResponse {
    pub message: String,
    pub encoded_faces: usize,
    pub local_output_file: String,
    pub supabase_output_path: String,
    pub uploaded_to_supabase: bool,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    #[serde(rename = "kodeKelas")]
    pub class_id: String,
    pub nim_list: Vec<String>,
}

#[derive(Serialize)]
pub struct MergeResponse {
    pub message: String,
    pub total_encoded_faces: usize,
    pub nims_processed: Vec<String>,
    pub nims_failed: Vec<String>,
    pub supabase_combined_file_path_model: String,
    pub uploaded_to_supabase_model: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub oracle_ready: bool,
}

// ── Handlers ────────────────────────────────────────────────────────

async fn encode(
    State(state): State<AppState>,
    payload: Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<Json<EncodeResponse>, ApiError> {
    let Json(req) = payload?;
    validate_segment("nim", &req.nim).map_err(PipelineError::InvalidArgument)?;
    let oracle = state
        .oracle
        .clone()
        .map_err(PipelineError::OracleUnavailable)?;
    let use_case = EncodeSubjectUseCase::new(state.store.clone(), oracle, state.settings.clone());

    let outcome = run_blocking(move || use_case.execute(&req.nim)).await?;

    Ok(Json(EncodeResponse {
        message: format!(
            "Encoding finished for NIM {} ({} faces from {} images)",
            outcome.subject_id, outcome.encoded_faces, outcome.images_processed
        ),
        encoded_faces: outcome.encoded_faces,
        local_output_file: outcome.local_output_file.display().to_string(),
        supabase_output_path: outcome.store_path,
        uploaded_to_supabase: outcome.uploaded,
    }))
}

async fn merge_encodings(
    State(state): State<AppState>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<MergeResponse>, ApiError> {
    let Json(req) = payload?;
    let use_case = MergeClassUseCase::new(state.store.clone(), state.settings.clone());

    let outcome = run_blocking(move || use_case.execute(&req.class_id, &req.nim_list)).await?;

    Ok(Json(MergeResponse {
        message: format!(
            "Merged {} encodings from {} students into class {}",
            outcome.total_faces,
            outcome.processed.len(),
            outcome.class_id
        ),
        total_encoded_faces: outcome.total_faces,
        nims_processed: outcome.processed,
        nims_failed: outcome.failed,
        supabase_combined_file_path_model: outcome.store_path,
        uploaded_to_supabase_model: outcome.uploaded,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        oracle_ready: state.oracle.is_ok(),
    })
}

/// Pipelines do blocking I/O and inference; keep them off the async workers.
async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))?
        .map_err(ApiError::from)
}
