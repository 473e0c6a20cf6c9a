//! Error responses of the HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use mira_encoder_core::pipeline::pipeline_error::PipelineError;

/// Application-level error type.
#[derive(Debug)]
pub enum ApiError {
    /// The pipeline rejected or failed the request.
    Pipeline(PipelineError),
    /// The request body could not be deserialized.
    BadBody { status: StatusCode, detail: String },
    /// The blocking task running the pipeline died.
    Internal(String),
}

/// JSON body returned on error. `detail` carries the message callers show.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(e) => status_for_error(e),
            ApiError::BadBody { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Pipeline(e) => e.kind(),
            ApiError::BadBody { .. } => "invalid_body",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            kind: self.kind(),
            detail: match self {
                ApiError::Pipeline(e) => e.to_string(),
                ApiError::BadBody { detail, .. } => detail,
                ApiError::Internal(msg) => msg,
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

fn status_for_error(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::NotFound(_) | PipelineError::StoreQueryFailed(_) => StatusCode::NOT_FOUND,
        PipelineError::InvalidArgument(_)
        | PipelineError::NoValidImages(_)
        | PipelineError::NoEncodingsMerged(_) => StatusCode::BAD_REQUEST,
        PipelineError::NoFacesDetected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::DeserializationInvalid(_)
        | PipelineError::SerializationFailed(_)
        | PipelineError::UploadFailed(_)
        | PipelineError::OracleUnavailable(_)
        | PipelineError::Workspace(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}
