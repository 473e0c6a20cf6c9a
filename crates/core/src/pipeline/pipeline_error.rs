use thiserror::Error;

/// Whole-request failures of the encode and merge pipelines.
///
/// Per-item problems (one photo, one subject's bundle) never show up here;
/// they are logged and reflected in the outcome counts instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to query object store: {0}")]
    StoreQueryFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no valid image files found for {0}")]
    NoValidImages(String),
    #[error("no faces could be encoded for {0}")]
    NoFacesDetected(String),
    #[error("invalid bundle: {0}")]
    DeserializationInvalid(String),
    #[error("failed to serialize bundle: {0}")]
    SerializationFailed(String),
    #[error("no encodings could be merged for class {0}")]
    NoEncodingsMerged(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("embedding model unavailable: {0}")]
    OracleUnavailable(String),
    #[error("local workspace error: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("request deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),
}

impl PipelineError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidArgument(_) => "invalid_argument",
            PipelineError::StoreQueryFailed(_) => "store_query_failed",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::NoValidImages(_) => "no_valid_images",
            PipelineError::NoFacesDetected(_) => "no_faces_detected",
            PipelineError::DeserializationInvalid(_) => "deserialization_invalid",
            PipelineError::SerializationFailed(_) => "serialization_failed",
            PipelineError::NoEncodingsMerged(_) => "no_encodings_merged",
            PipelineError::UploadFailed(_) => "upload_failed",
            PipelineError::OracleUnavailable(_) => "oracle_unavailable",
            PipelineError::Workspace(_) => "workspace",
            PipelineError::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }

    /// Whether repeating the same request may succeed without any change
    /// to the stored data.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::StoreQueryFailed(_)
                | PipelineError::UploadFailed(_)
                | PipelineError::Workspace(_)
                | PipelineError::DeadlineExceeded(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::store(PipelineError::StoreQueryFailed("503".into()), true)]
    #[case::upload(PipelineError::UploadFailed("x".into()), true)]
    #[case::missing(PipelineError::NotFound("x".into()), false)]
    #[case::no_faces(PipelineError::NoFacesDetected("x".into()), false)]
    fn test_retryable(#[case] error: PipelineError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn test_display_includes_detail() {
        let error = PipelineError::NoValidImages("2101".into());
        assert_eq!(error.to_string(), "no valid image files found for 2101");
        assert_eq!(error.kind(), "no_valid_images");
    }
}
