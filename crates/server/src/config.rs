//! Runtime configuration of the encoder service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mira_encoder_core::encoding::infrastructure::onnx_face_detector::DEFAULT_CONFIDENCE;
use mira_encoder_core::pipeline::pipeline_settings::PipelineSettings;
use mira_encoder_core::shared::constants::DEFAULT_BUCKET;
use mira_encoder_core::storage::infrastructure::supabase_blob_store::DEFAULT_TIMEOUT;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP listen address.
    pub bind: SocketAddr,
    /// Supabase project URL, e.g. `https://<ref>.supabase.co`.
    pub supabase_url: String,
    /// Service key used for storage requests.
    pub supabase_key: String,
    pub bucket: String,
    /// Root for per-request workspaces.
    pub workspace_dir: PathBuf,
    /// Directory with pre-fetched face models, checked after the user cache.
    pub model_dir: Option<PathBuf>,
    /// Bound on every single storage request.
    pub store_timeout: Duration,
    /// Bound on a whole encode or merge request; `None` disables it.
    pub request_deadline: Option<Duration>,
    /// Face detection confidence threshold.
    pub confidence: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            supabase_url: String::new(),
            supabase_key: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            workspace_dir: pipeline.workspace_root,
            model_dir: None,
            store_timeout: DEFAULT_TIMEOUT,
            request_deadline: pipeline.deadline,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.supabase_url.trim().is_empty() {
            return Err("Supabase URL is required (--supabase-url or SUPABASE_URL)".into());
        }
        if !self.supabase_url.starts_with("http://") && !self.supabase_url.starts_with("https://")
        {
            return Err(format!(
                "Supabase URL must start with http:// or https://, got {}",
                self.supabase_url
            )
            .into());
        }
        if self.supabase_key.trim().is_empty() {
            return Err("Supabase key is required (--supabase-key or SUPABASE_KEY)".into());
        }
        if self.bucket.trim().is_empty() || self.bucket.contains('/') {
            return Err(format!("Invalid bucket name: {:?}", self.bucket).into());
        }
        if self.store_timeout.is_zero() {
            return Err("Store timeout must be greater than zero".into());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )
            .into());
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            workspace_root: self.workspace_dir.clone(),
            deadline: self.request_deadline,
        }
    }
}
