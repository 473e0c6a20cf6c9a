use std::path::PathBuf;
use std::time::Duration;

/// Knobs shared by both pipelines.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Directory under which per-invocation workspaces are created.
    pub workspace_root: PathBuf,
    /// Overall budget per invocation; `None` disables the check.
    pub deadline: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("mira-encoder"),
            deadline: Some(Duration::from_secs(300)),
        }
    }
}
