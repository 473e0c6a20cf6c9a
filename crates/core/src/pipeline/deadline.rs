use std::time::{Duration, Instant};

use crate::pipeline::pipeline_error::PipelineError;

/// Overall time budget for one pipeline invocation.
///
/// Checked before every store or model call; a call already in flight is
/// bounded by the store client's own timeout.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn check(&self) -> Result<(), PipelineError> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => {
                Err(PipelineError::DeadlineExceeded(limit))
            }
            _ => Ok(()),
        }
    }
}
