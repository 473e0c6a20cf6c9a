use std::collections::HashSet;
use std::sync::Arc;

use crate::encoding::domain::encoding_bundle::EncodingBundle;
use crate::encoding::infrastructure::bundle_codec;
use crate::pipeline::deadline::Deadline;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_settings::PipelineSettings;
use crate::pipeline::workspace::Workspace;
use crate::shared::store_keys::{
    class_bundle_file_name, class_bundle_key, subject_bundle_file_name, subject_bundle_key,
    validate_segment,
};
use crate::storage::domain::blob_store::{BlobStore, StoreError};

/// Result of a successful [`MergeClassUseCase::execute`].
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub class_id: String,
    pub total_faces: usize,
    /// Subjects whose bundles were merged, in request order.
    pub processed: Vec<String>,
    /// Subjects whose bundles could not be used, in request order.
    pub failed: Vec<String>,
    pub store_path: String,
    pub uploaded: bool,
}

/// Concatenates per-subject bundles into one class bundle.
///
/// A subject whose bundle is missing, unreadable, or of a different vector
/// dimension than the subjects merged before it lands in `failed` and
/// contributes nothing; later subjects follow directly after the last
/// successful one.
pub struct MergeClassUseCase {
    store: Arc<dyn BlobStore>,
    settings: PipelineSettings,
}

impl MergeClassUseCase {
    pub fn new(store: Arc<dyn BlobStore>, settings: PipelineSettings) -> Self {
        Self { store, settings }
    }

    pub fn execute(
        &self,
        class_id: &str,
        subject_ids: &[String],
    ) -> Result<MergeOutcome, PipelineError> {
        if subject_ids.is_empty() {
            return Err(PipelineError::InvalidArgument(
                "nim_list must not be empty".to_string(),
            ));
        }
        validate_segment("kodeKelas", class_id).map_err(PipelineError::InvalidArgument)?;
        let deadline = Deadline::start(self.settings.deadline);

        let workspace = Workspace::create(&self.settings.workspace_root, class_id)
            .map_err(PipelineError::Workspace)?;
        log::info!(
            "[{}] Merging {} subjects into class {class_id}",
            workspace.invocation_id(),
            subject_ids.len()
        );

        let result = self.run(class_id, subject_ids, &workspace, &deadline);
        if let Err(e) = &result {
            log::error!(
                "[{}] Merging class {class_id} failed: {e}",
                workspace.invocation_id()
            );
        }
        result
    }

    fn run(
        &self,
        class_id: &str,
        subject_ids: &[String],
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<MergeOutcome, PipelineError> {
        let mut combined = EncodingBundle::new();
        let mut processed = Vec::new();
        let mut failed = Vec::new();
        let mut seen = HashSet::new();

        for subject_id in subject_ids {
            if !seen.insert(subject_id.as_str()) {
                log::warn!("Subject {subject_id} listed more than once; merging it once");
                continue;
            }
            deadline.check()?;
            match self.load_subject(subject_id, workspace) {
                Ok(bundle) => {
                    if let (Some(expected), Some(found)) = (combined.dimension(), bundle.dimension()) {
                        if found != expected {
                            log::warn!(
                                "[{}] Skipping {subject_id}: encodings have {found} dimensions, class has {expected}",
                                workspace.invocation_id()
                            );
                            failed.push(subject_id.clone());
                            continue;
                        }
                    }
                    log::info!(
                        "[{}] Loaded {} encodings for {subject_id}",
                        workspace.invocation_id(),
                        bundle.len()
                    );
                    combined.append(bundle);
                    processed.push(subject_id.clone());
                }
                Err(e) => {
                    log::warn!(
                        "[{}] Skipping {subject_id}: {e}",
                        workspace.invocation_id()
                    );
                    failed.push(subject_id.clone());
                }
            }
        }

        if combined.is_empty() {
            return Err(PipelineError::NoEncodingsMerged(class_id.to_string()));
        }

        let bytes = bundle_codec::encode(&combined)
            .map_err(|e| PipelineError::SerializationFailed(e.to_string()))?;
        let staged = workspace
            .stage(&class_bundle_file_name(class_id), &bytes)
            .map_err(PipelineError::Workspace)?;

        let store_path = class_bundle_key(class_id);
        deadline.check()?;
        self.store
            .upload(&store_path, &bytes)
            .map_err(|e| PipelineError::UploadFailed(e.to_string()))?;
        drop(staged);
        log::info!(
            "[{}] Uploaded {} encodings for class {class_id} to {store_path}",
            workspace.invocation_id(),
            combined.len()
        );

        Ok(MergeOutcome {
            class_id: class_id.to_string(),
            total_faces: combined.len(),
            processed,
            failed,
            store_path,
            uploaded: true,
        })
    }

    /// Download, stage, read back and validate one subject's bundle. The
    /// staged copy is gone when this returns.
    fn load_subject(
        &self,
        subject_id: &str,
        workspace: &Workspace,
    ) -> Result<EncodingBundle, PipelineError> {
        validate_segment("nim", subject_id).map_err(PipelineError::InvalidArgument)?;
        let key = subject_bundle_key(subject_id);
        let content = self.store.download(&key).map_err(|e| match e {
            StoreError::NotFound(key) => PipelineError::NotFound(key),
            other => PipelineError::StoreQueryFailed(other.to_string()),
        })?;

        let staged = workspace
            .stage(&subject_bundle_file_name(subject_id), &content)
            .map_err(PipelineError::Workspace)?;
        let bytes = staged.read().map_err(PipelineError::Workspace)?;
        drop(staged);

        bundle_codec::decode(&bytes)
            .map_err(|e| PipelineError::DeserializationInvalid(format!("{key}: {e}")))
    }
}
