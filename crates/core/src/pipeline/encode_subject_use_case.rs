use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::encoding::domain::embedding_oracle::EmbeddingOracle;
use crate::encoding::domain::encoding_bundle::EncodingBundle;
use crate::encoding::infrastructure::bundle_codec;
use crate::pipeline::deadline::Deadline;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_settings::PipelineSettings;
use crate::pipeline::workspace::Workspace;
use crate::shared::store_keys::{
    is_image_name, subject_bundle_file_name, subject_bundle_key, subject_photo_key,
    subject_prefix, validate_segment,
};
use crate::storage::domain::blob_store::{BlobStore, StoreError};

/// Result of a successful [`EncodeSubjectUseCase::execute`].
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeOutcome {
    pub subject_id: String,
    pub encoded_faces: usize,
    /// Photos that were decoded and handed to the oracle.
    pub images_processed: usize,
    /// Where the bundle was staged before upload; gone once the call returns.
    pub local_output_file: PathBuf,
    pub store_path: String,
    pub uploaded: bool,
}

/// Per-subject pipeline: list → download → decode → embed → serialize →
/// upload, all inside a throwaway workspace.
///
/// Single photos that fail to download, decode or embed are skipped.
/// The request fails only when nothing usable is left, or when the
/// bundle cannot be stored.
pub struct EncodeSubjectUseCase {
    store: Arc<dyn BlobStore>,
    oracle: Arc<dyn EmbeddingOracle>,
    settings: PipelineSettings,
}

impl EncodeSubjectUseCase {
    pub fn new(
        store: Arc<dyn BlobStore>,
        oracle: Arc<dyn EmbeddingOracle>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            oracle,
            settings,
        }
    }

    pub fn execute(&self, subject_id: &str) -> Result<EncodeOutcome, PipelineError> {
        validate_segment("nim", subject_id).map_err(PipelineError::InvalidArgument)?;
        let deadline = Deadline::start(self.settings.deadline);

        let workspace = Workspace::create(&self.settings.workspace_root, subject_id)
            .map_err(PipelineError::Workspace)?;
        log::info!(
            "[{}] Encoding subject {subject_id}",
            workspace.invocation_id()
        );

        let result = self.run(subject_id, &workspace, &deadline);
        if let Err(e) = &result {
            log::error!(
                "[{}] Encoding {subject_id} failed: {e}",
                workspace.invocation_id()
            );
        }
        result
    }

    fn run(
        &self,
        subject_id: &str,
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<EncodeOutcome, PipelineError> {
        self.download_photos(subject_id, workspace, deadline)?;

        let photos = workspace.image_files().map_err(PipelineError::Workspace)?;
        if photos.is_empty() {
            return Err(PipelineError::NoValidImages(subject_id.to_string()));
        }

        let bundle = self.encode_photos(subject_id, &photos, workspace, deadline)?;
        if bundle.is_empty() {
            return Err(PipelineError::NoFacesDetected(subject_id.to_string()));
        }

        let bytes = bundle_codec::encode(&bundle)
            .map_err(|e| PipelineError::SerializationFailed(e.to_string()))?;
        let local_output_file = workspace
            .write(&subject_bundle_file_name(subject_id), &bytes)
            .map_err(PipelineError::Workspace)?;

        let store_path = subject_bundle_key(subject_id);
        deadline.check()?;
        self.store
            .upload(&store_path, &bytes)
            .map_err(|e| PipelineError::UploadFailed(e.to_string()))?;
        log::info!(
            "[{}] Uploaded {} encodings for {subject_id} to {store_path}",
            workspace.invocation_id(),
            bundle.len()
        );

        Ok(EncodeOutcome {
            subject_id: subject_id.to_string(),
            encoded_faces: bundle.len(),
            images_processed: photos.len(),
            local_output_file,
            store_path,
            uploaded: true,
        })
    }

    /// Fetch every photo under the subject's folder into the workspace.
    fn download_photos(
        &self,
        subject_id: &str,
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<(), PipelineError> {
        let prefix = subject_prefix(subject_id);
        deadline.check()?;
        let names = self.store.list(&prefix).map_err(|e| match e {
            StoreError::NotFound(_) => PipelineError::NotFound(format!("no files under {prefix}")),
            other => PipelineError::StoreQueryFailed(other.to_string()),
        })?;
        if names.is_empty() {
            return Err(PipelineError::NotFound(format!("no files under {prefix}")));
        }

        for name in names.iter().filter(|n| is_image_name(n)) {
            deadline.check()?;
            let key = subject_photo_key(subject_id, name);
            match self.store.download(&key) {
                Ok(content) => {
                    if let Err(e) = workspace.write(name, &content) {
                        log::warn!("Failed to stage {key}: {e}");
                    }
                }
                Err(e) => log::warn!("Failed to download {key}: {e}"),
            }
        }
        Ok(())
    }

    fn encode_photos(
        &self,
        subject_id: &str,
        photos: &[PathBuf],
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<EncodingBundle, PipelineError> {
        let mut bundle = EncodingBundle::new();
        let total = photos.len();

        for (i, photo) in photos.iter().enumerate() {
            deadline.check()?;
            log::info!(
                "[{}] Encoding {subject_id}: {}/{total}",
                workspace.invocation_id(),
                i + 1
            );
            let name = display_name(photo);
            match self.first_face(photo) {
                Ok(Some(vector)) => {
                    if let Some(expected) = bundle.encodings().first().map(Vec::len) {
                        if vector.len() != expected {
                            log::warn!(
                                "Embedding for {name} has {} dimensions, expected {expected}",
                                vector.len()
                            );
                            continue;
                        }
                    }
                    bundle.push(vector, subject_id);
                }
                Ok(None) => log::warn!("No face detected in {name}"),
                Err(e) => log::warn!("Failed to encode {name}: {e}"),
            }
        }
        Ok(bundle)
    }

    /// Decode one photo and keep the oracle's first vector.
    fn first_face(&self, photo: &Path) -> Result<Option<Vec<f32>>, Box<dyn std::error::Error>> {
        let image = image::ImageReader::open(photo)?
            .with_guessed_format()?
            .decode()?
            .to_rgb8();
        let vectors = self.oracle.extract(&image)?;
        if vectors.len() > 1 {
            log::debug!(
                "{} faces in {}, keeping the first",
                vectors.len(),
                display_name(photo)
            );
        }
        Ok(vectors.into_iter().next().filter(|v| !v.is_empty()))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
