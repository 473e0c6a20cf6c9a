use std::path::Path;

use image::RgbImage;

use crate::encoding::domain::embedding_oracle::EmbeddingOracle;

use super::arcface_embedder::ArcFaceEmbedder;
use super::onnx_face_detector::{FaceBox, OnnxFaceDetector};

/// Embedding oracle backed by the YOLO face detector and ArcFace.
///
/// Each detected face is cut out as a square around its box and embedded;
/// vectors follow detection order.
pub struct OnnxEmbeddingOracle {
    detector: OnnxFaceDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxEmbeddingOracle {
    pub fn new(
        detector_model: &Path,
        embedding_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: OnnxFaceDetector::new(detector_model, confidence)?,
            embedder: ArcFaceEmbedder::new(embedding_model)?,
        })
    }
}

impl EmbeddingOracle for OnnxEmbeddingOracle {
    fn extract(&self, image: &RgbImage) -> Result<Vec<Vec<f32>>, Box<dyn std::error::Error>> {
        let faces = self.detector.detect(image)?;
        let mut vectors = Vec::with_capacity(faces.len());
        for face in &faces {
            let Some(crop) = square_crop(image, face) else {
                continue;
            };
            vectors.push(self.embedder.embed(&crop)?);
        }
        Ok(vectors)
    }
}

/// Square crop centred on the face, side = the longer box edge, clamped to
/// the image.
fn square_crop(image: &RgbImage, face: &FaceBox) -> Option<RgbImage> {
    let cx = (face.x1 + face.x2) / 2.0;
    let cy = (face.y1 + face.y2) / 2.0;
    let half = (face.x2 - face.x1).max(face.y2 - face.y1) / 2.0;
    let square = FaceBox {
        x1: cx - half,
        y1: cy - half,
        x2: cx + half,
        y2: cy + half,
        confidence: face.confidence,
    };
    let (x, y, w, h) = square.clamp_to(image.width(), image.height())?;
    Some(image::imageops::crop_imm(image, x, y, w, h).to_image())
}
