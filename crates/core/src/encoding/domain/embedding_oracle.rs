use image::RgbImage;

/// Domain interface for face-embedding extraction.
///
/// Returns one fixed-length vector per detected face, most confident
/// first; an empty result means no face was found. Shared across
/// requests, hence `&self` and `Send + Sync`.
pub trait EmbeddingOracle: Send + Sync {
    fn extract(&self, image: &RgbImage) -> Result<Vec<Vec<f32>>, Box<dyn std::error::Error>>;
}
