/// ArcFace face embedder using ONNX Runtime.
///
/// Produces an L2-normalised identity vector (512-d for `w600k_r50`) from
/// an RGB face crop.
use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;

use super::execution_provider::open_session;
use super::math::l2_normalize;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: Mutex::new(open_session(model_path)?),
        })
    }

    pub fn embed(&self, crop: &RgbImage) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err("Cannot embed an empty face crop".into());
        }
        let tensor = preprocess(crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(crop: &RgbImage) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let pixel = crop.get_pixel(src_x as u32, src_y as u32);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (pixel[c] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}
