/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Letterboxes the photo, runs inference, filters by confidence and applies
/// greedy NMS. Faces come back most confident first.
use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;

use super::execution_provider::open_session;
use super::math::bbox_iou;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// A detected face in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl FaceBox {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Clamp to the image and return `(x, y, width, height)`, or `None` when
    /// nothing of the box lies inside it.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.max(0.0).floor() as u32;
        let y1 = self.y1.max(0.0).floor() as u32;
        let x2 = (self.x2.min(width as f64).ceil().max(0.0) as u32).min(width);
        let y2 = (self.y2.min(height as f64).ceil().max(0.0) as u32).min(height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

pub struct OnnxFaceDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }

    pub fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, geometry) = letterbox(image, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_detections(data, &shape, self.confidence, &geometry)?;
        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to the source image.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize an image to `target_size` × `target_size`, NCHW float32.
fn letterbox(image: &RgbImage, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = image.width() as f64;
    let fh = image.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src_w = image.width();
    let src_h = image.height();

    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as u32).min(src_h - 1);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as u32).min(src_w - 1);
            let pixel = image.get_pixel(src_x, src_y);
            let ty = (pad_y + y) as usize;
            let tx = (pad_x + x) as usize;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decode raw YOLO rows (`[cx, cy, w, h, conf, keypoints...]`) above the
/// confidence threshold. Accepts both `[1, features, detections]` and
/// `[1, detections, features]` layouts.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    geometry: &Letterbox,
) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(format!("YOLO output too small for shape {shape:?}").into());
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut faces = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = geometry.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_source(cx + w / 2.0, cy + h / 2.0);
        faces.push(FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
        });
    }
    Ok(faces)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [FaceBox], iou_thresh: f64) -> Vec<FaceBox> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i]);
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i].corners(), &dets[j].corners()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → scale 3.2, content 640x320, pad_y 160
        let image = RgbImage::from_pixel(200, 100, image::Rgb([128, 128, 128]));
        let (tensor, geometry) = letterbox(&image, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(geometry.scale, 3.2, epsilon = 0.01);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let image = RgbImage::from_pixel(100, 50, image::Rgb([255, 255, 255]));
        let (tensor, geometry) = letterbox(&image, 640);

        let y = geometry.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_maps_back_to_source() {
        let image = RgbImage::new(200, 100);
        let (_, geometry) = letterbox(&image, 640);
        let (x, y) = geometry.to_source(320.0, 320.0);
        assert_relative_eq!(x, 100.0, epsilon = 0.01);
        assert_relative_eq!(y, 50.0, epsilon = 0.01);
    }

    #[test]
    fn test_parse_detections_row_major() {
        // 6 detections x 5 features, only the first is confident
        let mut data = vec![
            50.0, 50.0, 20.0, 20.0, 0.9, //
            10.0, 10.0, 4.0, 4.0, 0.1,
        ];
        data.extend(std::iter::repeat(0.0).take(20));
        let faces = parse_detections(&data, &[1, 6, 5], 0.5, &identity()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_relative_eq!(faces[0].x1, 40.0);
        assert_relative_eq!(faces[0].y2, 60.0);
    }

    #[test]
    fn test_parse_detections_transposed() {
        // 5 features x 8 detections, only detection 3 is confident
        let num_dets = 8;
        let mut data = vec![0.0f32; 5 * num_dets];
        data[3] = 100.0; // cx
        data[num_dets + 3] = 80.0; // cy
        data[2 * num_dets + 3] = 10.0; // w
        data[3 * num_dets + 3] = 20.0; // h
        data[4 * num_dets + 3] = 0.8; // conf
        let faces = parse_detections(&data, &[1, 5, num_dets], 0.5, &identity()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_relative_eq!(faces[0].x1, 95.0);
        assert_relative_eq!(faces[0].y1, 70.0);
        assert_relative_eq!(faces[0].confidence, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_detections_bad_shape() {
        assert!(parse_detections(&[0.0; 4], &[4], 0.5, &identity()).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.8),
            face(5.0, 5.0, 105.0, 105.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_orders_by_confidence() {
        let mut dets = vec![
            face(0.0, 0.0, 50.0, 50.0, 0.6),
            face(200.0, 200.0, 250.0, 250.0, 0.95),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].confidence, 0.95);
    }

    #[test]
    fn test_clamp_to_image() {
        let b = face(-10.0, 5.0, 50.0, 500.0, 0.9);
        assert_eq!(b.clamp_to(40, 100), Some((0, 5, 40, 95)));
    }

    #[test]
    fn test_clamp_outside_image() {
        let b = face(100.0, 100.0, 120.0, 120.0, 0.9);
        assert_eq!(b.clamp_to(40, 40), None);
    }
}
