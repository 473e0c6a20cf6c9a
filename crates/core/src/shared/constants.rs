pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

pub const DEFAULT_BUCKET: &str = "mira";

/// Root folder holding one sub-folder of photos per student.
pub const SUBJECT_ROOT: &str = "mahasiswa";

/// Folder (under [`SUBJECT_ROOT`]) holding merged class bundles.
pub const CLASS_MODEL_DIR: &str = "model";

pub const BUNDLE_EXTENSION: &str = "bin";

/// Source photo extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Page size for a single store listing call.
pub const LIST_LIMIT: usize = 1000;
