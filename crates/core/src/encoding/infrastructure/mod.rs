pub mod arcface_embedder;
pub mod bundle_codec;
pub mod execution_provider;
pub mod math;
pub mod model_resolver;
pub mod onnx_embedding_oracle;
pub mod onnx_face_detector;
