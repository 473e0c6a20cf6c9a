pub mod embedding_oracle;
pub mod encoding_bundle;
