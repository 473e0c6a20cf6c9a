//! Face-encoding pipelines for the Mira attendance system.
//!
//! - [`pipeline::encode_subject_use_case`] turns a student's photos into a
//!   persisted embedding bundle.
//! - [`pipeline::merge_class_use_case`] concatenates student bundles into a
//!   class bundle.
//!
//! Both talk to the object store through [`storage::domain::blob_store::BlobStore`]
//! and to the face model through
//! [`encoding::domain::embedding_oracle::EmbeddingOracle`].

pub mod encoding;
pub mod pipeline;
pub mod shared;
pub mod storage;
