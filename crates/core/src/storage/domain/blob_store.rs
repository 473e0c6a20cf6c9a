use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("request to object store failed for {key}: {source}")]
    Request {
        key: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("object store returned {status} for {key}: {body}")]
    Status {
        key: String,
        status: u16,
        body: String,
    },
    #[error("unexpected object store response for {key}: {reason}")]
    Response { key: String, reason: String },
}

/// Domain interface for the remote object store holding photos and bundles.
///
/// Keys are `/`-separated paths inside one bucket. `list` returns entry
/// names relative to `prefix`, sorted ascending. `upload` overwrites any
/// existing object at `key`.
pub trait BlobStore: Send + Sync {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    fn upload(&self, key: &str, content: &[u8]) -> Result<(), StoreError>;
}
