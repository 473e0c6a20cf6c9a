#[cfg(any(test, feature = "test-support"))]
pub mod memory_blob_store;
pub mod supabase_blob_store;
