pub mod blob_store;
