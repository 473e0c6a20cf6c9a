pub mod constants;
pub mod store_keys;
