use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::storage::domain::blob_store::{BlobStore, StoreError};

/// Process-local object store standing in for the remote one in tests.
///
/// Individual keys can be made to fail, and every call is recorded so tests
/// can assert on side effects.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_downloads: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    failing_lists: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, content: impl Into<Vec<u8>>) {
        lock(&self.objects).insert(key.to_string(), content.into());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn fail_download(&self, key: &str) {
        lock(&self.failing_downloads).insert(key.to_string());
    }

    pub fn fail_upload(&self, key: &str) {
        lock(&self.failing_uploads).insert(key.to_string());
    }

    pub fn fail_list(&self, prefix: &str) {
        lock(&self.failing_lists).insert(prefix.to_string());
    }

    /// Calls made so far, as `"list:<prefix>"`, `"download:<key>"` or
    /// `"upload:<key>"`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("upload:").map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

impl BlobStore for MemoryBlobStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.record(format!("list:{prefix}"));
        if lock(&self.failing_lists).contains(prefix) {
            return Err(StoreError::Status {
                key: prefix.to_string(),
                status: 503,
                body: "injected list failure".to_string(),
            });
        }
        let folder = format!("{}/", prefix.trim_end_matches('/'));
        let mut names: Vec<String> = lock(&self.objects)
            .keys()
            .filter_map(|key| key.strip_prefix(&folder))
            .map(|rest| match rest.split_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => rest.to_string(),
            })
            .collect();
        names.dedup();
        Ok(names)
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.record(format!("download:{key}"));
        if lock(&self.failing_downloads).contains(key) {
            return Err(StoreError::Status {
                key: key.to_string(),
                status: 500,
                body: "injected download failure".to_string(),
            });
        }
        self.get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn upload(&self, key: &str, content: &[u8]) -> Result<(), StoreError> {
        self.record(format!("upload:{key}"));
        if lock(&self.failing_uploads).contains(key) {
            return Err(StoreError::Status {
                key: key.to_string(),
                status: 500,
                body: "injected upload failure".to_string(),
            });
        }
        self.insert(key, content);
        Ok(())
    }
}

/// Poisoning only follows a panic in another caller; the maps stay usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_returns_direct_children_sorted() {
        let store = MemoryBlobStore::new();
        store.insert("mahasiswa/2101/b.png", b"b".to_vec());
        store.insert("mahasiswa/2101/a.jpg", b"a".to_vec());
        store.insert("mahasiswa/2101/sub/c.jpg", b"c".to_vec());
        store.insert("mahasiswa/2101/sub/d.jpg", b"d".to_vec());
        store.insert("mahasiswa/21010/x.jpg", b"x".to_vec());

        let names = store.list("mahasiswa/2101").unwrap();
        assert_eq!(names, vec!["a.jpg", "b.png", "sub"]);
    }

    #[test]
    fn test_upload_overwrites() {
        let store = MemoryBlobStore::new();
        store.upload("k", b"one").unwrap();
        store.upload("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
        assert_eq!(store.keys(), vec!["k"]);
    }

    #[test]
    fn test_download_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.download("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_injected_failures_and_call_log() {
        let store = MemoryBlobStore::new();
        store.insert("k", b"v".to_vec());
        store.fail_download("k");
        store.fail_upload("u");
        store.fail_list("p");

        assert!(store.download("k").is_err());
        assert!(store.upload("u", b"x").is_err());
        assert!(store.list("p").is_err());
        assert_eq!(store.calls(), vec!["download:k", "upload:u", "list:p"]);
        assert_eq!(store.uploads(), vec!["u"]);
    }
}
