//! Request-scoped local staging area.
//!
//! Each invocation gets its own directory named after the subject or class
//! plus a fresh invocation id, so concurrent requests for the same id never
//! share files. The directory and everything in it is removed on drop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::shared::store_keys::is_image_name;

pub struct Workspace {
    dir: TempDir,
    invocation_id: Uuid,
}

impl Workspace {
    /// Create `{root}/{label}-{invocation_id}-XXXXXX`, creating `root` if needed.
    pub fn create(root: &Path, label: &str) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let invocation_id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{label}-{invocation_id}-"))
            .tempdir_in(root)?;
        Ok(Self { dir, invocation_id })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Write `content` to `file_name` and return a guard that deletes it.
    pub fn stage(&self, file_name: &str, content: &[u8]) -> io::Result<StagedFile> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, content)?;
        Ok(StagedFile { path })
    }

    /// Write `content` to `file_name` and keep it until the workspace goes.
    pub fn write(&self, file_name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Image files currently in the workspace, sorted by name.
    pub fn image_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.dir.path())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if name.to_str().map(is_image_name).unwrap_or(false) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// A single staged file, removed when the guard is dropped.
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), "2101").unwrap();
        let path = ws.path().to_path_buf();
        ws.write("a.jpg", b"x").unwrap();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_same_label_gets_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path(), "2101").unwrap();
        let b = Workspace::create(root.path(), "2101").unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.invocation_id(), b.invocation_id());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("2101-"));
    }

    #[test]
    fn test_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let ws = Workspace::create(&nested, "x").unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[test]
    fn test_staged_file_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), "CS101").unwrap();
        let staged = ws.stage("bundle.bin", b"data").unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(staged.read().unwrap(), b"data");
        drop(staged);
        assert!(!path.exists());
        assert!(ws.path().exists());
    }

    #[test]
    fn test_image_files_filters_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), "2101").unwrap();
        ws.write("b.PNG", b"x").unwrap();
        ws.write("a.jpg", b"x").unwrap();
        ws.write("notes.txt", b"x").unwrap();
        ws.write("2101_encoding.bin", b"x").unwrap();
        fs::create_dir(ws.path().join("dir.jpg")).unwrap();

        let names: Vec<String> = ws
            .image_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG"]);
    }
}
