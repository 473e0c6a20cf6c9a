//! Object-store key layout.
//!
//! ```text
//! mahasiswa/{subject}/{photo}.jpg|jpeg|png   source photos
//! mahasiswa/{subject}/{subject}_encoding.bin per-subject bundle
//! mahasiswa/model/{class}.bin                merged class bundle
//! ```

use crate::shared::constants::{
    BUNDLE_EXTENSION, CLASS_MODEL_DIR, IMAGE_EXTENSIONS, SUBJECT_ROOT,
};

/// Folder holding a subject's photos and its bundle.
pub fn subject_prefix(subject_id: &str) -> String {
    format!("{SUBJECT_ROOT}/{subject_id}")
}

pub fn subject_photo_key(subject_id: &str, file_name: &str) -> String {
    format!("{}/{file_name}", subject_prefix(subject_id))
}

pub fn subject_bundle_file_name(subject_id: &str) -> String {
    format!("{subject_id}_encoding.{BUNDLE_EXTENSION}")
}

pub fn subject_bundle_key(subject_id: &str) -> String {
    format!(
        "{}/{}",
        subject_prefix(subject_id),
        subject_bundle_file_name(subject_id)
    )
}

pub fn class_bundle_file_name(class_id: &str) -> String {
    format!("{class_id}.{BUNDLE_EXTENSION}")
}

pub fn class_bundle_key(class_id: &str) -> String {
    format!(
        "{SUBJECT_ROOT}/{CLASS_MODEL_DIR}/{}",
        class_bundle_file_name(class_id)
    )
}

/// True when `name` ends in one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn is_image_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Checks that an id can serve as a single key segment.
///
/// Ids are otherwise opaque; only emptiness, path separators and control
/// characters are refused.
pub fn validate_segment(kind: &str, id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err(format!("{kind} must not be empty"));
    }
    if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
        return Err(format!("{kind} '{id}' is not a valid path segment"));
    }
    if id.chars().any(char::is_control) {
        return Err(format!("{kind} {id:?} contains control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_subject_keys() {
        assert_eq!(subject_prefix("2101"), "mahasiswa/2101");
        assert_eq!(subject_photo_key("2101", "a.jpg"), "mahasiswa/2101/a.jpg");
        assert_eq!(
            subject_bundle_key("2101"),
            "mahasiswa/2101/2101_encoding.bin"
        );
    }

    #[test]
    fn test_class_bundle_key() {
        assert_eq!(class_bundle_key("CS101"), "mahasiswa/model/CS101.bin");
    }

    #[rstest]
    #[case::jpg("face.jpg", true)]
    #[case::jpeg_upper("FACE.JPEG", true)]
    #[case::png_mixed("face.PnG", true)]
    #[case::bundle("2101_encoding.bin", false)]
    #[case::gif("face.gif", false)]
    #[case::no_extension("jpg", false)]
    #[case::bare_extension(".jpg", true)]
    #[case::placeholder(".emptyFolderPlaceholder", false)]
    fn test_is_image_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image_name(name), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::slash("a/b")]
    #[case::backslash("a\\b")]
    #[case::parent("..")]
    #[case::nul("2101\0")]
    #[case::newline("2101\n")]
    fn test_validate_segment_rejects(#[case] id: &str) {
        assert!(validate_segment("nim", id).is_err());
    }

    #[test]
    fn test_validate_segment_accepts_opaque_ids() {
        assert!(validate_segment("nim", "2101-A.01").is_ok());
    }
}
