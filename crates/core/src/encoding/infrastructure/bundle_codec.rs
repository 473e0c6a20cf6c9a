//! Binary persistence of [`EncodingBundle`] with bincode's serde bridge.

use thiserror::Error;

use crate::encoding::domain::encoding_bundle::EncodingBundle;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("bundle content is empty")]
    Empty,
    #[error("failed to decode bundle: {0}")]
    Decode(#[source] bincode::error::DecodeError),
    #[error("failed to encode bundle: {0}")]
    Encode(#[source] bincode::error::EncodeError),
    #[error("bundle has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("invalid bundle: {0}")]
    Invalid(String),
}

/// Serializes a bundle, refusing to write one that is empty or misaligned.
pub fn encode(bundle: &EncodingBundle) -> Result<Vec<u8>, CodecError> {
    bundle.validate().map_err(CodecError::Invalid)?;
    bincode::serde::encode_to_vec(bundle, bincode::config::standard()).map_err(CodecError::Encode)
}

/// Deserializes and validates a bundle.
pub fn decode(bytes: &[u8]) -> Result<EncodingBundle, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    let (bundle, read): (EncodingBundle, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(CodecError::Decode)?;
    if read != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - read));
    }
    bundle.validate().map_err(CodecError::Invalid)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_of(n: usize, name: &str) -> EncodingBundle {
        let mut bundle = EncodingBundle::new();
        for i in 0..n {
            bundle.push(vec![i as f32; 4], name);
        }
        bundle
    }

    #[test]
    fn test_decode_restores_encoded_bundle() {
        let bundle = bundle_of(3, "2101");
        let bytes = encode(&bundle).unwrap();
        assert_eq!(decode(&bytes).unwrap(), bundle);
    }

    #[test]
    fn test_encode_rejects_empty_bundle() {
        assert!(matches!(
            encode(&EncodingBundle::new()),
            Err(CodecError::Invalid(_))
        ));
    }

    #[test]
    fn test_decode_empty_content() {
        assert!(matches!(decode(&[]), Err(CodecError::Empty)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"definitely not a bundle").is_err());
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode(&bundle_of(2, "a")).unwrap();
        assert!(decode(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_decode_rejects_misaligned_fields() {
        #[derive(serde::Serialize)]
        struct Raw {
            encodings: Vec<Vec<f32>>,
            names: Vec<String>,
        }
        let raw = Raw {
            encodings: vec![vec![1.0], vec![2.0]],
            names: vec!["a".into()],
        };
        let bytes = bincode::serde::encode_to_vec(&raw, bincode::config::standard()).unwrap();
        assert!(matches!(decode(&bytes), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_mixed_dimensions() {
        #[derive(serde::Serialize)]
        struct Raw {
            encodings: Vec<Vec<f32>>,
            names: Vec<String>,
        }
        let raw = Raw {
            encodings: vec![vec![0.1; 512], vec![0.2; 128]],
            names: vec!["a".into(), "a".into()],
        };
        let bytes = bincode::serde::encode_to_vec(&raw, bincode::config::standard()).unwrap();
        assert!(matches!(decode(&bytes), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_missing_names_field() {
        #[derive(serde::Serialize)]
        struct OnlyEncodings {
            encodings: Vec<Vec<f32>>,
        }
        let raw = OnlyEncodings {
            encodings: vec![vec![1.0]],
        };
        let bytes = bincode::serde::encode_to_vec(&raw, bincode::config::standard()).unwrap();
        assert!(decode(&bytes).is_err());
    }
}
