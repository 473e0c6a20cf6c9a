use serde::{Deserialize, Serialize};

/// Index-aligned face embeddings and the subject id each one belongs to.
///
/// `names[i]` identifies the subject whose photo produced `encodings[i]`.
/// Field names are part of the persisted format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingBundle {
    encodings: Vec<Vec<f32>>,
    names: Vec<String>,
}

impl EncodingBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, encoding: Vec<f32>, name: &str) {
        self.encodings.push(encoding);
        self.names.push(name.to_string());
    }

    /// Appends every entry of `other`, keeping its order.
    pub fn append(&mut self, other: EncodingBundle) {
        self.encodings.extend(other.encodings);
        self.names.extend(other.names);
    }

    pub fn encodings(&self) -> &[Vec<f32>] {
        &self.encodings
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Length of the first vector; `None` for an empty bundle.
    pub fn dimension(&self) -> Option<usize> {
        self.encodings.first().map(Vec::len)
    }

    /// A persistable bundle is aligned, non-empty and holds vectors of a
    /// single dimension.
    pub fn validate(&self) -> Result<(), String> {
        if self.encodings.len() != self.names.len() {
            return Err(format!(
                "bundle has {} encodings but {} names",
                self.encodings.len(),
                self.names.len()
            ));
        }
        if self.is_empty() {
            return Err("bundle contains no encodings".to_string());
        }
        if let Some(dim) = self.dimension() {
            if let Some(i) = self.encodings.iter().position(|v| v.len() != dim) {
                return Err(format!(
                    "encoding {i} has {} dimensions, expected {dim}",
                    self.encodings[i].len()
                ));
            }
        }
        Ok(())
    }
}
