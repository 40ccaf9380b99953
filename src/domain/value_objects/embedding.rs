//! Embedding Value Object
//!
//! A fixed-length face embedding vector tagged with the model family that
//! produced it. Dlib-style (FaceNet) embeddings are 128-D and compared by
//! Euclidean distance; ArcFace-style embeddings are 512-D and compared by
//! cosine similarity. Embeddings of different kinds are never compared.
//!
//! References:
//! - FaceNet: https://arxiv.org/abs/1503.03832
//! - ArcFace: https://arxiv.org/abs/1801.07698

use serde::{Deserialize, Serialize};

/// Discriminates the model family (and therefore dimensionality and metric)
/// an embedding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// 128-D, FaceNet/Dlib-style, compared by Euclidean distance.
    Dlib,
    /// 512-D, ArcFace-style, compared by cosine similarity (assumes
    /// L2-normalised inputs).
    ArcFace,
}

impl EmbeddingKind {
    /// Expected vector length for this kind.
    pub const fn dimension(self) -> usize {
        match self {
            EmbeddingKind::Dlib => 128,
            EmbeddingKind::ArcFace => 512,
        }
    }
}

/// A face embedding vector carrying its kind tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    kind: EmbeddingKind,
    values: Vec<f32>,
}

/// Returned when an embedding is constructed with a length that does not
/// match its declared kind.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?} embedding must have {expected} dimensions, got {actual}")]
pub struct DimensionMismatch {
    pub kind: EmbeddingKind,
    pub expected: usize,
    pub actual: usize,
}

impl Embedding {
    /// Creates a new embedding, validating the vector length against `kind`.
    pub fn new(kind: EmbeddingKind, values: Vec<f32>) -> Result<Self, DimensionMismatch> {
        if values.len() != kind.dimension() {
            return Err(DimensionMismatch {
                kind,
                expected: kind.dimension(),
                actual: values.len(),
            });
        }
        Ok(Self { kind, values })
    }

    pub fn kind(&self) -> EmbeddingKind {
        self.kind
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Euclidean (L2) distance to another embedding of the same kind.
    /// Lower values indicate more similar faces.
    pub fn distance(&self, other: &Embedding) -> Option<f32> {
        if self.kind != other.kind {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt(),
        )
    }

    /// Cosine similarity to another embedding of the same kind.
    /// Higher values indicate more similar faces (range: -1 to 1).
    pub fn cosine_similarity(&self, other: &Embedding) -> Option<f32> {
        if self.kind != other.kind {
            return None;
        }

        let dot: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();

        let mag_self = self.values.iter().map(|v| v.powi(2)).sum::<f32>().sqrt();
        let mag_other = other.values.iter().map(|v| v.powi(2)).sum::<f32>().sqrt();

        if mag_self == 0.0 || mag_other == 0.0 {
            return Some(0.0);
        }

        Some(dot / (mag_self * mag_other))
    }

    /// Returns an L2-normalised copy of this embedding.
    pub fn normalized(&self) -> Self {
        let magnitude = self.values.iter().map(|v| v.powi(2)).sum::<f32>().sqrt();
        let values = if magnitude > 0.0 {
            self.values.iter().map(|v| v / magnitude).collect()
        } else {
            self.values.clone()
        };
        Self {
            kind: self.kind,
            values,
        }
    }
}
