//! Face Entity
//!
//! A detected face within one frame. A `Face` references its frame by box
//! only — it does not own frame pixels.

use crate::domain::value_objects::{BoundingBox, Embedding};

/// A single face detected by a [`crate::domain::ports::FaceModel`].
#[derive(Debug, Clone)]
pub struct Face {
    box_: BoundingBox,
    /// Present when the detector computes an embedding during detection
    /// (ArcFace-style); absent when a separate `embed()` call is needed
    /// (Dlib-style).
    embedding: Option<Embedding>,
}

impl Face {
    pub fn new(box_: BoundingBox, embedding: Option<Embedding>) -> Self {
        Self { box_, embedding }
    }

    pub fn box_(&self) -> &BoundingBox {
        &self.box_
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    pub fn into_embedding(self) -> Option<Embedding> {
        self.embedding
    }
}
