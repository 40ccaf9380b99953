//! Pipeline Jobs
//!
//! The two handoff types passed between stages over bounded channels. Both
//! carry an `Arc<Frame>` snapshot taken once per detection tick rather than
//! a deep pixel copy — cheap to clone per-face while still giving
//! downstream stages an owned handle that survives past the producer's
//! loop iteration (needed later for alert cropping).

use std::sync::Arc;

use crate::domain::entities::{Frame, FaceCrop};
use crate::domain::value_objects::{BoundingBox, Embedding};

/// Produced by `DetectionStage`, consumed by `EmbeddingStage`.
pub struct FaceJob {
    pub box_: BoundingBox,
    pub crop: FaceCrop,
    pub frame: Arc<Frame>,
    pub captured_at: f64,
    /// Present when the detecting model computes embeddings inline
    /// (ArcFace-style); `EmbeddingStage` forwards it without re-embedding.
    pub embedding: Option<Embedding>,
}

impl FaceJob {
    pub fn age_seconds(&self, now: f64) -> f64 {
        now - self.captured_at
    }
}

/// Produced by `EmbeddingStage`, consumed by `MatchingStage`.
pub struct EmbeddingJob {
    pub box_: BoundingBox,
    pub embedding: Embedding,
    pub frame: Arc<Frame>,
    pub captured_at: f64,
}

impl EmbeddingJob {
    pub fn age_seconds(&self, now: f64) -> f64 {
        now - self.captured_at
    }
}
