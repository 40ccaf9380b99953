//! Ports
//!
//! Trait boundaries the core depends on but does not implement. Concrete
//! adapters live under `infrastructure` and are wired in at construction
//! time (see `application::pipeline::Engine`) rather than looked up through
//! a global plugin registry.

use chrono::{DateTime, Utc};

use crate::domain::entities::{Face, FaceCrop, Frame, ThreatDetection, WatchlistEntry};
use crate::domain::value_objects::{Embedding, EmbeddingKind};

/// Produces raw frames on demand. Implementations may be backed by a
/// webcam, a video file, or a network stream; the core treats all three
/// identically.
pub trait FrameSource: Send + Sync {
    /// Reads the next frame. `Ok(None)` signals a transient read failure
    /// (the caller should back off briefly and retry); it is not treated as
    /// fatal.
    fn read_frame(&self) -> anyhow::Result<Option<Frame>>;

    /// Releases the underlying device. Must return promptly so an
    /// indicator light (if any) actually extinguishes.
    fn release(&self);
}

/// Detects faces and, for some model families, produces embeddings inline.
pub trait FaceModel: Send + Sync {
    /// The kind of embedding this model produces, used both to pick the
    /// comparison metric and the matching field on each watchlist entry.
    fn embedding_kind(&self) -> EmbeddingKind;

    /// Detects faces in a frame. ArcFace-style implementations may attach a
    /// pre-computed embedding to each returned `Face`.
    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<Face>>;

    /// Computes an embedding for a face crop. Used when `detect` did not
    /// attach one (Dlib-style). Returns `None` for crops too degenerate to
    /// embed (e.g. too small).
    fn embed(&self, crop: &FaceCrop) -> anyhow::Result<Option<Embedding>>;
}

/// The weapon-detector variant's model contract: class-tagged boxes, no
/// embedding step.
pub trait ThreatModel: Send + Sync {
    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<ThreatDetection>>;
}

/// Invoked synchronously from the matching stage on every accepted match.
/// Must be fast — the engine does not await I/O inside it.
pub trait DetectionLogSink: Send + Sync {
    fn on_match(&self, identity: &str, confidence: f32, is_wanted: bool, db_type: &str);
}

/// A no-op sink for configurations that do not need live UI logging.
pub struct NullDetectionLogSink;

impl DetectionLogSink for NullDetectionLogSink {
    fn on_match(&self, _identity: &str, _confidence: f32, _is_wanted: bool, _db_type: &str) {}
}

/// Persists confirmed matches: a padded JPEG crop plus an append to the
/// identity's alert record, and (for high-priority entries) a system
/// notification. Called fire-and-forget from a dedicated writer thread so
/// the matching stage never blocks on disk I/O. Implementations compute
/// the filename, the rounded match percentage and the cosmetic
/// notification rescale themselves.
pub trait AlertSink: Send + Sync {
    fn record_match(
        &self,
        entry: &WatchlistEntry,
        crop: &FaceCrop,
        raw_confidence: f32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}
