use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sentinel_engine::entities::{Face, FaceCrop, Frame};
use sentinel_engine::ports::FrameSource;
use sentinel_engine::value_objects::{BoundingBox, Embedding, EmbeddingKind};

/// Produces the same solid frame forever, pacing reads with a small sleep
/// so the stage loops see a steady, countable stream of frames rather than
/// a tight spin.
pub struct TickingFrameSource {
    frame: Frame,
    pace: Duration,
    produced: AtomicUsize,
}

impl TickingFrameSource {
    pub fn new(width: u32, height: u32, pace: Duration) -> Self {
        Self {
            frame: Frame::new(vec![120u8; (width * height * 3) as usize], width, height, 0.0),
            pace,
            produced: AtomicUsize::new(0),
        }
    }

    pub fn frames_produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }
}

impl FrameSource for TickingFrameSource {
    fn read_frame(&self) -> anyhow::Result<Option<Frame>> {
        thread::sleep(self.pace);
        self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.frame.clone()))
    }

    fn release(&self) {}
}

/// A `FaceModel` that always detects one face at a fixed box and, on
/// `embed()`, returns one of two fixed embeddings depending on an
/// externally-flipped switch -- used to simulate a confidence change
/// between two sightings of the same identity.
pub struct SwitchableFaceModel {
    box_: BoundingBox,
    phase2: Arc<AtomicBool>,
    embed_calls: AtomicUsize,
    embedding_a: Embedding,
    embedding_b: Embedding,
}

impl SwitchableFaceModel {
    pub fn new(box_: BoundingBox, phase2: Arc<AtomicBool>) -> Self {
        Self {
            box_,
            phase2,
            embed_calls: AtomicUsize::new(0),
            embedding_a: Embedding::new(EmbeddingKind::Dlib, vec![0.01; 128]).unwrap(),
            embedding_b: Embedding::new(EmbeddingKind::Dlib, vec![0.025; 128]).unwrap(),
        }
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl sentinel_engine::ports::FaceModel for SwitchableFaceModel {
    fn embedding_kind(&self) -> EmbeddingKind {
        EmbeddingKind::Dlib
    }

    fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<Face>> {
        Ok(vec![Face::new(self.box_.clone(), None)])
    }

    fn embed(&self, _crop: &FaceCrop) -> anyhow::Result<Option<Embedding>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let embedding = if self.phase2.load(Ordering::SeqCst) {
            self.embedding_b.clone()
        } else {
            self.embedding_a.clone()
        };
        Ok(Some(embedding))
    }
}
