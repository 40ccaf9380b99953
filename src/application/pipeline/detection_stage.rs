//! Detection Stage
//!
//! Pulls frames from the `FrameSource`, runs face detection, resolves
//! already-known faces against the `RecencyCache` (drawing their label
//! in place rather than re-matching them), and enqueues genuinely new
//! faces onto the face queue. Publishes the annotated frame as JPEG.
//!
//! Runs on its own dedicated OS thread behind a `FaceModel`, communicating
//! downstream through a bounded `crossbeam_channel` rather than an async
//! detection loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError};
use tracing::warn;

use crate::application::pipeline::clock::Clock;
use crate::application::pipeline::jobs::FaceJob;
use crate::application::services::{FrameSink, Metrics, RecencyCache};
use crate::domain::entities::Frame;
use crate::domain::ports::{FaceModel, FrameSource};
use crate::infrastructure::overlay::{FrameAnnotator, GREEN};

/// Every 10th frame the recency cache is purged of expired entries.
const RECENCY_PURGE_EVERY_N_FRAMES: u64 = 10;
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(20);

pub struct DetectionStage {
    frame_source: Arc<dyn FrameSource>,
    face_model: Arc<dyn FaceModel>,
    recency_cache: Arc<RecencyCache>,
    face_tx: Sender<FaceJob>,
    frame_sink: Arc<FrameSink>,
    metrics: Arc<Metrics>,
    annotator: Arc<FrameAnnotator>,
    clock: Arc<dyn Clock>,
    stopped: Arc<AtomicBool>,
    jpeg_quality: u8,
}

impl DetectionStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        face_model: Arc<dyn FaceModel>,
        recency_cache: Arc<RecencyCache>,
        face_tx: Sender<FaceJob>,
        frame_sink: Arc<FrameSink>,
        metrics: Arc<Metrics>,
        annotator: Arc<FrameAnnotator>,
        clock: Arc<dyn Clock>,
        stopped: Arc<AtomicBool>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            frame_source,
            face_model,
            recency_cache,
            face_tx,
            frame_sink,
            metrics,
            annotator,
            clock,
            stopped,
            jpeg_quality,
        }
    }

    /// Runs the loop until the shared stopped flag flips. Intended to be
    /// spawned as its own OS thread by the orchestrator.
    pub fn run(&self) {
        let mut tick: u64 = 0;
        while !self.stopped.load(Ordering::Relaxed) {
            match self.frame_source.read_frame() {
                Ok(Some(frame)) => {
                    tick += 1;
                    if tick % RECENCY_PURGE_EVERY_N_FRAMES == 0 {
                        self.recency_cache.purge(self.clock.now());
                    }
                    self.process_frame(frame);
                }
                Ok(None) => thread::sleep(READ_RETRY_BACKOFF),
                Err(err) => {
                    warn!(error = %err, "frame source read failed");
                    thread::sleep(READ_RETRY_BACKOFF);
                }
            }
        }
    }

    fn process_frame(&self, frame: Frame) {
        let started_at = Instant::now();
        let now = self.clock.now();

        let faces = match self.face_model.detect(&frame) {
            Ok(faces) => faces,
            Err(err) => {
                warn!(error = %err, "face detection failed, dropping frame");
                return;
            }
        };

        let mut canvas = FrameAnnotator::to_canvas(&frame);
        let frame = Arc::new(frame);
        let faces_found = faces.len();

        for face in faces {
            if let Some(hit) = self.recency_cache.check(face.box_(), now) {
                if let Some(canvas) = canvas.as_mut() {
                    let label = format!("{} ({:.1}s)", hit.identity, hit.remaining_seconds);
                    self.annotator
                        .draw_box_with_label(canvas, face.box_(), &label, GREEN);
                }
                continue;
            }

            let crop = frame.crop(face.box_());
            let job = FaceJob {
                box_: face.box_().clone(),
                crop,
                frame: frame.clone(),
                captured_at: now,
                embedding: face.embedding().cloned(),
            };

            match self.face_tx.try_send(job) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {
                    warn!("face queue receiver gone, stopping detection stage");
                    self.stopped.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }

        self.metrics
            .record_detection_tick(started_at.elapsed(), faces_found);

        if let Some(canvas) = canvas {
            match FrameAnnotator::encode_jpeg(&canvas, self.jpeg_quality) {
                Ok(bytes) => self.frame_sink.publish(bytes),
                Err(err) => warn!(error = %err, "jpeg encode failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::clock::ManualClock;
    use crate::domain::entities::Face;
    use crate::domain::value_objects::{BoundingBox, Embedding, EmbeddingKind};
    use crossbeam_channel::bounded;
    use std::sync::Mutex;

    struct OneShotFrameSource {
        frame: Mutex<Option<Frame>>,
    }

    impl FrameSource for OneShotFrameSource {
        fn read_frame(&self) -> anyhow::Result<Option<Frame>> {
            Ok(self.frame.lock().unwrap().take())
        }
        fn release(&self) {}
    }

    struct StubFaceModel {
        faces: Vec<BoundingBox>,
    }

    impl FaceModel for StubFaceModel {
        fn embedding_kind(&self) -> EmbeddingKind {
            EmbeddingKind::Dlib
        }
        fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<Face>> {
            Ok(self
                .faces
                .iter()
                .cloned()
                .map(|b| Face::new(b, None))
                .collect())
        }
        fn embed(&self, _crop: &crate::domain::entities::FaceCrop) -> anyhow::Result<Option<Embedding>> {
            Ok(None)
        }
    }

    fn solid_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![100u8; (w * h * 3) as usize], w, h, 0.0)
    }

    fn new_stage(
        faces: Vec<BoundingBox>,
        frame: Frame,
        recency_cache: Arc<RecencyCache>,
    ) -> (DetectionStage, crossbeam_channel::Receiver<FaceJob>) {
        let (tx, rx) = bounded(2);
        let stage = DetectionStage::new(
            Arc::new(OneShotFrameSource {
                frame: Mutex::new(Some(frame)),
            }),
            Arc::new(StubFaceModel { faces }),
            recency_cache,
            tx,
            Arc::new(FrameSink::new()),
            Arc::new(Metrics::new()),
            Arc::new(FrameAnnotator::with_no_font()),
            Arc::new(ManualClock::new(0.0)),
            Arc::new(AtomicBool::new(false)),
            70,
        );
        (stage, rx)
    }

    #[test]
    fn new_face_is_enqueued_for_embedding() {
        let recency_cache = Arc::new(RecencyCache::new(7.0, 0.4));
        let (stage, rx) = new_stage(
            vec![BoundingBox::new(2, 2, 10, 10)],
            solid_frame(32, 32),
            recency_cache,
        );
        stage.process_frame(solid_frame(32, 32));
        assert_eq!(rx.try_recv().is_ok(), true);
    }

    #[test]
    fn recency_cache_hit_is_not_enqueued() {
        let recency_cache = Arc::new(RecencyCache::new(7.0, 0.4));
        recency_cache.add(BoundingBox::new(2, 2, 10, 10), "alice".to_string(), 0.0, "dlib");
        let (stage, rx) = new_stage(
            vec![BoundingBox::new(2, 2, 10, 10)],
            solid_frame(32, 32),
            recency_cache,
        );
        stage.process_frame(solid_frame(32, 32));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publishes_a_frame_even_with_no_faces() {
        let recency_cache = Arc::new(RecencyCache::new(7.0, 0.4));
        let (stage, _rx) = new_stage(vec![], solid_frame(16, 16), recency_cache);
        stage.process_frame(solid_frame(16, 16));
        assert!(stage.frame_sink.latest().is_some());
    }
}
