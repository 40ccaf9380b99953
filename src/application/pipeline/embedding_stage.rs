//! Embedding Stage
//!
//! Pulls `FaceJob`s from the face queue, computing an embedding for any
//! job that does not already carry one, then forwards an `EmbeddingJob`
//! onto the matching queue. Jobs older than the staleness window are
//! dropped before any model call is made.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

use crate::application::pipeline::clock::Clock;
use crate::application::pipeline::jobs::{EmbeddingJob, FaceJob};
use crate::application::services::Metrics;
use crate::domain::ports::FaceModel;

const QUEUE_RECV_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10);

pub struct EmbeddingStage {
    face_rx: Receiver<FaceJob>,
    embedding_tx: Sender<EmbeddingJob>,
    face_model: Arc<dyn FaceModel>,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
    stopped: Arc<AtomicBool>,
    staleness_seconds: f64,
}

impl EmbeddingStage {
    pub fn new(
        face_rx: Receiver<FaceJob>,
        embedding_tx: Sender<EmbeddingJob>,
        face_model: Arc<dyn FaceModel>,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
        stopped: Arc<AtomicBool>,
        staleness_ms: u64,
    ) -> Self {
        Self {
            face_rx,
            embedding_tx,
            face_model,
            metrics,
            clock,
            stopped,
            staleness_seconds: staleness_ms as f64 / 1000.0,
        }
    }

    pub fn run(&self) {
        while !self.stopped.load(Ordering::Relaxed) {
            match self.face_rx.recv_timeout(QUEUE_RECV_TIMEOUT) {
                Ok(job) => self.process_job(job),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process_job(&self, job: FaceJob) {
        let started_at = Instant::now();
        let now = self.clock.now();

        if job.age_seconds(now) > self.staleness_seconds {
            return;
        }

        let embedding = if job.embedding.is_some() {
            job.embedding
        } else if job.crop.is_empty() {
            None
        } else {
            match self.face_model.embed(&job.crop) {
                Ok(embedding) => embedding,
                Err(err) => {
                    warn!(error = %err, "embedding failed, dropping job");
                    return;
                }
            }
        };

        self.metrics.record_embedding_tick(started_at.elapsed());

        let Some(embedding) = embedding else {
            return;
        };

        let out = EmbeddingJob {
            box_: job.box_,
            embedding,
            frame: job.frame,
            captured_at: job.captured_at,
        };

        match self.embedding_tx.try_send(out) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                warn!("embedding queue receiver gone, stopping embedding stage");
                self.stopped.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::clock::ManualClock;
    use crate::domain::entities::{Face, FaceCrop, Frame};
    use crate::domain::value_objects::{BoundingBox, Embedding, EmbeddingKind};
    use crossbeam_channel::bounded;
    use std::sync::Arc;

    struct StubFaceModel {
        embedding: Option<Embedding>,
    }

    impl FaceModel for StubFaceModel {
        fn embedding_kind(&self) -> EmbeddingKind {
            EmbeddingKind::Dlib
        }
        fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<Face>> {
            Ok(Vec::new())
        }
        fn embed(&self, _crop: &FaceCrop) -> anyhow::Result<Option<Embedding>> {
            Ok(self.embedding.clone())
        }
    }

    fn job(captured_at: f64, crop_empty: bool, pre_embedding: Option<Embedding>) -> FaceJob {
        let frame = Arc::new(Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 0.0));
        let crop = if crop_empty {
            frame.crop(&BoundingBox::new(-100, -100, 1, 1))
        } else {
            frame.crop(&BoundingBox::new(0, 0, 5, 5))
        };
        FaceJob {
            box_: BoundingBox::new(0, 0, 5, 5),
            crop,
            frame,
            captured_at,
            embedding: pre_embedding,
        }
    }

    fn new_stage(
        face_model: Arc<dyn FaceModel>,
        staleness_ms: u64,
    ) -> (
        EmbeddingStage,
        Sender<FaceJob>,
        crossbeam_channel::Receiver<EmbeddingJob>,
    ) {
        let (face_tx, face_rx) = bounded(2);
        let (embedding_tx, embedding_rx) = bounded(2);
        let stage = EmbeddingStage::new(
            face_rx,
            embedding_tx,
            face_model,
            Arc::new(Metrics::new()),
            Arc::new(ManualClock::new(0.0)),
            Arc::new(AtomicBool::new(false)),
            staleness_ms,
        );
        (stage, face_tx, embedding_rx)
    }

    #[test]
    fn forwards_precomputed_embedding_without_calling_embed() {
        let embedding = Embedding::new(EmbeddingKind::Dlib, vec![0.1; 128]).unwrap();
        let (stage, _tx, rx) = new_stage(Arc::new(StubFaceModel { embedding: None }), 500);
        stage.process_job(job(0.0, false, Some(embedding)));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn calls_embed_when_no_precomputed_embedding() {
        let embedding = Embedding::new(EmbeddingKind::Dlib, vec![0.2; 128]).unwrap();
        let (stage, _tx, rx) = new_stage(
            Arc::new(StubFaceModel {
                embedding: Some(embedding),
            }),
            500,
        );
        stage.process_job(job(0.0, false, None));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn stale_job_is_dropped() {
        let (stage, _tx, rx) = new_stage(Arc::new(StubFaceModel { embedding: None }), 500);
        // ManualClock starts at 0.0; a job captured at -1.0 is 1s old, past 0.5s staleness.
        stage.process_job(job(-1.0, false, None));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn empty_crop_with_no_precomputed_embedding_is_skipped() {
        let (stage, _tx, rx) = new_stage(Arc::new(StubFaceModel { embedding: None }), 500);
        stage.process_job(job(0.0, true, None));
        assert!(rx.try_recv().is_err());
    }
}
