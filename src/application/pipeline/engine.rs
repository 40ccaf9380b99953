//! Orchestrator
//!
//! Owns the stage workers and the two inter-stage queues, wires every
//! service together from an `EngineConfig`, and drives start/stop. Each
//! worker thread is spawned with `thread::Builder::new().name(...)` so a
//! panic or a slow join shows up against a readable thread name rather than
//! an anonymous one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::bounded;
use tracing::{info, warn};

use crate::application::pipeline::clock::{Clock, SystemClock};
use crate::application::pipeline::{DetectionStage, EmbeddingStage, MatchingStage, WeaponStage};
use crate::application::services::{
    AlertDebouncer, FrameSink, MatchThresholds, Metrics, RecencyCache, ThreatLog, Watchlist,
};
use crate::domain::errors::EngineError;
use crate::domain::ports::{AlertSink, DetectionLogSink, FaceModel, FrameSource, ThreatModel};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::overlay::FrameAnnotator;
use crate::infrastructure::watchlist_file;

/// Workers are joined with this ceiling; a worker that has not exited by
/// then is considered detached and the camera is released anyway.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Which collaborator set `Engine` drives against its `FrameSource`. The
/// two variants are mutually exclusive within one engine instance because
/// the core must never start two concurrent reader loops against the same
/// source; running both a face-recognition and a weapon-detection pipeline
/// at once means constructing two `Engine`s over two distinct sources.
pub enum PipelineMode {
    FaceRecognition { face_model: Arc<dyn FaceModel> },
    WeaponDetection { threat_model: Arc<dyn ThreatModel> },
}

enum Stages {
    FaceRecognition {
        detection: Arc<DetectionStage>,
        embedding: Arc<EmbeddingStage>,
        matching: Arc<MatchingStage>,
    },
    WeaponDetection {
        weapon: Arc<WeaponStage>,
    },
}

pub struct Engine {
    frame_source: Arc<dyn FrameSource>,
    watchlist: Arc<Watchlist>,
    watchlist_path: std::path::PathBuf,
    metrics: Arc<Metrics>,
    frame_sink: Arc<FrameSink>,
    stopped: Arc<AtomicBool>,
    stages: Stages,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        frame_source: Arc<dyn FrameSource>,
        mode: PipelineMode,
        alert_sink: Arc<dyn AlertSink>,
        detection_log_sink: Arc<dyn DetectionLogSink>,
    ) -> Result<Self, EngineError> {
        let entries = watchlist_file::load(&config.watchlist_path())?;
        let thresholds = MatchThresholds {
            dlib_accept_distance: config.match_dlib_accept,
            arcface_accept_similarity: config.match_arcface_accept,
        };
        let watchlist = Arc::new(Watchlist::new(entries, thresholds));
        let recency_cache = Arc::new(RecencyCache::new(config.cache_cooldown_s, config.cache_iou_threshold));
        let metrics = Arc::new(Metrics::new());
        let frame_sink = Arc::new(FrameSink::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let stopped = Arc::new(AtomicBool::new(false));
        let annotator = Arc::new(FrameAnnotator::load(config.overlay_font_path.as_deref()));

        let stages = match mode {
            PipelineMode::FaceRecognition { face_model } => {
                let (face_tx, face_rx) = bounded(config.queue_face_max);
                let (embedding_tx, embedding_rx) = bounded(config.queue_embedding_max);

                let detection = Arc::new(DetectionStage::new(
                    frame_source.clone(),
                    face_model.clone(),
                    recency_cache.clone(),
                    face_tx,
                    frame_sink.clone(),
                    metrics.clone(),
                    annotator.clone(),
                    clock.clone(),
                    stopped.clone(),
                    config.jpeg_quality,
                ));

                let embedding = Arc::new(EmbeddingStage::new(
                    face_rx,
                    embedding_tx,
                    face_model,
                    metrics.clone(),
                    clock.clone(),
                    stopped.clone(),
                    config.detection_staleness_ms,
                ));

                let matching = Arc::new(MatchingStage::new(
                    embedding_rx,
                    watchlist.clone(),
                    recency_cache.clone(),
                    Arc::new(AlertDebouncer::new(config.alert_cooldown_s, config.alert_min_conf_delta)),
                    alert_sink,
                    detection_log_sink,
                    metrics.clone(),
                    clock.clone(),
                    stopped.clone(),
                    config.matching_staleness_ms,
                ));

                Stages::FaceRecognition {
                    detection,
                    embedding,
                    matching,
                }
            }
            PipelineMode::WeaponDetection { threat_model } => {
                let weapon = Arc::new(WeaponStage::new(
                    frame_source.clone(),
                    threat_model,
                    Arc::new(ThreatLog::new(config.alert_cooldown_s, config.alert_min_conf_delta)),
                    frame_sink.clone(),
                    metrics.clone(),
                    annotator,
                    clock,
                    stopped.clone(),
                    config.jpeg_quality,
                ));
                Stages::WeaponDetection { weapon }
            }
        };

        Ok(Self {
            frame_source,
            watchlist,
            watchlist_path: config.watchlist_path(),
            metrics,
            frame_sink,
            stopped,
            stages,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the stage workers. Idempotent only in the sense that calling
    /// it twice spawns a second set of threads — callers are expected to
    /// call `start` once per `Engine` lifetime.
    pub fn start(&self) {
        self.stopped.store(false, Ordering::Relaxed);
        let mut handles = self.handles.lock().unwrap();

        match &self.stages {
            Stages::FaceRecognition {
                detection,
                embedding,
                matching,
            } => {
                handles.push(spawn_named("detection-stage", detection.clone(), |s| s.run()));
                handles.push(spawn_named("embedding-stage", embedding.clone(), |s| s.run()));
                handles.push(spawn_named("matching-stage", matching.clone(), |s| s.run()));
            }
            Stages::WeaponDetection { weapon } => {
                handles.push(spawn_named("weapon-stage", weapon.clone(), |s| s.run()));
            }
        }

        info!("engine started");
    }

    /// Signals every worker to stop, joins each with a bounded timeout, and
    /// releases the frame source regardless of whether every worker
    /// observably exited in time.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);

        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if !join_with_timeout(handle, JOIN_TIMEOUT) {
                warn!(thread = %name, "worker did not exit within join timeout, detaching");
            }
        }

        self.frame_source.release();
        info!("engine stopped");
    }

    /// Re-reads the active-targets file and swaps the watchlist atomically.
    /// On parse/read failure the previous list stays active, per the
    /// engine's error-handling policy.
    pub fn reload_watchlist(&self) {
        match watchlist_file::load(&self.watchlist_path) {
            Ok(entries) => self.watchlist.reload(entries),
            Err(err) => {
                warn!(path = %self.watchlist_path.display(), error = %err, "watchlist reload failed, keeping previous list active");
            }
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn frame_sink(&self) -> Arc<FrameSink> {
        self.frame_sink.clone()
    }

    pub fn watchlist(&self) -> Arc<Watchlist> {
        self.watchlist.clone()
    }
}

fn spawn_named<T: Send + Sync + 'static>(
    name: &str,
    stage: Arc<T>,
    run: impl Fn(&T) + Send + 'static,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run(&stage))
        .expect("failed to spawn pipeline worker thread")
}

/// Joins `handle` on a helper thread and waits up to `timeout` for it to
/// report completion. `std::thread::JoinHandle` has no native timed join,
/// so the wait is implemented as a rendezvous over a channel.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let (tx, rx) = bounded::<()>(1);
    thread::spawn(move || {
        let _ = handle.join();
        let _ = tx.send(());
    });
    rx.recv_timeout(timeout).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Face, FaceCrop, Frame, WatchlistEntry};
    use crate::domain::ports::NullDetectionLogSink;
    use crate::domain::value_objects::{Embedding, EmbeddingKind};
    use std::io::Write;

    struct StubFrameSource;
    impl FrameSource for StubFrameSource {
        fn read_frame(&self) -> anyhow::Result<Option<Frame>> {
            Ok(None)
        }
        fn release(&self) {}
    }

    struct StubFaceModel;
    impl FaceModel for StubFaceModel {
        fn embedding_kind(&self) -> EmbeddingKind {
            EmbeddingKind::Dlib
        }
        fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<Face>> {
            Ok(Vec::new())
        }
        fn embed(&self, _crop: &FaceCrop) -> anyhow::Result<Option<Embedding>> {
            Ok(None)
        }
    }

    struct NullAlertSink;
    impl AlertSink for NullAlertSink {
        fn record_match(
            &self,
            _entry: &WatchlistEntry,
            _crop: &FaceCrop,
            _raw_confidence: f32,
            _now: chrono::DateTime<chrono::Utc>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn config_with_empty_watchlist() -> (EngineConfig, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(tmp.path().join("watchlist.json")).unwrap();
        write!(file, "[]").unwrap();
        let mut config = EngineConfig::default();
        config.data_dir = tmp.path().to_path_buf();
        (config, tmp)
    }

    #[test]
    fn start_then_stop_releases_the_frame_source() {
        let (config, _tmp) = config_with_empty_watchlist();
        let engine = Engine::new(
            &config,
            Arc::new(StubFrameSource),
            PipelineMode::FaceRecognition {
                face_model: Arc::new(StubFaceModel),
            },
            Arc::new(NullAlertSink),
            Arc::new(NullDetectionLogSink),
        )
        .unwrap();

        engine.start();
        engine.stop();
    }

    #[test]
    fn missing_watchlist_file_fails_construction() {
        let mut config = EngineConfig::default();
        config.data_dir = std::path::PathBuf::from("/nonexistent-data-dir");
        let result = Engine::new(
            &config,
            Arc::new(StubFrameSource),
            PipelineMode::FaceRecognition {
                face_model: Arc::new(StubFaceModel),
            },
            Arc::new(NullAlertSink),
            Arc::new(NullDetectionLogSink),
        );
        assert!(result.is_err());
    }

    #[test]
    fn reload_watchlist_keeps_previous_list_on_parse_error() {
        let (config, _tmp) = config_with_empty_watchlist();
        let engine = Engine::new(
            &config,
            Arc::new(StubFrameSource),
            PipelineMode::FaceRecognition {
                face_model: Arc::new(StubFaceModel),
            },
            Arc::new(NullAlertSink),
            Arc::new(NullDetectionLogSink),
        )
        .unwrap();

        std::fs::write(config.watchlist_path(), "not json").unwrap();
        engine.reload_watchlist();
        assert_eq!(engine.watchlist().len(), 0);
    }
}
