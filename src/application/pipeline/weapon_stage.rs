//! Weapon Stage
//!
//! The weapon-detector variant: an identical skeleton to `DetectionStage`
//! without the embedding/matching split, since threat detections are not
//! matched against an identity list. Shares the same `FrameSource` as the
//! face pipeline — the orchestrator guarantees only one of the two stages
//! ever reads it at a time in a given engine configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::application::pipeline::clock::Clock;
use crate::application::services::{FrameSink, Metrics, ThreatLog};
use crate::domain::entities::Frame;
use crate::domain::ports::{FrameSource, ThreatModel};
use crate::infrastructure::overlay::{FrameAnnotator, RED};

const READ_RETRY_BACKOFF: Duration = Duration::from_millis(20);

pub struct WeaponStage {
    frame_source: Arc<dyn FrameSource>,
    threat_model: Arc<dyn ThreatModel>,
    threat_log: Arc<ThreatLog>,
    frame_sink: Arc<FrameSink>,
    metrics: Arc<Metrics>,
    annotator: Arc<FrameAnnotator>,
    clock: Arc<dyn Clock>,
    stopped: Arc<AtomicBool>,
    jpeg_quality: u8,
}

impl WeaponStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        threat_model: Arc<dyn ThreatModel>,
        threat_log: Arc<ThreatLog>,
        frame_sink: Arc<FrameSink>,
        metrics: Arc<Metrics>,
        annotator: Arc<FrameAnnotator>,
        clock: Arc<dyn Clock>,
        stopped: Arc<AtomicBool>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            frame_source,
            threat_model,
            threat_log,
            frame_sink,
            metrics,
            annotator,
            clock,
            stopped,
            jpeg_quality,
        }
    }

    pub fn run(&self) {
        while !self.stopped.load(Ordering::Relaxed) {
            match self.frame_source.read_frame() {
                Ok(Some(frame)) => self.process_frame(frame),
                Ok(None) => thread::sleep(READ_RETRY_BACKOFF),
                Err(err) => {
                    warn!(error = %err, "frame source read failed in weapon stage");
                    thread::sleep(READ_RETRY_BACKOFF);
                }
            }
        }
    }

    fn process_frame(&self, frame: Frame) {
        let started_at = Instant::now();
        let now = self.clock.now();

        let threats = match self.threat_model.detect(&frame) {
            Ok(threats) => threats,
            Err(err) => {
                warn!(error = %err, "threat detection failed, dropping frame");
                return;
            }
        };

        let mut canvas = FrameAnnotator::to_canvas(&frame);
        let threat_count = threats.len();

        for threat in &threats {
            if let Some(canvas) = canvas.as_mut() {
                self.annotator
                    .draw_box_with_label(canvas, threat.box_(), &threat.label(), RED);
            }

            if self
                .threat_log
                .should_fire(threat.class_name(), threat.confidence(), now)
            {
                tracing::warn!(
                    class = threat.class_name(),
                    confidence = threat.confidence(),
                    "threat detected"
                );
            }
        }

        self.metrics
            .record_detection_tick(started_at.elapsed(), threat_count);

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
    use crate::domain::entities::ThreatDetection;
    use crate::domain::value_objects::BoundingBox;
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

    struct StubThreatModel {
        threats: Vec<ThreatDetection>,
    }

    impl ThreatModel for StubThreatModel {
        fn detect(&self, _frame: &Frame) -> anyhow::Result<Vec<ThreatDetection>> {
            Ok(self.threats.clone())
        }
    }

    fn solid_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![90u8; (w * h * 3) as usize], w, h, 0.0)
    }

    #[test]
    fn publishes_annotated_frame_with_detected_threats() {
        let stage = WeaponStage::new(
            Arc::new(OneShotFrameSource {
                frame: Mutex::new(Some(solid_frame(32, 32))),
            }),
            Arc::new(StubThreatModel {
                threats: vec![ThreatDetection::new(BoundingBox::new(1, 1, 8, 8), 0.9, "knife".to_string())],
            }),
            Arc::new(ThreatLog::new(7.0, 0.02)),
            Arc::new(FrameSink::new()),
            Arc::new(Metrics::new()),
            Arc::new(FrameAnnotator::with_no_font()),
            Arc::new(ManualClock::new(0.0)),
            Arc::new(AtomicBool::new(false)),
            70,
        );
        stage.process_frame(solid_frame(32, 32));
        assert!(stage.frame_sink.latest().is_some());
        assert_eq!(stage.metrics.snapshot().faces_detected, 1);
    }
}
