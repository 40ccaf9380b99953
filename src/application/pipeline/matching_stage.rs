//! Matching Stage
//!
//! Pulls `EmbeddingJob`s from the embedding queue, compares against the
//! `Watchlist`, feeds confirmed matches into the `RecencyCache` so
//! `DetectionStage` stops re-submitting them, and — subject to the
//! `AlertDebouncer` — fires an independent, fire-and-forget alert write and
//! a synchronous UI callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::Receiver;
use tracing::warn;

use crate::application::pipeline::clock::Clock;
use crate::application::pipeline::jobs::EmbeddingJob;
use crate::application::services::{crop_padding_px, AlertDebouncer, Metrics, RecencyCache, Watchlist};
use crate::domain::ports::{AlertSink, DetectionLogSink};
use crate::domain::value_objects::EmbeddingKind;

const QUEUE_RECV_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(10);

pub struct MatchingStage {
    embedding_rx: Receiver<EmbeddingJob>,
    watchlist: Arc<Watchlist>,
    recency_cache: Arc<RecencyCache>,
    alert_debouncer: Arc<AlertDebouncer>,
    alert_sink: Arc<dyn AlertSink>,
    detection_log_sink: Arc<dyn DetectionLogSink>,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
    stopped: Arc<AtomicBool>,
    staleness_seconds: f64,
}

impl MatchingStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedding_rx: Receiver<EmbeddingJob>,
        watchlist: Arc<Watchlist>,
        recency_cache: Arc<RecencyCache>,
        alert_debouncer: Arc<AlertDebouncer>,
        alert_sink: Arc<dyn AlertSink>,
        detection_log_sink: Arc<dyn DetectionLogSink>,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
        stopped: Arc<AtomicBool>,
        staleness_ms: u64,
    ) -> Self {
        Self {
            embedding_rx,
            watchlist,
            recency_cache,
            alert_debouncer,
            alert_sink,
            detection_log_sink,
            metrics,
            clock,
            stopped,
            staleness_seconds: staleness_ms as f64 / 1000.0,
        }
    }

    pub fn run(&self) {
        while !self.stopped.load(Ordering::Relaxed) {
            match self.embedding_rx.recv_timeout(QUEUE_RECV_TIMEOUT) {
                Ok(job) => self.process_job(job),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process_job(&self, job: EmbeddingJob) {
        let started_at = Instant::now();
        let now = self.clock.now();

        if job.age_seconds(now) > self.staleness_seconds {
            return;
        }

        let candidate = self.watchlist.best_match(&job.embedding);
        let fired = match candidate {
            None => false,
            Some(candidate) => {
                let source = match job.embedding.kind() {
                    EmbeddingKind::Dlib => "dlib",
                    EmbeddingKind::ArcFace => "arcface",
                };
                self.recency_cache
                    .add(job.box_.clone(), candidate.identity.clone(), now, source);

                if !self
                    .alert_debouncer
                    .should_fire(&candidate.identity, candidate.score, now)
                {
                    false
                } else {
                    self.dispatch_alert(&candidate, &job);
                    self.detection_log_sink.on_match(
                        &candidate.identity,
                        candidate.score,
                        candidate.is_wanted,
                        db_type_label(candidate.db_type),
                    );
                    true
                }
            }
        };

        self.metrics.record_matching_tick(started_at.elapsed(), fired);
    }

    fn dispatch_alert(
        &self,
        candidate: &crate::application::services::MatchCandidate,
        job: &EmbeddingJob,
    ) {
        let Some(entry) = self.watchlist.entry_by_identity(&candidate.identity) else {
            warn!(identity = %candidate.identity, "matched identity no longer on watchlist, skipping alert");
            return;
        };

        let padded = job
            .box_
            .padded(crop_padding_px(), job.frame.width(), job.frame.height());
        let crop = job.frame.crop(&padded);
        let score = candidate.score;
        let sink = self.alert_sink.clone();
        let now = Utc::now();

        let spawned = thread::Builder::new()
            .name(format!("alert-writer-{}", entry.id()))
            .spawn(move || {
                if let Err(err) = sink.record_match(&entry, &crop, score, now) {
                    warn!(error = %err, "alert write failed");
                }
            });

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn alert writer thread");
        }
    }
}

fn db_type_label(db_type: crate::domain::entities::DbType) -> &'static str {
    match db_type {
        crate::domain::entities::DbType::Criminal => "criminal",
        crate::domain::entities::DbType::Missing => "missing",
    }
}
