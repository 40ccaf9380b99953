//! Metrics
//!
//! In-process counters exposed to the UI/log layer. Deliberately coarse —
//! this is not a Prometheus exporter, just enough to answer "is the
//! pipeline keeping up".

use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct Snapshot {
    pub detection_fps: f64,
    pub embedding_fps: f64,
    pub matching_fps: f64,
    pub faces_detected: u64,
    pub matches_found: u64,
}

#[derive(Default)]
struct Counters {
    detection_ticks: u64,
    embedding_ticks: u64,
    matching_ticks: u64,
    faces_detected: u64,
    matches_found: u64,
    detection_elapsed: Duration,
    embedding_elapsed: Duration,
    matching_elapsed: Duration,
}

/// Shared, mutex-protected counters updated by each pipeline stage and read
/// by the UI layer. One instance per running engine.
#[derive(Default)]
pub struct Metrics {
    counters: Mutex<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection_tick(&self, elapsed: Duration, faces_found: usize) {
        let mut c = self.counters.lock().unwrap();
        c.detection_ticks += 1;
        c.detection_elapsed += elapsed;
        c.faces_detected += faces_found as u64;
    }

    pub fn record_embedding_tick(&self, elapsed: Duration) {
        let mut c = self.counters.lock().unwrap();
        c.embedding_ticks += 1;
        c.embedding_elapsed += elapsed;
    }

    pub fn record_matching_tick(&self, elapsed: Duration, matched: bool) {
        let mut c = self.counters.lock().unwrap();
        c.matching_ticks += 1;
        c.matching_elapsed += elapsed;
        if matched {
            c.matches_found += 1;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let c = self.counters.lock().unwrap();
        Snapshot {
            detection_fps: fps(c.detection_ticks, c.detection_elapsed),
            embedding_fps: fps(c.embedding_ticks, c.embedding_elapsed),
            matching_fps: fps(c.matching_ticks, c.matching_elapsed),
            faces_detected: c.faces_detected,
            matches_found: c.matches_found,
        }
    }
}

fn fps(ticks: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        0.0
    } else {
        ticks as f64 / seconds
    }
}
