//! Threat Log
//!
//! The weapon-detector variant's debounce gate. Structurally identical to
//! [`super::alert_debouncer::AlertDebouncer`] but keyed by detected class
//! name rather than a watchlist identity, since there is no per-person
//! identity in this pipeline.

use std::collections::HashMap;
use std::sync::Mutex;

struct LastFired {
    at: f64,
    confidence: f32,
}

/// Per-class gate controlling how often a threat log entry is written.
pub struct ThreatLog {
    cooldown_seconds: f64,
    min_confidence_delta: f32,
    last: Mutex<HashMap<String, LastFired>>,
}

impl ThreatLog {
    pub fn new(cooldown_seconds: f64, min_confidence_delta: f32) -> Self {
        Self {
            cooldown_seconds,
            min_confidence_delta,
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_fire(&self, class_name: &str, confidence: f32, now: f64) -> bool {
        let mut last = self.last.lock().unwrap();
        let fire = match last.get(class_name) {
            None => true,
            Some(prev) => {
                let elapsed = now - prev.at;
                let delta = (confidence - prev.confidence).abs();
                elapsed >= self.cooldown_seconds && delta >= self.min_confidence_delta
            }
        };

        if fire {
            last.insert(
                class_name.to_string(),
                LastFired {
                    at: now,
                    confidence,
                },
            );
        }
        fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: f64 = 7.0;
    const DELTA: f32 = 0.02;

    #[test]
    fn first_sighting_of_a_class_fires() {
        let log = ThreatLog::new(COOLDOWN, DELTA);
        assert!(log.should_fire("knife", 0.8, 0.0));
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let log = ThreatLog::new(COOLDOWN, DELTA);
        assert!(log.should_fire("knife", 0.8, 0.0));
        assert!(!log.should_fire("knife", 0.85, 1.0));
    }

    #[test]
    fn distinct_classes_are_independent() {
        let log = ThreatLog::new(COOLDOWN, DELTA);
        assert!(log.should_fire("knife", 0.8, 0.0));
        assert!(log.should_fire("gun", 0.8, 0.0));
    }

    #[test]
    fn configured_cooldown_and_delta_are_honoured() {
        let log = ThreatLog::new(1.0, 0.5);
        assert!(log.should_fire("knife", 0.5, 0.0));
        assert!(!log.should_fire("knife", 0.6, 2.0));
        assert!(log.should_fire("knife", 1.0, 2.0));
    }
}
