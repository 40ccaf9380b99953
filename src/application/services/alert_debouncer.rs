//! Alert Debouncer
//!
//! Gates how often a confirmed match actually gets written to disk. Without
//! this, a lingering face re-matched every pipeline tick would flood
//! `alerts/{id}.json` with near-duplicate entries.

use std::collections::HashMap;
use std::sync::Mutex;

struct LastFired {
    at: f64,
    confidence: f32,
}

/// Per-identity gate: fires on the first sighting of an identity, and
/// thereafter only once both the cooldown has elapsed *and* the confidence
/// has moved by at least the minimum delta since the last fire.
pub struct AlertDebouncer {
    cooldown_seconds: f64,
    min_confidence_delta: f32,
    last: Mutex<HashMap<String, LastFired>>,
}

impl AlertDebouncer {
    pub fn new(cooldown_seconds: f64, min_confidence_delta: f32) -> Self {
        Self {
            cooldown_seconds,
            min_confidence_delta,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if an alert should be written for `identity` at
    /// confidence `confidence` and time `now`, and records the firing if so.
    pub fn should_fire(&self, identity: &str, confidence: f32, now: f64) -> bool {
        let mut last = self.last.lock().unwrap();
        let fire = match last.get(identity) {
            None => true,
            Some(prev) => {
                let elapsed = now - prev.at;
                let delta = (confidence - prev.confidence).abs();
                elapsed >= self.cooldown_seconds && delta >= self.min_confidence_delta
            }
        };

        if fire {
            last.insert(
                identity.to_string(),
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
    fn first_sighting_always_fires() {
        let debouncer = AlertDebouncer::new(COOLDOWN, DELTA);
        assert!(debouncer.should_fire("alice", 0.9, 0.0));
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let debouncer = AlertDebouncer::new(COOLDOWN, DELTA);
        assert!(debouncer.should_fire("alice", 0.9, 0.0));
        assert!(!debouncer.should_fire("alice", 0.95, 3.0));
    }

    #[test]
    fn repeat_after_cooldown_without_confidence_change_is_suppressed() {
        let debouncer = AlertDebouncer::new(COOLDOWN, DELTA);
        assert!(debouncer.should_fire("alice", 0.90, 0.0));
        assert!(!debouncer.should_fire("alice", 0.905, 10.0));
    }

    #[test]
    fn repeat_after_cooldown_with_confidence_change_fires() {
        let debouncer = AlertDebouncer::new(COOLDOWN, DELTA);
        assert!(debouncer.should_fire("alice", 0.90, 0.0));
        assert!(debouncer.should_fire("alice", 0.95, 10.0));
    }

    #[test]
    fn separate_identities_are_independent() {
        let debouncer = AlertDebouncer::new(COOLDOWN, DELTA);
        assert!(debouncer.should_fire("alice", 0.9, 0.0));
        assert!(debouncer.should_fire("bob", 0.9, 0.1));
    }

    #[test]
    fn configured_cooldown_and_delta_are_honoured() {
        let debouncer = AlertDebouncer::new(1.0, 0.5);
        assert!(debouncer.should_fire("alice", 0.5, 0.0));
        // cooldown has elapsed but the delta has not moved enough.
        assert!(!debouncer.should_fire("alice", 0.6, 2.0));
        assert!(debouncer.should_fire("alice", 1.0, 2.0));
    }
}
