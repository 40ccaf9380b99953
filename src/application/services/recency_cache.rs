//! Recency Cache
//!
//! A coarse spatial-temporal alternative to tracking: once a face at roughly
//! a given location has been identified, recent detections covering the
//! same area are treated as "already known" so the pipeline does not
//! re-embed and re-match them for a cooldown window. Not identity-keyed —
//! two different people passing through the same spot in quick succession
//! will briefly interfere. That trade-off is intentional.

use std::sync::Mutex;

use crate::domain::value_objects::BoundingBox;

struct RecencyEntry {
    box_: BoundingBox,
    identity: String,
    expiry: f64,
    source: String,
}

/// A hit returned by [`RecencyCache::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecencyHit {
    pub identity: String,
    pub remaining_seconds: f64,
    pub source: String,
}

/// Thread-safe set of recently-labelled boxes.
pub struct RecencyCache {
    cooldown: f64,
    iou_threshold: f32,
    entries: Mutex<Vec<RecencyEntry>>,
}

impl RecencyCache {
    pub fn new(cooldown_seconds: f64, iou_threshold: f32) -> Self {
        Self {
            cooldown: cooldown_seconds,
            iou_threshold,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Returns the first entry whose box overlaps `box_` by at least the
    /// IoU threshold and has not expired. The recency cache never returns
    /// an expired label.
    pub fn check(&self, box_: &BoundingBox, now: f64) -> Option<RecencyHit> {
        let entries = self.entries.lock().unwrap();
        for entry in entries.iter() {
            if entry.expiry <= now {
                continue;
            }
            if box_.iou(&entry.box_) >= self.iou_threshold {
                return Some(RecencyHit {
                    identity: entry.identity.clone(),
                    remaining_seconds: entry.expiry - now,
                    source: entry.source.clone(),
                });
            }
        }
        None
    }

    /// Records a confirmed match. Expiry is `now + cooldown`.
    pub fn add(&self, box_: BoundingBox, identity: String, now: f64, source: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(RecencyEntry {
            box_,
            identity,
            expiry: now + self.cooldown,
            source: source.to_string(),
        });
    }

    /// Drops expired entries. Not required to be time-precise — called
    /// opportunistically every few frames by the detection stage.
    pub fn purge(&self, now: f64) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.expiry > now);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
