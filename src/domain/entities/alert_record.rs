//! Alert Record Entity
//!
//! Per-identity append-only detection history persisted under
//! `alerts/{id}.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::watchlist_entry::{DbType, WatchlistEntry};

/// A single detection appended to an [`AlertRecord`]. Never mutated after
/// insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDetection {
    pub timestamp: DateTime<Utc>,
    /// Match confidence scaled to 0..100, 2 decimal places, **raw** (not the
    /// cosmetic 85-90% rescale applied to system notifications).
    pub match_percentage: f64,
    pub capture_frame: String,
}

/// The persisted per-identity alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub name: String,
    pub db_type: DbType,
    pub priority: u8,
    pub is_wanted: bool,
    pub image_filename: String,
    pub detections: Vec<AlertDetection>,
}

impl AlertRecord {
    /// Seeds a fresh record from a watchlist entry (no embeddings carried
    /// over), with an empty detection history.
    pub fn seed_from(entry: &WatchlistEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            name: entry.name().to_string(),
            db_type: entry.db_type(),
            priority: entry.priority(),
            is_wanted: entry.is_wanted(),
            image_filename: entry.image_filename().to_string(),
            detections: Vec::new(),
        }
    }

    /// Appends a new detection and re-sorts `detections` descending by
    /// `match_percentage`.
    pub fn push_detection(&mut self, detection: AlertDetection) {
        self.detections.push(detection);
        self.detections.sort_by(|a, b| {
            b.match_percentage
                .partial_cmp(&a.match_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Embedding, EmbeddingKind};
    use chrono::TimeZone;

    fn entry() -> WatchlistEntry {
        WatchlistEntry::new(
            "t-1".to_string(),
            "alice".to_string(),
            3,
            false,
            DbType::Criminal,
            Some(Embedding::new(EmbeddingKind::Dlib, vec![0.0; 128]).unwrap()),
            None,
            "alice.jpg".to_string(),
        )
    }

    fn detection(pct: f64) -> AlertDetection {
        AlertDetection {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            match_percentage: pct,
            capture_frame: format!("alice_{pct}.jpg"),
        }
    }

    #[test]
    fn seeded_record_has_no_detections() {
        let record = AlertRecord::seed_from(&entry());
        assert!(record.detections.is_empty());
        assert_eq!(record.id, "t-1");
    }

    #[test]
    fn push_detection_sorts_descending() {
        let mut record = AlertRecord::seed_from(&entry());
        record.push_detection(detection(80.0));
        record.push_detection(detection(95.0));
        record.push_detection(detection(60.0));

        let pcts: Vec<f64> = record.detections.iter().map(|d| d.match_percentage).collect();
        assert_eq!(pcts, vec![95.0, 80.0, 60.0]);
    }
}
