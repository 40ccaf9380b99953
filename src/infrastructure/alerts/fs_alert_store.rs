//! Filesystem Alert Store
//!
//! The `AlertSink` implementation used in production: writes a padded JPEG
//! crop, appends to the per-identity alert record, and — for priority ≤ 2
//! entries — appends a rescaled entry to the system-notifications file.
//! Grounded on `core/surveillance_engine.py`'s `save_alert`/
//! `create_system_notification`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::services::system_notification_confidence;
use crate::domain::entities::{AlertDetection, AlertRecord, FaceCrop, WatchlistEntry};
use crate::domain::ports::AlertSink;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::overlay::FrameAnnotator;

#[derive(Debug, Serialize, Deserialize)]
struct SystemNotification {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: String,
    title: String,
    message: String,
    person_id: String,
    priority: u8,
    confidence: f64,
    read: bool,
    severity: &'static str,
}

/// Writes alerts under `{data_dir}/alerts/` and
/// `{data_dir}/system_notifications.json`.
pub struct FsAlertStore {
    alerts_dir: PathBuf,
    alert_images_dir: PathBuf,
    system_notifications_path: PathBuf,
    jpeg_quality: u8,
}

impl FsAlertStore {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(config.alert_images_dir())?;
        Ok(Self {
            alerts_dir: config.alerts_dir(),
            alert_images_dir: config.alert_images_dir(),
            system_notifications_path: config.system_notifications_path(),
            jpeg_quality: config.jpeg_quality,
        })
    }

    fn write_crop(&self, crop: &FaceCrop, filename: &str) -> anyhow::Result<()> {
        let canvas = RgbImage::from_raw(crop.width(), crop.height(), crop.data().to_vec())
            .ok_or_else(|| anyhow::anyhow!("alert crop buffer size does not match dimensions"))?;
        let bytes = FrameAnnotator::encode_jpeg(&canvas, self.jpeg_quality)?;
        std::fs::write(self.alert_images_dir.join(filename), bytes)?;
        Ok(())
    }

    fn load_or_seed_record(&self, entry: &WatchlistEntry) -> AlertRecord {
        let path = self.alerts_dir.join(format!("{}.json", entry.id()));
        match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                warn!(error = %err, id = entry.id(), "corrupt alert record, reseeding");
                AlertRecord::seed_from(entry)
            }),
            Err(_) => AlertRecord::seed_from(entry),
        }
    }

    fn write_record(&self, record: &AlertRecord) -> anyhow::Result<()> {
        let path = self.alerts_dir.join(format!("{}.json", record.id));
        std::fs::write(path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    fn append_system_notification(
        &self,
        entry: &WatchlistEntry,
        match_percentage: f64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut notifications: Vec<SystemNotification> =
            match std::fs::read_to_string(&self.system_notifications_path) {
                Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
                Err(_) => Vec::new(),
            };

        let confidence = system_notification_confidence(match_percentage);
        notifications.push(SystemNotification {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            kind: "priority_detection".to_string(),
            title: format!("Priority detection: {}", entry.name()),
            message: format!(
                "{} detected with {:.1}% confidence",
                entry.name(),
                confidence
            ),
            person_id: entry.id().to_string(),
            priority: entry.priority(),
            confidence,
            read: false,
            severity: if entry.priority() <= 1 { "critical" } else { "high" },
        });

        std::fs::write(
            &self.system_notifications_path,
            serde_json::to_string_pretty(&notifications)?,
        )?;
        Ok(())
    }
}

impl AlertSink for FsAlertStore {
    fn record_match(
        &self,
        entry: &WatchlistEntry,
        crop: &FaceCrop,
        raw_confidence: f32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        // Padding is applied by the caller (matching stage) before the crop
        // reaches this sink; see `application::services::alert_store`.
        let image_filename = format!("{}_{}.jpg", entry.id(), now.timestamp());
        self.write_crop(crop, &image_filename)?;

        let match_percentage = ((raw_confidence as f64) * 100.0 * 100.0).round() / 100.0;

        let mut record = self.load_or_seed_record(entry);
        record.push_detection(AlertDetection {
            timestamp: now,
            match_percentage,
            capture_frame: image_filename,
        });
        self.write_record(&record)?;

        if entry.priority() <= 2 {
            self.append_system_notification(entry, match_percentage, now)?;
        }

        Ok(())
    }
}
