//! Engine Configuration
//!
//! Loads configuration from environment variables, with typed fallback to
//! sane defaults. Every tunable named in the external interface list is
//! represented here; nothing is read ad hoc from `std::env` elsewhere.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Drop face jobs older than this at the embedding stage.
    pub detection_staleness_ms: u64,
    /// Drop embedding jobs older than this at the matching stage.
    pub matching_staleness_ms: u64,
    /// Recency-cache TTL, in seconds.
    pub cache_cooldown_s: f64,
    /// Spatial match threshold (IoU) used by the recency cache.
    pub cache_iou_threshold: f32,
    /// Minimum spacing between alerts for the same identity, in seconds.
    pub alert_cooldown_s: f64,
    /// Minimum confidence delta required to re-fire an alert within cooldown.
    pub alert_min_conf_delta: f32,
    /// Maximum Dlib-style Euclidean distance accepted as a match.
    pub match_dlib_accept: f32,
    /// Minimum ArcFace-style cosine similarity accepted as a match.
    pub match_arcface_accept: f32,
    /// Bound on the detection → embedding queue.
    pub queue_face_max: usize,
    /// Bound on the embedding → matching queue.
    pub queue_embedding_max: usize,
    /// JPEG quality used when publishing the latest annotated frame and
    /// when writing alert crops.
    pub jpeg_quality: u8,
    /// Root directory under which the watchlist file, alert images/records
    /// and system-notifications file are derived.
    pub data_dir: PathBuf,
    /// Optional path to a TrueType font used to render overlay labels. When
    /// absent or unreadable, boxes are still drawn but without text.
    pub overlay_font_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentinel-engine");

        Self {
            detection_staleness_ms: 500,
            matching_staleness_ms: 1000,
            cache_cooldown_s: 7.0,
            cache_iou_threshold: 0.4,
            alert_cooldown_s: 7.0,
            alert_min_conf_delta: 0.02,
            match_dlib_accept: 0.35,
            match_arcface_accept: 0.55,
            queue_face_max: 2,
            queue_embedding_max: 2,
            jpeg_quality: 70,
            data_dir,
            overlay_font_path: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to
    /// [`EngineConfig::default`] for anything unset or unparsable.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(v) = std::env::var("DETECTION_STALENESS_MS") {
            config.detection_staleness_ms = v.parse().unwrap_or(config.detection_staleness_ms);
        }
        if let Ok(v) = std::env::var("MATCHING_STALENESS_MS") {
            config.matching_staleness_ms = v.parse().unwrap_or(config.matching_staleness_ms);
        }
        if let Ok(v) = std::env::var("CACHE_COOLDOWN_S") {
            config.cache_cooldown_s = v.parse().unwrap_or(config.cache_cooldown_s);
        }
        if let Ok(v) = std::env::var("CACHE_IOU_THRESHOLD") {
            config.cache_iou_threshold = v.parse().unwrap_or(config.cache_iou_threshold);
        }
        if let Ok(v) = std::env::var("ALERT_COOLDOWN_S") {
            config.alert_cooldown_s = v.parse().unwrap_or(config.alert_cooldown_s);
        }
        if let Ok(v) = std::env::var("ALERT_MIN_CONF_DELTA") {
            config.alert_min_conf_delta = v.parse().unwrap_or(config.alert_min_conf_delta);
        }
        if let Ok(v) = std::env::var("MATCH_DLIB_ACCEPT") {
            config.match_dlib_accept = v.parse().unwrap_or(config.match_dlib_accept);
        }
        if let Ok(v) = std::env::var("MATCH_ARCFACE_ACCEPT") {
            config.match_arcface_accept = v.parse().unwrap_or(config.match_arcface_accept);
        }
        if let Ok(v) = std::env::var("QUEUE_FACE_MAX") {
            config.queue_face_max = v.parse().unwrap_or(config.queue_face_max);
        }
        if let Ok(v) = std::env::var("QUEUE_EMBEDDING_MAX") {
            config.queue_embedding_max = v.parse().unwrap_or(config.queue_embedding_max);
        }
        if let Ok(v) = std::env::var("JPEG_QUALITY") {
            config.jpeg_quality = v.parse().unwrap_or(config.jpeg_quality);
        }
        if let Ok(v) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("OVERLAY_FONT_PATH") {
            config.overlay_font_path = Some(PathBuf::from(v));
        }

        Ok(config)
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.data_dir.join("watchlist.json")
    }

    pub fn alerts_dir(&self) -> PathBuf {
        self.data_dir.join("alerts")
    }

    pub fn alert_images_dir(&self) -> PathBuf {
        self.alerts_dir().join("images")
    }

    pub fn system_notifications_path(&self) -> PathBuf {
        self.data_dir.join("system_notifications.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_face_max, 2);
        assert!((config.match_dlib_accept - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn derived_paths_nest_under_data_dir() {
        let mut config = EngineConfig::default();
        config.data_dir = PathBuf::from("/tmp/sentinel-test");
        assert_eq!(
            config.alert_images_dir(),
            PathBuf::from("/tmp/sentinel-test/alerts/images")
        );
        assert_eq!(
            config.watchlist_path(),
            PathBuf::from("/tmp/sentinel-test/watchlist.json")
        );
    }
}
