//! Alert Store (shared logic)
//!
//! Pure helpers shared by every [`crate::domain::ports::AlertSink`]
//! implementation: the padding used for alert crops and the cosmetic
//! confidence rescale applied to system notifications. The actual file
//! writes live in `infrastructure::alerts`.

const ALERT_CROP_PADDING_PX: i32 = 20;

/// Pixels of padding added around a matched face before it is saved as an
/// alert image, so the crop shows context rather than a tight headshot.
pub fn crop_padding_px() -> i32 {
    ALERT_CROP_PADDING_PX
}

/// Rescales a raw match percentage (0..100) into the 85-90 band used for
/// system (push) notifications, so a borderline match still reads as
/// "likely" without ever claiming certainty. Only applied to notifications;
/// the persisted alert record keeps the raw percentage.
pub fn system_notification_confidence(raw_match_percentage: f64) -> f64 {
    (85.0 + raw_match_percentage * 0.05).min(90.0)
}
