//! Threat Detection Entity
//!
//! Output of the weapon-detector variant's [`crate::domain::ports::ThreatModel`].

use crate::domain::value_objects::BoundingBox;

/// A single class-tagged detection from the weapon-detector model.
#[derive(Debug, Clone)]
pub struct ThreatDetection {
    box_: BoundingBox,
    confidence: f32,
    class_name: String,
}

impl ThreatDetection {
    pub fn new(box_: BoundingBox, confidence: f32, class_name: String) -> Self {
        Self {
            box_,
            confidence,
            class_name,
        }
    }

    pub fn box_(&self) -> &BoundingBox {
        &self.box_
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Overlay label in the `"{class} {pct}%"` format drawn on the frame.
    pub fn label(&self) -> String {
        format!("{} {:.0}%", self.class_name, self.confidence * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_formats_percentage() {
        let threat = ThreatDetection::new(BoundingBox::new(0, 0, 10, 10), 0.873, "knife".to_string());
        assert_eq!(threat.label(), "knife 87%");
    }
}
