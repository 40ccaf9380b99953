//! YOLO Weapon Model
//!
//! `ThreatModel` implementation for the weapon-detector variant, grounded
//! on `plugins/models/yolo_weapon_plugin.py`'s `YOLOWeaponDetector`: a
//! single YOLO-family ONNX session producing class-tagged boxes, no
//! embedding step.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, CowArray};
use ort::{Session, Value};

use crate::domain::entities::{Frame, ThreatDetection};
use crate::domain::ports::ThreatModel;
use crate::domain::value_objects::BoundingBox;

const INPUT_SIZE: u32 = 640;
const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Class names in the order the model's output head emits them, matching
/// the training label map used by the original plugin.
const CLASS_NAMES: &[&str] = &["knife", "pistol", "rifle"];

pub struct YoloWeaponModel {
    session: Mutex<Session>,
}

impl YoloWeaponModel {
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        let session = Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    fn frame_to_nchw(frame: &Frame) -> Array4<f32> {
        let image = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .expect("frame buffer size must match width*height*3");
        let resized = image::imageops::resize(
            &image,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
        tensor
    }
}

impl ThreatModel for YoloWeaponModel {
    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<ThreatDetection>> {
        let tensor = Self::frame_to_nchw(frame);
        let input = CowArray::from(tensor).into_dyn();

        let mut session = self.session.lock().unwrap();
        let outputs = session.run(ort::inputs![Value::from_array(session.allocator(), &input)?]?)?;

        // Output layout: [N, 6] rows of (x1, y1, x2, y2, confidence, class_id),
        // coordinates normalised to the resized input.
        let detections = outputs[0].extract_tensor::<f32>()?;
        let detections = detections.view();

        let scale_x = frame.width() as f32 / INPUT_SIZE as f32;
        let scale_y = frame.height() as f32 / INPUT_SIZE as f32;

        let mut threats = Vec::new();
        for row in detections.rows() {
            let confidence = row[4];
            if confidence < CONFIDENCE_THRESHOLD {
                continue;
            }
            let class_id = row[5] as usize;
            let Some(class_name) = CLASS_NAMES.get(class_id) else {
                continue;
            };

            let box_ = BoundingBox::from_corners(
                (row[0] * scale_x) as i32,
                (row[1] * scale_y) as i32,
                (row[2] * scale_x) as i32,
                (row[3] * scale_y) as i32,
            );
            threats.push(ThreatDetection::new(box_, confidence, class_name.to_string()));
        }

        Ok(threats)
    }
}
