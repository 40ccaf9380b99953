//! Dlib-style ONNX Face Model
//!
//! A 128-D embedding model family: a lightweight detector session finds
//! face boxes, and a separate embedder session computes the 128-D vector
//! for a crop on demand. Each `ort::Session` is built once at load time and
//! reused across every subsequent call, keeping `ort` as the one inference
//! runtime in the crate rather than mixing in a second detector library.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, CowArray};
use ort::{Session, Value};
use tracing::warn;

use crate::domain::entities::{Face, FaceCrop, Frame};
use crate::domain::ports::FaceModel;
use crate::domain::value_objects::{BoundingBox, Embedding, EmbeddingKind};

const EMBEDDER_INPUT_SIZE: u32 = 112;
const DETECTOR_SCORE_THRESHOLD: f32 = 0.6;

/// `ort::Session` is not `Sync`; a single dedicated model thread drives
/// both sessions in this engine, but the sessions are still wrapped in a
/// `Mutex` so the model can be shared if a future caller needs it from
/// more than one thread.
pub struct DlibOnnxModel {
    detector: Mutex<Session>,
    embedder: Mutex<Session>,
}

impl DlibOnnxModel {
    pub fn load(detector_path: &Path, embedder_path: &Path) -> anyhow::Result<Self> {
        let detector = Session::builder()?.commit_from_file(detector_path)?;
        let embedder = Session::builder()?.commit_from_file(embedder_path)?;
        Ok(Self {
            detector: Mutex::new(detector),
            embedder: Mutex::new(embedder),
        })
    }

    fn frame_to_nchw(data: &[u8], width: u32, height: u32, target: u32) -> Array4<f32> {
        let image = image::RgbImage::from_raw(width, height, data.to_vec())
            .expect("frame buffer size must match width*height*3");
        let resized = image::imageops::resize(
            &image,
            target,
            target,
            image::imageops::FilterType::Triangle,
        );

        let mut tensor = Array4::<f32>::zeros((1, 3, target as usize, target as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - 0.5) / 0.5;
            }
        }
        tensor
    }
}

impl FaceModel for DlibOnnxModel {
    fn embedding_kind(&self) -> EmbeddingKind {
        EmbeddingKind::Dlib
    }

    fn detect(&self, frame: &Frame) -> anyhow::Result<Vec<Face>> {
        let tensor = Self::frame_to_nchw(frame.data(), frame.width(), frame.height(), 320);
        let input = CowArray::from(tensor).into_dyn();

        let mut session = self.detector.lock().unwrap();
        let outputs = session.run(ort::inputs![Value::from_array(session.allocator(), &input)?]?)?;

        let boxes = outputs[0].extract_tensor::<f32>()?;
        let scores = outputs[1].extract_tensor::<f32>()?;
        let boxes = boxes.view();
        let scores = scores.view();

        let mut faces = Vec::new();
        for i in 0..scores.len() {
            let score = scores[[i]];
            if score < DETECTOR_SCORE_THRESHOLD {
                continue;
            }
            let x1 = boxes[[i, 0]] * frame.width() as f32;
            let y1 = boxes[[i, 1]] * frame.height() as f32;
            let x2 = boxes[[i, 2]] * frame.width() as f32;
            let y2 = boxes[[i, 3]] * frame.height() as f32;
            let box_ = BoundingBox::from_corners(x1 as i32, y1 as i32, x2 as i32, y2 as i32);
            faces.push(Face::new(box_, None));
        }

        Ok(faces)
    }

    fn embed(&self, crop: &FaceCrop) -> anyhow::Result<Option<Embedding>> {
        if crop.is_empty() {
            return Ok(None);
        }

        let tensor = Self::frame_to_nchw(crop.data(), crop.width(), crop.height(), EMBEDDER_INPUT_SIZE);
        let input = CowArray::from(tensor).into_dyn();

        let mut session = self.embedder.lock().unwrap();
        let outputs = session.run(ort::inputs![Value::from_array(session.allocator(), &input)?]?)?;
        let values = outputs[0].extract_tensor::<f32>()?;
        let values: Vec<f32> = values.view().iter().copied().collect();

        match Embedding::new(EmbeddingKind::Dlib, values) {
            Ok(embedding) => Ok(Some(embedding)),
            Err(err) => {
                warn!(error = %err, "embedder produced unexpected vector length");
                Ok(None)
            }
        }
    }
}
