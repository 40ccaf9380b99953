mod arcface_onnx;
mod dlib_onnx;
mod yolo_weapon;

pub use arcface_onnx::*;
pub use dlib_onnx::*;
pub use yolo_weapon::*;
