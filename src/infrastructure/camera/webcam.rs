//! Webcam Frame Source
//!
//! Blocking, non-async `FrameSource` backed by `nokhwa`. Opens the device
//! lazily on the first read rather than at construction time, so an engine
//! can be constructed before a camera is physically available. `nokhwa::Camera`
//! is not `Sync`; it is confined behind a `Mutex` and the wrapper is declared
//! `Send`/`Sync` explicitly, the usual pattern for a non-`Send` native handle
//! shared across threads.

use std::sync::Mutex;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{info, warn};

use crate::domain::entities::Frame;
use crate::domain::ports::FrameSource;

pub struct WebcamFrameSource {
    index: CameraIndex,
    camera: Mutex<Option<Camera>>,
    clock: std::sync::Arc<dyn crate::application::pipeline::clock::Clock>,
}

unsafe impl Send for WebcamFrameSource {}
unsafe impl Sync for WebcamFrameSource {}

impl WebcamFrameSource {
    pub fn new(
        device_index: u32,
        clock: std::sync::Arc<dyn crate::application::pipeline::clock::Clock>,
    ) -> Self {
        Self {
            index: CameraIndex::Index(device_index),
            camera: Mutex::new(None),
            clock,
        }
    }

    fn ensure_open<'a>(&self, guard: &'a mut Option<Camera>) -> anyhow::Result<&'a mut Camera> {
        if guard.is_none() {
            info!(index = ?self.index, "opening camera device");
            let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let camera = Camera::new(self.index.clone(), format)?;
            *guard = Some(camera);
        }
        Ok(guard.as_mut().expect("camera just initialised"))
    }
}

impl FrameSource for WebcamFrameSource {
    fn read_frame(&self) -> anyhow::Result<Option<Frame>> {
        let mut guard = self.camera.lock().unwrap();
        let camera = match self.ensure_open(&mut guard) {
            Ok(camera) => camera,
            Err(err) => {
                warn!(error = %err, "failed to open camera device");
                return Ok(None);
            }
        };

        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(error = %err, "camera frame read failed");
                return Ok(None);
            }
        };

        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "camera frame decode failed");
                return Ok(None);
            }
        };

        let (width, height) = (decoded.width(), decoded.height());
        Ok(Some(Frame::new(
            decoded.into_raw(),
            width,
            height,
            self.clock.now(),
        )))
    }

    fn release(&self) {
        let mut guard = self.camera.lock().unwrap();
        if let Some(mut camera) = guard.take() {
            if let Err(err) = camera.stop_stream() {
                warn!(error = %err, "failed to stop camera stream cleanly");
            }
        }
    }
}
