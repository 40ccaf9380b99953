//! Frame Sink
//!
//! Holds the latest annotated frame as already-encoded JPEG bytes so a UI
//! layer can poll it without ever touching pipeline internals or blocking a
//! worker thread.

use std::sync::Mutex;

#[derive(Default)]
pub struct FrameSink {
    latest: Mutex<Option<Vec<u8>>>,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, jpeg_bytes: Vec<u8>) {
        *self.latest.lock().unwrap() = Some(jpeg_bytes);
    }

    pub fn latest(&self) -> Option<Vec<u8>> {
        self.latest.lock().unwrap().clone()
    }
}
