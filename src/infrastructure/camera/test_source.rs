//! Test Frame Source
//!
//! A synthetic `FrameSource` that replays a fixed sequence of frames, used
//! by pipeline/integration tests and demo runs that have no real camera.
//! Cycles back to the start once exhausted so a long-running test can pull
//! frames indefinitely; each replayed frame gets a freshly stamped
//! `captured_at` so staleness checks behave as if it were freshly captured.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::pipeline::clock::Clock;
use crate::domain::entities::Frame;
use crate::domain::ports::FrameSource;

pub struct TestFrameSource {
    frames: Vec<Frame>,
    cursor: AtomicUsize,
    clock: Arc<dyn Clock>,
    released: Mutex<bool>,
}

impl TestFrameSource {
    pub fn new(frames: Vec<Frame>, clock: Arc<dyn Clock>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
            clock,
            released: Mutex::new(false),
        }
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock().unwrap()
    }
}

impl FrameSource for TestFrameSource {
    fn read_frame(&self) -> anyhow::Result<Option<Frame>> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        let template = &self.frames[i];
        Ok(Some(Frame::new(
            template.data().to_vec(),
            template.width(),
            template.height(),
            self.clock.now(),
        )))
    }

    fn release(&self) {
        *self.released.lock().unwrap() = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::clock::ManualClock;

    fn frame() -> Frame {
        Frame::new(vec![1u8; 4 * 4 * 3], 4, 4, 0.0)
    }

    #[test]
    fn cycles_through_frames() {
        let source = TestFrameSource::new(vec![frame(), frame()], Arc::new(ManualClock::new(0.0)));
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_some());
    }

    #[test]
    fn empty_source_always_returns_none() {
        let source = TestFrameSource::new(vec![], Arc::new(ManualClock::new(0.0)));
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn release_is_observable() {
        let source = TestFrameSource::new(vec![frame()], Arc::new(ManualClock::new(0.0)));
        assert!(!source.is_released());
        source.release();
        assert!(source.is_released());
    }
}
