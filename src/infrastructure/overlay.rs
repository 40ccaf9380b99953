//! Frame Overlay & Encoding
//!
//! Draws bounding-box rectangles and text labels onto a frame buffer and
//! encodes the result as JPEG for publication through the `FrameSink`. Kept
//! as a plain concrete helper rather than a port — nothing swaps it out in
//! tests, they only assert on the numeric/queue behaviour around it.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use std::io::Cursor;
use tracing::warn;

use crate::domain::entities::Frame;
use crate::domain::value_objects::BoundingBox;

pub const GREEN: Rgb<u8> = Rgb([0, 220, 0]);
pub const RED: Rgb<u8> = Rgb([220, 0, 0]);

/// Loads an optional overlay font and draws/encodes frames. Safe to share
/// across stages (`Sync`) since `Font` holds only immutable glyph data.
pub struct FrameAnnotator {
    font: Option<Font<'static>>,
}

impl FrameAnnotator {
    /// Attempts to load a TrueType font from `path`. A missing or invalid
    /// font is logged once and treated as "draw boxes only, no text" for
    /// the rest of the engine's lifetime.
    pub fn load(path: Option<&std::path::Path>) -> Self {
        let font = path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => Font::try_from_vec(bytes).or_else(|| {
                warn!(?path, "overlay font could not be parsed, labels will be boxes only");
                None
            }),
            Err(err) => {
                warn!(?path, error = %err, "overlay font not readable, labels will be boxes only");
                None
            }
        });
        Self { font }
    }

    pub fn with_no_font() -> Self {
        Self { font: None }
    }

    /// Converts a raw [`Frame`] into a mutable RGB canvas for in-place
    /// annotation. Consumes the frame's pixel buffer directly — this is
    /// the one and only copy made per detection tick.
    pub fn to_canvas(frame: &Frame) -> Option<RgbImage> {
        RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
    }

    /// Draws a rectangle and, when a font is loaded, a text label above it.
    pub fn draw_box_with_label(
        &self,
        canvas: &mut RgbImage,
        box_: &BoundingBox,
        label: &str,
        color: Rgb<u8>,
    ) {
        if box_.width() <= 0 || box_.height() <= 0 {
            return;
        }
        let rect = Rect::at(box_.x(), box_.y()).of_size(box_.width() as u32, box_.height() as u32);
        draw_hollow_rect_mut(canvas, rect, color);

        if let Some(font) = &self.font {
            let scale = Scale::uniform(16.0);
            let text_y = (box_.y() - 18).max(0);
            draw_text_mut(canvas, color, box_.x(), text_y, scale, font, label);
        }
    }

    /// Encodes `canvas` as JPEG at `quality` (1-100).
    pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
        encoder.encode_image(canvas)?;
        Ok(bytes)
    }
}
