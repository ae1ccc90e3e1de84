//! Captured frame buffers and the pixel operations the pipeline needs.

use std::time::Instant;

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, RgbImage};

/// A single captured video frame.
///
/// Pixels are tightly packed RGB8. Frames are immutable once captured; stages
/// that need a different size produce a new frame. The capture timestamp is
/// carried through scaling so that temporal statistics always see the moment
/// the pixels left the camera.
#[derive(Clone)]
pub struct Frame {
    image: RgbImage,
    timestamp: Instant,
}

impl Frame {
    /// Wraps a decoded RGB image, timestamping it with the current instant.
    pub fn new(image: RgbImage) -> Self {
        Self::with_timestamp(image, Instant::now())
    }

    pub fn with_timestamp(image: RgbImage, timestamp: Instant) -> Self {
        Self { image, timestamp }
    }

    /// Decodes an encoded image (JPEG, PNG) into a frame.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)?.into_rgb8();
        Ok(Self::new(image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Encodes the frame as JPEG at the given quality (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder.write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            ColorType::Rgb8,
        )?;
        Ok(buffer)
    }

    /// Returns a copy downscaled so its width becomes `target_width`,
    /// preserving aspect ratio. Frames already at or below the target width
    /// are returned unchanged; this never upscales.
    pub fn scale_to_width(&self, target_width: u32) -> Frame {
        if self.width() <= target_width {
            return self.clone();
        }
        let scale = target_width as f32 / self.width() as f32;
        let height = ((self.height() as f32 * scale) as u32).max(1);
        let image = imageops::resize(&self.image, target_width, height, FilterType::Triangle);
        Frame {
            image,
            timestamp: self.timestamp,
        }
    }
}
