//! Owned BGR8 frames.

use core::fmt;
use std::sync::Arc;

use crate::detection::BBox;
use crate::error::VisionError;

/// Bytes per pixel (blue, green, red).
const CHANNELS: usize = 3;

/// A captured screen frame stored as tightly packed BGR8 rows.
///
/// The pixel buffer is reference counted, so cloning a frame (and therefore
/// a snapshot) is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Creates a frame, checking that the buffer matches the dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::InvalidFrame`] if `pixels.len() != width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Result<Self, VisionError> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(VisionError::InvalidFrame {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Creates a frame filled with a single BGR color.
    #[must_use]
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&bgr);
        }
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Returns a copy of this frame with the given box painted in `bgr`.
    ///
    /// The box is clamped to the frame; `x2`/`y2` are exclusive.
    #[must_use]
    pub fn with_rect(&self, rect: BBox, bgr: [u8; 3]) -> Self {
        let mut pixels = self.pixels.to_vec();
        let (x1, y1, x2, y2) = self.clamp(rect);
        for y in y1..y2 {
            for x in x1..x2 {
                let at = self.offset(x, y);
                pixels[at..at + CHANNELS].copy_from_slice(&bgr);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            pixels: pixels.into(),
        }
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGR bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns `true` if `(x, y)` lies inside the frame.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Returns the BGR value at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        if !self.contains(x, y) {
            return None;
        }
        let at = self.offset(x as u32, y as u32);
        Some([self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]])
    }

    /// Copies out the region `rect` (clamped to the frame, exclusive max corner).
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::EmptyRegion`] when nothing is left after clamping.
    pub fn crop(&self, rect: BBox) -> Result<Frame, VisionError> {
        let (x1, y1, x2, y2) = self.clamp(rect);
        if x2 <= x1 || y2 <= y1 {
            return Err(VisionError::EmptyRegion);
        }
        let row_len = (x2 - x1) as usize * CHANNELS;
        let mut pixels = Vec::with_capacity(row_len * (y2 - y1) as usize);
        for y in y1..y2 {
            let start = self.offset(x1, y);
            pixels.extend_from_slice(&self.pixels[start..start + row_len]);
        }
        Frame::new(x2 - x1, y2 - y1, pixels)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    fn clamp(&self, rect: BBox) -> (u32, u32, u32, u32) {
        let clamp_x = |v: i32| v.clamp(0, self.width as i32) as u32;
        let clamp_y = |v: i32| v.clamp(0, self.height as i32) as u32;
        (
            clamp_x(rect.x1),
            clamp_y(rect.y1),
            clamp_x(rect.x2),
            clamp_y(rect.y2),
        )
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
