//! Color ranges and color-region search.
//!
//! Ranges follow the OpenCV 8-bit conventions: BGR channels in `0..=255`,
//! hue in `0..180` and saturation/value in `0..=255`.

use std::collections::VecDeque;

use crate::detection::BBox;
use crate::error::VisionError;
use crate::frame::Frame;

/// Inclusive color range used by color-matching nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRange {
    /// Range over hue, saturation and value.
    Hsv {
        /// Lower bound `[h, s, v]`.
        min: [u8; 3],
        /// Upper bound `[h, s, v]`.
        max: [u8; 3],
    },
    /// Range over blue, green and red.
    Bgr {
        /// Lower bound `[b, g, r]`.
        min: [u8; 3],
        /// Upper bound `[b, g, r]`.
        max: [u8; 3],
    },
}

impl ColorRange {
    /// Returns `true` if the BGR pixel falls inside the range.
    #[must_use]
    pub fn matches(&self, bgr: [u8; 3]) -> bool {
        match self {
            ColorRange::Hsv { min, max } => within(bgr_to_hsv(bgr), *min, *max),
            ColorRange::Bgr { min, max } => within(bgr, *min, *max),
        }
    }
}

fn within(value: [u8; 3], min: [u8; 3], max: [u8; 3]) -> bool {
    (0..3).all(|i| min[i] <= value[i] && value[i] <= max[i])
}

/// Converts a BGR8 pixel to 8-bit HSV (`h` halved into `0..180`).
#[must_use]
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
    let (b, g, r) = (f64::from(b), f64::from(g), f64::from(r));
    let v = b.max(g).max(r);
    let min = b.min(g).min(r);
    let diff = v - min;

    let s = if v > 0.0 { diff / v * 255.0 } else { 0.0 };
    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u16 % 180) as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// Searches a frame for regions whose pixels fall inside a [`ColorRange`].
///
/// This is the perception delegate used by `find_color`, `condition`
/// (color mode) and `verify_image_color` nodes.
pub trait ColorSearch: Send + Sync {
    /// Returns the bounding boxes of every matching region, in frame coordinates.
    ///
    /// # Errors
    ///
    /// Implementations return a [`VisionError`] when the search itself fails;
    /// "nothing found" is an empty vector, not an error.
    fn find_color(&self, frame: &Frame, range: &ColorRange) -> Result<Vec<BBox>, VisionError>;
}

/// Pixel thresholding followed by 4-connected component labelling.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdColorSearch {
    min_area: usize,
}

impl Default for ThresholdColorSearch {
    fn default() -> Self {
        Self { min_area: 1 }
    }
}

impl ThresholdColorSearch {
    /// Creates a search that reports every component, however small.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores components with fewer than `min_area` pixels.
    #[must_use]
    pub fn with_min_area(mut self, min_area: usize) -> Self {
        self.min_area = min_area.max(1);
        self
    }
}

impl ColorSearch for ThresholdColorSearch {
    fn find_color(&self, frame: &Frame, range: &ColorRange) -> Result<Vec<BBox>, VisionError> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let bytes = frame.as_bytes();
        let mut mask: Vec<bool> = bytes
            .chunks_exact(3)
            .map(|px| range.matches([px[0], px[1], px[2]]))
            .collect();

        let mut regions = Vec::new();
        let mut queue = VecDeque::new();
        for start in 0..mask.len() {
            if !mask[start] {
                continue;
            }
            mask[start] = false;
            queue.push_back(start);

            let (mut x1, mut y1, mut x2, mut y2) = (w, h, 0, 0);
            let mut area = 0usize;
            while let Some(at) = queue.pop_front() {
                let (x, y) = (at % w, at / w);
                area += 1;
                x1 = x1.min(x);
                y1 = y1.min(y);
                x2 = x2.max(x + 1);
                y2 = y2.max(y + 1);

                let mut visit = |n: usize| {
                    if mask[n] {
                        mask[n] = false;
                        queue.push_back(n);
                    }
                };
                if x > 0 {
                    visit(at - 1);
                }
                if x + 1 < w {
                    visit(at + 1);
                }
                if y > 0 {
                    visit(at - w);
                }
                if y + 1 < h {
                    visit(at + w);
                }
            }

            if area >= self.min_area {
                regions.push(BBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32));
            }
        }
        Ok(regions)
    }
}
