//! Detections produced by the perception pipeline.
//!
//! A [`DetectionSnapshot`] is the full perception result for one instant.
//! The engine treats it as read-only for the duration of a node visit.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Serialized as a four element array `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    /// Left edge.
    pub x1: i32,
    /// Top edge.
    pub y1: i32,
    /// Right edge.
    pub x2: i32,
    /// Bottom edge.
    pub y2: i32,
}

impl BBox {
    /// Creates a bounding box from its corners.
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the exact center of the box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (f64::from(self.x1) + f64::from(self.x2)) / 2.0,
            (f64::from(self.y1) + f64::from(self.y2)) / 2.0,
        )
    }

    /// Returns the center truncated toward zero to whole pixels.
    #[must_use]
    pub fn pixel_center(&self) -> (i32, i32) {
        let (cx, cy) = self.center();
        (cx as i32, cy as i32)
    }

    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

impl From<[i32; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A labeled region with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Target label (template name).
    pub label: String,
    /// Region in frame coordinates.
    pub bbox: BBox,
    /// Match confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

impl Detection {
    /// Creates a detection.
    #[must_use]
    pub fn new(label: impl Into<String>, bbox: BBox, confidence: f64) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }
}

/// Perception result for a single instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    /// Every detection found in the frame.
    #[serde(default)]
    pub found_targets: Vec<Detection>,
    /// The raw frame, when the perception pipeline kept it.
    #[serde(skip)]
    pub frame: Option<Frame>,
}

impl DetectionSnapshot {
    /// Creates a snapshot without a frame.
    #[must_use]
    pub fn new(found_targets: Vec<Detection>) -> Self {
        Self {
            found_targets,
            frame: None,
        }
    }

    /// Creates a snapshot with no detections and no frame.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attaches a frame.
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Returns the first detection whose label matches exactly.
    #[must_use]
    pub fn find_label(&self, label: &str) -> Option<&Detection> {
        self.found_targets.iter().find(|d| d.label == label)
    }

    /// Returns `true` if any detection with `label` reaches `min_confidence`.
    #[must_use]
    pub fn has_label_above(&self, label: &str, min_confidence: f64) -> bool {
        self.found_targets
            .iter()
            .any(|d| d.label == label && d.confidence >= min_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_size_saturates_on_extreme_corners() {
        let b = BBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(b.width(), i32::MAX);
        assert_eq!(b.height(), i32::MAX);

        let inverted = BBox::new(i32::MAX, 0, i32::MIN, 0);
        assert_eq!(inverted.width(), i32::MIN);
    }

    #[test]
    fn bbox_center_and_size() {
        let b = BBox::new(10, 20, 31, 40);
        assert_eq!(b.center(), (20.5, 30.0));
        assert_eq!(b.pixel_center(), (20, 30));
        assert_eq!(b.width(), 21);
        assert_eq!(b.height(), 20);
    }

    #[test]
    fn bbox_serializes_as_array() {
        let b = BBox::new(1, 2, 3, 4);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn detection_confidence_defaults_to_zero() {
        let det: Detection = serde_json::from_str(r#"{"label":"A","bbox":[0,0,10,10]}"#).unwrap();
        assert_eq!(det.label, "A");
        assert!(det.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn find_label_returns_first_match() {
        let snapshot = DetectionSnapshot::new(vec![
            Detection::new("A", BBox::new(0, 0, 1, 1), 0.5),
            Detection::new("A", BBox::new(5, 5, 6, 6), 0.9),
        ]);
        let det = snapshot.find_label("A").unwrap();
        assert_eq!(det.bbox, BBox::new(0, 0, 1, 1));
        assert!(snapshot.find_label("B").is_none());
    }

    #[test]
    fn has_label_above_checks_any_match() {
        let snapshot = DetectionSnapshot::new(vec![
            Detection::new("A", BBox::new(0, 0, 1, 1), 0.5),
            Detection::new("A", BBox::new(5, 5, 6, 6), 0.9),
        ]);
        assert!(snapshot.has_label_above("A", 0.8));
        assert!(!snapshot.has_label_above("A", 0.95));
    }

    #[test]
    fn snapshot_without_targets_deserializes() {
        let snapshot: DetectionSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.found_targets.is_empty());
        assert!(snapshot.frame.is_none());
    }
}
