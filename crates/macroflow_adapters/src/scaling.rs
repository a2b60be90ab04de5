//! Logical to physical coordinate scaling.
//!
//! Detections are reported in the capture's logical coordinates; pointer
//! motion happens in physical screen pixels. The ratio between the two is a
//! constant of the engine instance.

/// Reference width that maps to a scale factor of `1.0`.
pub const BASE_WIDTH: u32 = 1920;

/// Derives a scale factor from the physical screen width.
///
/// Never returns less than `1.0`; a `base_width` of zero yields `1.0`.
#[must_use]
pub fn detect_scale_factor(screen_width: u32, base_width: u32) -> f64 {
    if base_width == 0 {
        return 1.0;
    }
    (f64::from(screen_width) / f64::from(base_width)).max(1.0)
}

/// Scales a logical point, truncating toward zero.
#[must_use]
pub fn logical_to_physical(x: i32, y: i32, scale: f64) -> (i32, i32) {
    scale_point(f64::from(x), f64::from(y), scale)
}

/// Scales a fractional logical point (such as a box center), truncating toward zero.
#[must_use]
pub fn scale_point(x: f64, y: f64, scale: f64) -> (i32, i32) {
    ((x * scale) as i32, (y * scale) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_to_physical_scales_and_truncates() {
        assert_eq!(logical_to_physical(100, 200, 1.25), (125, 250));
        assert_eq!(logical_to_physical(3, 3, 1.5), (4, 4));
    }

    #[test]
    fn scale_point_uses_fractional_center() {
        assert_eq!(scale_point(20.5, 30.0, 2.0), (41, 60));
    }

    #[test]
    fn scale_factor_never_below_one() {
        assert!((detect_scale_factor(3840, BASE_WIDTH) - 2.0).abs() < f64::EPSILON);
        assert!((detect_scale_factor(1280, BASE_WIDTH) - 1.0).abs() < f64::EPSILON);
        assert!((detect_scale_factor(2560, 0) - 1.0).abs() < f64::EPSILON);
    }
}
