//! Pure geometry helpers for view translation.
//!
//! Two concerns live here: accumulating the bounding box of every shape
//! placed on a view, and interpolating connector bendpoints for dialects
//! that store them as offsets from the endpoint shapes rather than as
//! absolute coordinates.

use serde::{Deserialize, Serialize};

/// A point on a view, in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// An inclusive min/max range along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: i32,
    pub max: i32,
}

/// Bounding box of a view, accumulated over its shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub vertical: Range,
    pub horizontal: Range,
}

/// Running bounds accumulator.
///
/// Starts at inverted-infinite sentinels so the first shape always
/// replaces both extremes; [`BoundsAccumulator::finish`] clamps a
/// never-touched accumulator to a degenerate `{0, 0}` box instead of
/// exposing `min > max`.
#[derive(Debug, Clone, Copy)]
pub struct BoundsAccumulator {
    h_min: f64,
    h_max: f64,
    v_min: f64,
    v_max: f64,
}

impl BoundsAccumulator {
    pub fn new() -> Self {
        Self {
            h_min: f64::INFINITY,
            h_max: f64::NEG_INFINITY,
            v_min: f64::INFINITY,
            v_max: f64::NEG_INFINITY,
        }
    }

    /// Expand the box to cover a shape at `(x, y)` with the given size.
    pub fn expand(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let (x, y) = (f64::from(x), f64::from(y));
        self.h_min = self.h_min.min(x);
        self.h_max = self.h_max.max(x + f64::from(width));
        self.v_min = self.v_min.min(y);
        self.v_max = self.v_max.max(y + f64::from(height));
    }

    /// True if no shape has been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.h_min > self.h_max
    }

    pub fn finish(self) -> Bounds {
        if self.is_empty() {
            return Bounds {
                vertical: Range { min: 0, max: 0 },
                horizontal: Range { min: 0, max: 0 },
            };
        }
        Bounds {
            vertical: Range {
                min: self.v_min as i32,
                max: self.v_max as i32,
            },
            horizontal: Range {
                min: self.h_min as i32,
                max: self.h_max as i32,
            },
        }
    }
}

impl Default for BoundsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Center of a shape given its view-origin position and size.
pub fn shape_center(x: i32, y: i32, width: i32, height: i32) -> (f64, f64) {
    (
        f64::from(x) + f64::from(width) / 2.0,
        f64::from(y) + f64::from(height) / 2.0,
    )
}

/// Interpolate one bendpoint of a connector stored as endpoint offsets.
///
/// The point's position is the blend of the source and target shape
/// centers at weight `(index + 1) / (total + 1)`, with the bendpoint's
/// own source-relative delta scaled by `1 - weight` and its
/// target-relative delta by `weight`. A connector's bendpoints therefore
/// spread evenly along the straight line when all deltas are zero.
pub fn weighted_bendpoint(
    index: usize,
    total: usize,
    source_center: (f64, f64),
    target_center: (f64, f64),
    source_delta: (i32, i32),
    target_delta: (i32, i32),
) -> Point {
    let weight = (index as f64 + 1.0) / (total as f64 + 1.0);
    let x = source_center.0 * (1.0 - weight)
        + target_center.0 * weight
        + f64::from(source_delta.0) * (1.0 - weight)
        + f64::from(target_delta.0) * weight;
    let y = source_center.1 * (1.0 - weight)
        + target_center.1 * weight
        + f64::from(source_delta.1) * (1.0 - weight)
        + f64::from(target_delta.1) * weight;
    Point {
        x: x.round() as i32,
        y: y.round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_accumulation() {
        let mut acc = BoundsAccumulator::new();
        acc.expand(10, 20, 120, 55);
        let bounds = acc.finish();
        assert_eq!(bounds.horizontal, Range { min: 10, max: 130 });
        assert_eq!(bounds.vertical, Range { min: 20, max: 75 });
    }

    #[test]
    fn test_bounds_cover_multiple_shapes() {
        let mut acc = BoundsAccumulator::new();
        acc.expand(0, 0, 100, 50);
        acc.expand(-30, 200, 10, 10);
        acc.expand(500, 40, 20, 20);
        let bounds = acc.finish();
        assert_eq!(bounds.horizontal, Range { min: -30, max: 520 });
        assert_eq!(bounds.vertical, Range { min: 0, max: 210 });
    }

    #[test]
    fn test_empty_bounds_clamp_to_zero() {
        let acc = BoundsAccumulator::new();
        assert!(acc.is_empty());
        let bounds = acc.finish();
        assert_eq!(bounds.horizontal, Range { min: 0, max: 0 });
        assert_eq!(bounds.vertical, Range { min: 0, max: 0 });
    }

    #[test]
    fn test_single_bendpoint_is_the_midpoint() {
        // Shapes at (0,0,100,50) and (200,0,100,50), one zero-offset point.
        let point = weighted_bendpoint(0, 1, (50.0, 25.0), (250.0, 25.0), (0, 0), (0, 0));
        assert_eq!(point, Point { x: 150, y: 25 });
    }

    #[test]
    fn test_bendpoints_spread_evenly() {
        let source = (0.0, 0.0);
        let target = (300.0, 0.0);
        let first = weighted_bendpoint(0, 2, source, target, (0, 0), (0, 0));
        let second = weighted_bendpoint(1, 2, source, target, (0, 0), (0, 0));
        assert_eq!(first, Point { x: 100, y: 0 });
        assert_eq!(second, Point { x: 200, y: 0 });
    }

    #[test]
    fn test_deltas_are_weighted_by_endpoint() {
        // At weight 0.5 both deltas contribute half.
        let point = weighted_bendpoint(0, 1, (0.0, 0.0), (100.0, 0.0), (10, 20), (30, -20));
        assert_eq!(point, Point { x: 70, y: 0 });
    }

    #[test]
    fn test_shape_center() {
        assert_eq!(shape_center(10, 20, 120, 55), (70.0, 47.5));
    }
}
