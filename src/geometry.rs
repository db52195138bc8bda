//! 2D geometry helpers shared by the track, vehicle and AI modules.
//!
//! Everything here is a pure function over plain values. Degenerate inputs
//! (zero-length segments, parallel lines) fall back to sentinels instead of
//! producing NaN.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Denominator below which two segments are treated as parallel.
const PARALLEL_EPSILON: f64 = 0.0001;

/// Slack on the segment parameters so that an endpoint lying exactly on the
/// other segment still counts as a hit despite rounding.
const SEGMENT_PARAM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians).
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn add(&self, other: &Point2D) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn sub(&self, other: &Point2D) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the zero vector for a zero-length input.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::default()
        }
    }

    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotate counter-clockwise (in a y-up frame) by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Heading of the vector from `self` to `other`.
    pub fn angle_to(&self, other: &Point2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Wrap an angle into `[-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed shortest rotation from heading `from` to heading `to`, in `[-PI, PI]`.
pub fn angle_difference(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Intersection point of segments `p1-p2` and `p3-p4`, if they cross.
///
/// Parallel or degenerate segments never intersect.
pub fn line_intersection(p1: &Point2D, p2: &Point2D, p3: &Point2D, p4: &Point2D) -> Option<Point2D> {
    let denominator = (p4.y - p3.y) * (p2.x - p1.x) - (p4.x - p3.x) * (p2.y - p1.y);

    if denominator.abs() < PARALLEL_EPSILON {
        return None;
    }

    let ua = ((p4.x - p3.x) * (p1.y - p3.y) - (p4.y - p3.y) * (p1.x - p3.x)) / denominator;
    let ub = ((p2.x - p1.x) * (p1.y - p3.y) - (p2.y - p1.y) * (p1.x - p3.x)) / denominator;

    let in_range = |u: f64| (-SEGMENT_PARAM_EPSILON..=1.0 + SEGMENT_PARAM_EPSILON).contains(&u);
    if in_range(ua) && in_range(ub) {
        Some(Point2D {
            x: p1.x + ua * (p2.x - p1.x),
            y: p1.y + ua * (p2.y - p1.y),
        })
    } else {
        None
    }
}

/// Even-odd ray casting test. Results exactly on an edge are unspecified.
pub fn point_in_polygon(point: &Point2D, polygon: &[Point2D]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        let crosses = (yi > point.y) != (yj > point.y)
            && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Shortest distance from `point` to the segment `a-b`.
///
/// A zero-length segment degrades to the distance to `a`.
pub fn distance_to_segment(point: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let ab = b.sub(a);
    let ap = point.sub(a);
    let len_sq = ab.dot(&ab);

    let closest = if len_sq == 0.0 {
        *a
    } else {
        let t = ap.dot(&ab) / len_sq;
        if t < 0.0 {
            *a
        } else if t > 1.0 {
            *b
        } else {
            a.add(&ab.scale(t))
        }
    };

    point.distance_to(&closest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_vector_ops() {
        let a = Point2D::new(3.0, 4.0);
        let b = Point2D::new(1.0, -2.0);

        assert_eq!(a.add(&b), Point2D::new(4.0, 2.0));
        assert_eq!(a.sub(&b), Point2D::new(2.0, 6.0));
        assert_eq!(a.scale(2.0), Point2D::new(6.0, 8.0));
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.dot(&b), -5.0);
        assert!((a.normalize().length() - 1.0).abs() < 1e-12);
        assert_eq!(Point2D::default().normalize(), Point2D::default());
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Point2D::new(1.0, 0.0).rotate(PI / 2.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_difference_wraps() {
        let diff = angle_difference(PI - 0.1, -PI + 0.1);
        assert!((diff - 0.2).abs() < 1e-9, "expected short way round, got {}", diff);

        let diff = angle_difference(0.0, -0.5);
        assert!((diff + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_line_intersection_crossing() {
        let hit = line_intersection(
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 10.0),
            &Point2D::new(0.0, 10.0),
            &Point2D::new(10.0, 0.0),
        );
        let hit = hit.expect("diagonals should cross");
        assert!((hit.x - 5.0).abs() < 1e-9);
        assert!((hit.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_intersection_miss_and_parallel() {
        let miss = line_intersection(
            &Point2D::new(0.0, 0.0),
            &Point2D::new(1.0, 0.0),
            &Point2D::new(5.0, -1.0),
            &Point2D::new(5.0, 1.0),
        );
        assert!(miss.is_none());

        let parallel = line_intersection(
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 0.0),
            &Point2D::new(0.0, 1.0),
            &Point2D::new(10.0, 1.0),
        );
        assert!(parallel.is_none());

        let degenerate = line_intersection(
            &Point2D::new(3.0, 3.0),
            &Point2D::new(3.0, 3.0),
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 10.0),
        );
        assert!(degenerate.is_none());
    }

    #[test]
    fn test_line_intersection_endpoint_on_segment() {
        let hit = line_intersection(
            &Point2D::new(5.0, 0.0),
            &Point2D::new(5.0, 3.0),
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 0.0),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = square();
        assert!(point_in_polygon(&Point2D::new(5.0, 5.0), &poly));
        assert!(!point_in_polygon(&Point2D::new(15.0, 5.0), &poly));
        assert!(!point_in_polygon(&Point2D::new(-1.0, -1.0), &poly));
        assert!(!point_in_polygon(&Point2D::new(5.0, 5.0), &poly[..2]));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 0.0);

        assert!((distance_to_segment(&Point2D::new(5.0, 3.0), &a, &b) - 3.0).abs() < 1e-12);
        assert!((distance_to_segment(&Point2D::new(-3.0, 4.0), &a, &b) - 5.0).abs() < 1e-12);
        assert!((distance_to_segment(&Point2D::new(13.0, 4.0), &a, &b) - 5.0).abs() < 1e-12);
        // zero-length segment
        assert!((distance_to_segment(&Point2D::new(3.0, 4.0), &a, &a) - 5.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_normalize_angle_in_range(angle in -100.0f64..100.0) {
            let a = normalize_angle(angle);
            prop_assert!(a >= -PI && a <= PI);
            // same direction
            prop_assert!((a.sin() - angle.sin()).abs() < 1e-9);
            prop_assert!((a.cos() - angle.cos()).abs() < 1e-9);
        }

        #[test]
        fn prop_segment_distance_bounded_by_endpoints(
            px in -500.0f64..500.0, py in -500.0f64..500.0,
            ax in -500.0f64..500.0, ay in -500.0f64..500.0,
            bx in -500.0f64..500.0, by in -500.0f64..500.0,
        ) {
            let p = Point2D::new(px, py);
            let a = Point2D::new(ax, ay);
            let b = Point2D::new(bx, by);
            let d = distance_to_segment(&p, &a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= p.distance_to(&a) + 1e-9);
            prop_assert!(d <= p.distance_to(&b) + 1e-9);
        }

        #[test]
        fn prop_intersection_lies_on_both_segments(
            ax in -100.0f64..100.0, ay in -100.0f64..100.0,
            bx in -100.0f64..100.0, by in -100.0f64..100.0,
            cx in -100.0f64..100.0, cy in -100.0f64..100.0,
            dx in -100.0f64..100.0, dy in -100.0f64..100.0,
        ) {
            let (a, b, c, d) = (
                Point2D::new(ax, ay),
                Point2D::new(bx, by),
                Point2D::new(cx, cy),
                Point2D::new(dx, dy),
            );
            if let Some(hit) = line_intersection(&a, &b, &c, &d) {
                prop_assert!(distance_to_segment(&hit, &a, &b) < 1e-3);
                prop_assert!(distance_to_segment(&hit, &c, &d) < 1e-3);
            }
        }
    }
}
