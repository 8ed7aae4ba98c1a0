//! 2D vector math for particle positions, velocities and pointer coordinates.
//!
//! [`Vector2`] is `glam::DVec2`: add, subtract, scale and distance come from
//! glam. The helpers here cover the few operations the engine needs on top
//! of that, mostly guarding against non-finite values.

use glam::DVec2;

/// A 2D point or vector in field-local pixel coordinates.
pub type Vector2 = DVec2;

/// Position used for an inactive pointer. Far enough outside any realistic
/// surface that distance-based forces evaluate to zero.
pub const OFFSCREEN: Vector2 = DVec2::new(-9999.0, -9999.0);

/// Distances below this are treated as coincident points.
pub const MIN_DISTANCE: f64 = 1e-6;

/// Unit vector pointing from `from` toward `to`.
///
/// When the points coincide (or the result would not be finite) the
/// direction falls back to `+X` so callers never divide by zero.
pub fn direction(from: Vector2, to: Vector2) -> Vector2 {
    let delta = to - from;
    if delta.length() < MIN_DISTANCE {
        return DVec2::X;
    }
    delta.try_normalize().unwrap_or(DVec2::X)
}

/// Linear interpolation from `a` toward `b` by factor `t`.
pub fn approach(a: Vector2, b: Vector2, t: f64) -> Vector2 {
    a + (b - a) * t
}

/// Returns `candidate` if both components are finite, otherwise `fallback`.
pub fn finite_or(candidate: Vector2, fallback: Vector2) -> Vector2 {
    if candidate.is_finite() {
        candidate
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn direction_is_unit_length() {
        let d = direction(Vector2::new(1.0, 1.0), Vector2::new(4.0, 5.0));
        assert!((d.length() - 1.0).abs() < EPSILON);
        assert!((d.x - 0.6).abs() < EPSILON);
        assert!((d.y - 0.8).abs() < EPSILON);
    }

    #[test]
    fn direction_of_coincident_points_falls_back_to_x() {
        let p = Vector2::new(3.0, 3.0);
        assert_eq!(direction(p, p), DVec2::X);
    }

    #[test]
    fn approach_endpoints() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, -10.0);
        assert_eq!(approach(a, b, 0.0), a);
        assert_eq!(approach(a, b, 1.0), b);
        assert_eq!(approach(a, b, 0.5), Vector2::new(5.0, -5.0));
    }

    #[test]
    fn finite_or_rejects_nan_and_infinity() {
        let fallback = Vector2::new(1.0, 2.0);
        assert_eq!(finite_or(Vector2::new(f64::NAN, 0.0), fallback), fallback);
        assert_eq!(
            finite_or(Vector2::new(0.0, f64::INFINITY), fallback),
            fallback
        );
        let ok = Vector2::new(-4.0, 7.5);
        assert_eq!(finite_or(ok, fallback), ok);
    }

    #[test]
    fn offscreen_sentinel_is_far_from_origin() {
        assert!(OFFSCREEN.distance(Vector2::ZERO) > 10_000.0);
    }
}
