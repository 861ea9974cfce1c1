//! Ray type for path tracing.
//!
//! A ray is defined by an origin point, a direction vector, a valid
//! parameter interval [tmin, tmax], and a time value reserved for future
//! motion blur support (unused by the current integrators).

use bif_math::Vec3;

/// A ray with origin, direction, and a mutable tmax used to tighten the
/// search interval as closer hits are found during traversal.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tmin: f32,
    pub tmax: f32,
    pub time: f32,
}

impl Ray {
    /// Create a new ray. Panics if `tmin > tmax`, matching the invariant
    /// that the interval must be valid at construction.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3, tmin: f32, tmax: f32) -> Self {
        debug_assert!(tmin <= tmax, "ray interval must satisfy tmin <= tmax");
        Self {
            origin,
            direction,
            tmin,
            tmax,
            time: 0.0,
        }
    }

    /// Convenience constructor for primary rays: [RAY_EPSILON, +inf).
    #[inline]
    pub fn new_primary(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction, crate::RAY_EPSILON as f32, f32::INFINITY)
    }

    #[inline]
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// Compute a point along the ray at parameter t: origin + t * direction.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            tmin: 0.0,
            tmax: f32::INFINITY,
            time: 0.0,
        }
    }
}
