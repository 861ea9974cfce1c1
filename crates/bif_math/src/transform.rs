// Transform utilities for Mat4
//
// Extends glam::Mat4 with convenience methods for ray tracing transformations.
// Note: glam::Mat4 already provides transform_point3() and inverse()

use crate::{Aabb, Ray};
use glam::{Mat4, Quat, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a vector in 3D space (applies rotation and scale, but NOT translation).
    /// Vectors have an implicit w=0 component.
    fn transform_vector3(&self, vector: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_vector3(&self, vector: Vec3) -> Vec3 {
        // Transform as direction (w=0) - translation should not affect vectors
        let v4 = Vec4::new(vector.x, vector.y, vector.z, 0.0);
        let transformed = *self * v4;
        Vec3::new(transformed.x, transformed.y, transformed.z)
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        // Transform all 8 corners and compute new AABB (no heap allocation)
        let min_p = Vec3::new(aabb.x.min, aabb.y.min, aabb.z.min);
        let max_p = Vec3::new(aabb.x.max, aabb.y.max, aabb.z.max);

        // Transform first corner to initialize min/max
        let first = self.transform_point3(min_p);
        let mut result_min = first;
        let mut result_max = first;

        // Transform remaining 7 corners, updating min/max inline
        for corner in [
            Vec3::new(max_p.x, min_p.y, min_p.z),
            Vec3::new(min_p.x, max_p.y, min_p.z),
            Vec3::new(max_p.x, max_p.y, min_p.z),
            Vec3::new(min_p.x, min_p.y, max_p.z),
            Vec3::new(max_p.x, min_p.y, max_p.z),
            Vec3::new(min_p.x, max_p.y, max_p.z),
            Vec3::new(max_p.x, max_p.y, max_p.z),
        ] {
            let t = self.transform_point3(corner);
            result_min = result_min.min(t);
            result_max = result_max.max(t);
        }

        Aabb::from_points(result_min, result_max)
    }
}

/// An affine transform that remembers both the forward matrix and its
/// inverse. The inverse is computed once at construction rather than
/// recomputed on every use, matching the convention of caching both halves
/// of a transform pair.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    m: Mat4,
    inv: Mat4,
}

impl Transform {
    /// Build a transform from a forward matrix, computing its inverse.
    pub fn new(m: Mat4) -> Self {
        Self { m, inv: m.inverse() }
    }

    /// Build a transform from a matrix whose inverse is already known
    /// (e.g. when composing), avoiding a redundant inversion.
    pub fn from_matrix_and_inverse(m: Mat4, inv: Mat4) -> Self {
        Self { m, inv }
    }

    pub const IDENTITY: Transform = Transform {
        m: Mat4::IDENTITY,
        inv: Mat4::IDENTITY,
    };

    pub fn from_translation(t: Vec3) -> Self {
        Self::new(Mat4::from_translation(t))
    }

    pub fn from_scale(s: Vec3) -> Self {
        Self::new(Mat4::from_scale(s))
    }

    pub fn from_rotation_x(radians: f32) -> Self {
        Self::new(Mat4::from_rotation_x(radians))
    }

    pub fn from_rotation_y(radians: f32) -> Self {
        Self::new(Mat4::from_rotation_y(radians))
    }

    pub fn from_rotation_z(radians: f32) -> Self {
        Self::new(Mat4::from_rotation_z(radians))
    }

    /// Rodrigues' rotation formula around an arbitrary axis.
    pub fn from_axis_angle(axis: Vec3, radians: f32) -> Self {
        Self::new(Mat4::from_axis_angle(axis.normalize(), radians))
    }

    pub fn from_quat(q: Quat) -> Self {
        Self::new(Mat4::from_quat(q))
    }

    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        // world-from-camera: inverse of the view matrix glam produces.
        let view = Mat4::look_at_rh(eye, target, up);
        Self::from_matrix_and_inverse(view.inverse(), view)
    }

    pub fn perspective(fovy_radians: f32, near: f32, far: f32) -> Self {
        Self::new(Mat4::perspective_rh(fovy_radians, 1.0, near, far))
    }

    pub fn matrix(&self) -> Mat4 {
        self.m
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        self.inv
    }

    /// Swap forward and inverse.
    pub fn inverse(&self) -> Transform {
        Transform {
            m: self.inv,
            inv: self.m,
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.m.transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.m.transform_vector3(v)
    }

    /// Normals transform by the inverse-transpose, not by the forward matrix.
    pub fn transform_normal(&self, n: Vec3) -> Vec3 {
        self.inv.transpose().transform_vector3(n)
    }

    pub fn transform_aabb(&self, b: &Aabb) -> Aabb {
        self.m.transform_aabb(b)
    }

    /// Transform a ray's origin and direction without renormalizing the
    /// direction, so t-values computed against the transformed ray remain
    /// consistent with the original ray's parameterization.
    pub fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point(ray.origin),
            self.transform_vector(ray.direction),
            ray.time,
        )
    }

    /// Compose two transforms: `self` then `other` (other applied in world
    /// space after self), i.e. matrix product other.m * self.m.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            m: other.m * self.m,
            inv: self.inv * other.inv,
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            m: self.m * rhs.m,
            inv: rhs.inv * self.inv,
        }
    }
}

#[cfg(test)]
mod transform_struct_tests {
    use super::*;

    #[test]
    fn identity_roundtrip() {
        let t = Transform::IDENTITY;
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(t.transform_point(p), p);
    }

    #[test]
    fn inverse_roundtrips() {
        let t = Transform::from_translation(Vec3::new(3.0, -1.0, 2.0))
            * Transform::from_rotation_y(0.7);
        let p = Vec3::new(1.0, 2.0, 3.0);
        let round = t.inverse().transform_point(t.transform_point(p));
        assert!((round - p).length() < 1e-4);
    }

    #[test]
    fn composition_matches_matrix_product() {
        let a = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b = Transform::from_scale(Vec3::splat(2.0));
        let composed = a * b;
        let p = Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(composed.transform_point(p), (a.matrix() * b.matrix()).transform_point3(p));
    }

    #[test]
    fn ray_transform_does_not_renormalize() {
        let t = Transform::from_scale(Vec3::splat(2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 0.0);
        let transformed = t.transform_ray(&ray);
        assert!((transformed.direction.length() - 2.0).abs() < 1e-5);
    }
}
