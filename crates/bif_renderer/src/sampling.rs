//! Hemisphere and disk sampling routines shared by the camera (lens
//! sampling) and the integrators (AO directions, the path tracer's
//! cosine-weighted diffuse lobe).

use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Map a 2D uniform sample in `[0,1)^2` to a point on the unit disk using
/// Shirley & Chiu's concentric mapping (low distortion near the edges,
/// unlike the naive polar mapping).
pub fn concentric_sample_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };

    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine-weighted direction on the hemisphere around +z in local shading
/// space (Malley's method: project a concentric disk sample up onto the
/// hemisphere).
pub fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta * std::f32::consts::FRAC_1_PI
}

/// Uniformly distributed direction on the hemisphere around +z in local
/// shading space.
pub fn uniform_sample_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> f32 {
    1.0 / (2.0 * PI)
}

/// Transform a direction from local shading space (+z = normal) into world
/// space given an orthonormal tangent frame `(t, b, n)`.
pub fn local_to_world(local: Vec3, t: Vec3, b: Vec3, n: Vec3) -> Vec3 {
    t * local.x + b * local.y + n * local.z
}

/// Inverse of `local_to_world`: project a world-space direction into the
/// local shading frame `(t, b, n)`.
pub fn world_to_local(world: Vec3, t: Vec3, b: Vec3, n: Vec3) -> Vec3 {
    Vec3::new(world.dot(t), world.dot(b), world.dot(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concentric_disk_stays_within_unit_circle() {
        for i in 0..20 {
            for j in 0..20 {
                let u = Vec2::new((i as f32 + 0.5) / 20.0, (j as f32 + 0.5) / 20.0);
                let p = concentric_sample_disk(u);
                assert!(p.length() <= 1.0 + 1e-4);
            }
        }
    }

    #[test]
    fn cosine_hemisphere_sample_is_unit_length_and_upward() {
        let u = Vec2::new(0.3, 0.8);
        let d = cosine_sample_hemisphere(u);
        assert!((d.length() - 1.0).abs() < 1e-4);
        assert!(d.z >= 0.0);
    }

    #[test]
    fn uniform_hemisphere_sample_is_unit_length_and_upward() {
        let u = Vec2::new(0.1, 0.4);
        let d = uniform_sample_hemisphere(u);
        assert!((d.length() - 1.0).abs() < 1e-4);
        assert!(d.z >= 0.0);
    }

    #[test]
    fn local_to_world_identity_frame_is_passthrough() {
        let local = Vec3::new(0.3, 0.4, 0.866);
        let world = local_to_world(local, Vec3::X, Vec3::Y, Vec3::Z);
        assert!((world - local).length() < 1e-6);
    }

    #[test]
    fn world_to_local_inverts_local_to_world() {
        let t = Vec3::new(0.0, 0.0, 1.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let n = Vec3::new(0.0, 1.0, 0.0);
        let local = Vec3::new(0.2, -0.5, 0.843);
        let world = local_to_world(local, t, b, n);
        let back = world_to_local(world, t, b, n);
        assert!((back - local).length() < 1e-5);
    }
}
