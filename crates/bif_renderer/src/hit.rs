//! Intersection records: the raw traversal result (`HitInfo`) and the
//! richer differential-geometry record built from it (`SurfaceInteraction`).

use bif_math::Vec3;

/// Raw result of a BVH traversal. Barycentrics follow b0 = 1 - b1 - b2.
/// Valid only when traversal reported a hit; `primitive_id`/`shape_id` are
/// -1 in a default/empty value.
#[derive(Debug, Clone, Copy)]
pub struct HitInfo {
    pub t: f32,
    pub b1: f32,
    pub b2: f32,
    /// Index into the World's flat triangle arrays (stride 3).
    pub primitive_id: i64,
    /// Index into the World's instance array.
    pub shape_id: i64,
    /// World-space ray direction at the moment of intersection, echoed so
    /// `SurfaceInteraction` can recover `wo` without re-deriving the ray.
    pub incoming_direction: Vec3,
}

impl HitInfo {
    pub const NONE: HitInfo = HitInfo {
        t: f32::INFINITY,
        b1: 0.0,
        b2: 0.0,
        primitive_id: -1,
        shape_id: -1,
        incoming_direction: Vec3::ZERO,
    };

    pub fn is_valid(&self) -> bool {
        self.shape_id >= 0 && self.primitive_id >= 0
    }

    pub fn b0(&self) -> f32 {
        1.0 - self.b1 - self.b2
    }
}

impl Default for HitInfo {
    fn default() -> Self {
        HitInfo::NONE
    }
}

/// Differential-geometry record built by `World::get_surface_interaction`.
/// Positions/normals are in world space.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInteraction {
    pub p: Vec3,
    pub n: Vec3,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    pub shading_n: Vec3,
    pub shading_dpdu: Vec3,
    pub shading_dpdv: Vec3,
    pub uv: (f32, f32),
    /// Unit direction pointing away from the surface, back toward the ray origin.
    pub wo: Vec3,
    pub shape_id: usize,
    pub material_id: u32,
}

/// Build an orthonormal basis around a unit vector, used as a fallback
/// shading tangent frame when UV-derived tangents are degenerate.
pub fn coordinate_system(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0_f32 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_system_is_orthonormal() {
        let n = Vec3::new(0.0, 1.0, 0.0);
        let (t, b) = coordinate_system(n);
        assert!((t.length() - 1.0).abs() < 1e-4);
        assert!((b.length() - 1.0).abs() < 1e-4);
        assert!(t.dot(n).abs() < 1e-4);
        assert!(b.dot(n).abs() < 1e-4);
        assert!(t.dot(b).abs() < 1e-4);
    }

    #[test]
    fn default_hitinfo_is_invalid() {
        assert!(!HitInfo::default().is_valid());
    }
}
