//! Geometry model: the source (pre-flattening) mesh representation, shape
//! instances, and the Möller–Trumbore triangle test shared by the single-
//! and two-level traversals.

use bif_core::Mesh;
use bif_math::{Aabb, Transform, Vec3};

use crate::ray::Ray;
use crate::RAY_EPSILON;

/// One triangle's resolved attributes, used only while building a mesh's
/// bottom-level BVH (the flattened form lives in `World`'s arrays
/// afterward).
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub uvs: [(f32, f32); 3],
    pub material_id: u32,
}

impl Triangle {
    pub fn bbox(&self) -> Aabb {
        let [p0, p1, p2] = self.positions;
        let min = p0.min(p1).min(p2);
        let max = p0.max(p1).max(p2);
        Aabb::from_points(min, max)
    }

    pub fn centroid(&self) -> Vec3 {
        (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
    }
}

/// The owned, pre-flattening triangle mesh. After `World::preprocess` folds
/// the data into the World's flat arrays, an instance only needs
/// `mesh_id`/transform — this structure is retained for reference and for
/// building the bottom-level BVH once.
#[derive(Debug)]
pub struct TriangleMesh {
    pub name: String,
    triangles: Vec<Triangle>,
    bboxes: Vec<Aabb>,
    bbox: Aabb,
    centroid: Vec3,
}

impl TriangleMesh {
    pub fn from_mesh(name: impl Into<String>, mesh: &Mesh) -> Self {
        let tri_count = mesh.triangle_count();
        let mut triangles = Vec::with_capacity(tri_count);
        let mut bboxes = Vec::with_capacity(tri_count);
        let mut bbox = Aabb::empty();

        let default_normal = |p0: Vec3, p1: Vec3, p2: Vec3| (p1 - p0).cross(p2 - p0).normalize();

        for (tri_index, face) in mesh.indices.chunks(3).enumerate() {
            let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
            let positions = [mesh.positions[i0], mesh.positions[i1], mesh.positions[i2]];

            let normals = match &mesh.normals {
                Some(n) => [n[i0], n[i1], n[i2]],
                None => {
                    let fn_ = default_normal(positions[0], positions[1], positions[2]);
                    [fn_, fn_, fn_]
                }
            };

            let uvs = match &mesh.uvs {
                Some(uv) => [
                    (uv[i0][0], uv[i0][1]),
                    (uv[i1][0], uv[i1][1]),
                    (uv[i2][0], uv[i2][1]),
                ],
                None => [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            };

            let triangle = Triangle {
                positions,
                normals,
                uvs,
                material_id: mesh.material_id(tri_index),
            };
            let tb = triangle.bbox();
            bbox = Aabb::surrounding(&bbox, &tb);
            bboxes.push(tb);
            triangles.push(triangle);
        }

        let centroid = bbox.centroid();

        Self {
            name: name.into(),
            triangles,
            bboxes,
            bbox,
            centroid,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangle(&self, i: usize) -> &Triangle {
        &self.triangles[i]
    }

    pub fn triangle_bbox(&self, i: usize) -> Aabb {
        self.bboxes[i]
    }

    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// Drop the per-triangle source data once preprocessing has folded it
    /// into the World's flat arrays.
    pub fn release_triangle_data(&mut self) {
        self.triangles.clear();
        self.triangles.shrink_to_fit();
        self.bboxes.clear();
        self.bboxes.shrink_to_fit();
    }
}

/// A placement of a mesh in world space.
#[derive(Clone, Debug)]
pub struct ShapeInstance {
    pub name: String,
    pub mesh_id: usize,
    pub transform: Transform,
    world_bbox: Aabb,
}

impl ShapeInstance {
    pub fn new(name: impl Into<String>, mesh_id: usize, transform: Transform, mesh_bbox: Aabb) -> Self {
        let world_bbox = transform.transform_aabb(&mesh_bbox);
        Self {
            name: name.into(),
            mesh_id,
            transform,
            world_bbox,
        }
    }

    pub fn world_bbox(&self) -> Aabb {
        self.world_bbox
    }

    pub fn centroid(&self) -> Vec3 {
        self.world_bbox.centroid()
    }
}

/// Möller–Trumbore ray/triangle intersection. Returns `(t, b1, b2)` on a
/// hit within `[tmin, tmax]`.
pub fn intersect_triangle(
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    ray_origin: Vec3,
    ray_dir: Vec3,
    tmin: f32,
    tmax: f32,
) -> Option<(f32, f32, f32)> {
    let eps = RAY_EPSILON as f32;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let pvec = ray_dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < eps {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray_origin - v0;
    let b1 = tvec.dot(pvec) * inv_det;
    if b1 < -eps || b1 > 1.0 + eps {
        return None;
    }

    let qvec = tvec.cross(e1);
    let b2 = ray_dir.dot(qvec) * inv_det;
    if b2 < -eps || b1 + b2 > 1.0 + eps {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t < tmin || t > tmax {
        return None;
    }

    Some((t, b1, b2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_b_closest_hit_single_triangle() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let origin = Vec3::new(0.25, 0.25, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);

        let hit = intersect_triangle(v0, v1, v2, origin, dir, 0.0, 10.0).unwrap();
        assert!((hit.0 - 1.0).abs() < 1e-4);
        assert!((hit.1 - 0.25).abs() < 1e-4);
        assert!((hit.2 - 0.25).abs() < 1e-4);
    }

    #[test]
    fn miss_outside_triangle() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let origin = Vec3::new(5.0, 5.0, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        assert!(intersect_triangle(v0, v1, v2, origin, dir, 0.0, 10.0).is_none());
    }

    #[test]
    fn respects_tmax() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let origin = Vec3::new(0.1, 0.1, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        assert!(intersect_triangle(v0, v1, v2, origin, dir, 0.0, 0.5).is_none());
    }

    #[test]
    fn unit_cube_mesh_bbox() {
        // 12 triangles forming a unit cube (positions only, CCW per face).
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let add_quad = |positions: &mut Vec<Vec3>, indices: &mut Vec<u32>, quad: [Vec3; 4]| {
            let base = positions.len() as u32;
            positions.extend_from_slice(&quad);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        };
        let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        add_quad(&mut positions, &mut indices, [c(0.,0.,0.), c(1.,0.,0.), c(1.,1.,0.), c(0.,1.,0.)]);
        add_quad(&mut positions, &mut indices, [c(0.,0.,1.), c(1.,0.,1.), c(1.,1.,1.), c(0.,1.,1.)]);
        add_quad(&mut positions, &mut indices, [c(0.,0.,0.), c(0.,1.,0.), c(0.,1.,1.), c(0.,0.,1.)]);
        add_quad(&mut positions, &mut indices, [c(1.,0.,0.), c(1.,1.,0.), c(1.,1.,1.), c(1.,0.,1.)]);
        add_quad(&mut positions, &mut indices, [c(0.,0.,0.), c(1.,0.,0.), c(1.,0.,1.), c(0.,0.,1.)]);
        add_quad(&mut positions, &mut indices, [c(0.,1.,0.), c(1.,1.,0.), c(1.,1.,1.), c(0.,1.,1.)]);

        let mesh = Mesh::new(positions, indices, None);
        assert_eq!(mesh.triangle_count(), 12);
        let tm = TriangleMesh::from_mesh("cube", &mesh);
        assert_eq!(tm.triangle_count(), 12);
        let b = tm.bbox();
        assert!((b.x.min - 0.0).abs() < 1e-3 && (b.x.max - 1.0).abs() < 1e-3);
        assert!((b.y.min - 0.0).abs() < 1e-3 && (b.y.max - 1.0).abs() < 1e-3);
        assert!((b.z.min - 0.0).abs() < 1e-3 && (b.z.max - 1.0).abs() < 1e-3);
    }
}
