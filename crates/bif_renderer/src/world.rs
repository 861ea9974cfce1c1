//! World: the preprocessed, flat-array scene representation that the BVH
//! traversal and surface-interaction queries operate on.
//!
//! Before `preprocess()`, a World is just a bag of meshes and instances.
//! `preprocess()` bakes each mesh's triangles into global flat vertex/
//! normal/UV/material arrays (building a bottom-level BVH over each mesh
//! in the process), then builds a top-level BVH over the instances and
//! concatenates every bottom-level subtree after it into one Node array.
//! After that point every array here is immutable and safe to share
//! across worker threads without synchronization.

use glam::{Mat4, Vec3};

use crate::bvh::{self, BuildParams, Node};
use crate::geometry::{ShapeInstance, TriangleMesh};
use crate::hit::{coordinate_system, HitInfo, SurfaceInteraction};
use crate::ray::Ray;
use bif_math::Aabb;

pub struct World {
    meshes: Vec<TriangleMesh>,
    instances: Vec<ShapeInstance>,

    // Populated by preprocess().
    nodes: Vec<Node>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<(f32, f32)>,
    material_ids: Vec<u32>,
    inv_transforms: Vec<Mat4>,
    bottom_roots: Vec<u32>,
    bbox: Option<Aabb>,
}

impl World {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            instances: Vec::new(),
            nodes: Vec::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            material_ids: Vec::new(),
            inv_transforms: Vec::new(),
            bottom_roots: Vec::new(),
            bbox: None,
        }
    }

    /// Register a mesh, returning its id for use by `add_instance`.
    pub fn add_mesh(&mut self, mesh: TriangleMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_instance(&mut self, instance: ShapeInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Bake meshes and instances into the flat arrays and build the
    /// two-level BVH. A missing mesh referenced by an instance is a
    /// programmer error.
    pub fn preprocess(&mut self) {
        let bottom_root_by_mesh = self.bake_meshes();
        self.build_top_level(&bottom_root_by_mesh);
        self.bbox = None;
    }

    fn bake_meshes(&mut self) -> Vec<u32> {
        let mut bottom_root_by_mesh = Vec::with_capacity(self.meshes.len());

        for mesh in &self.meshes {
            let tri_count = mesh.triangle_count();
            let mut tris: Vec<usize> = (0..tri_count).collect();
            let params = BuildParams::for_mesh_triangles();

            let triangle_base = self.positions.len() / 3;
            let mut next_offset = 0u32;
            let mut subtree = bvh::build(
                &mut tris,
                |&i| mesh.triangle_bbox(i),
                |&i| mesh.triangle(i).centroid(),
                &params,
                |node, items| {
                    let offset = next_offset;
                    next_offset += items.len() as u32;
                    node.make_bottom_leaf(offset, items.len() as u16);
                },
            );

            for &i in &tris {
                let tri = mesh.triangle(i);
                self.positions.extend_from_slice(&tri.positions);
                self.normals.extend_from_slice(&tri.normals);
                self.uvs.extend_from_slice(&tri.uvs);
                self.material_ids.push(tri.material_id);
            }

            let node_base = self.nodes.len();
            for node in subtree.iter_mut() {
                node.offset_interior_child(node_base);
                node.offset_leaf_range(triangle_base);
            }
            bottom_root_by_mesh.push(node_base as u32);
            self.nodes.extend(subtree);
        }

        bottom_root_by_mesh
    }

    fn build_top_level(&mut self, bottom_root_by_mesh: &[u32]) {
        if self.instances.is_empty() {
            return;
        }

        let mut indices: Vec<usize> = (0..self.instances.len()).collect();
        let instances = &self.instances;
        let params = BuildParams::for_instances();

        let top_nodes = bvh::build(
            &mut indices,
            |&i| instances[i].world_bbox(),
            |&i| instances[i].centroid(),
            &params,
            |node, items| {
                debug_assert_eq!(items.len(), 1, "top-level min_leaf_size is 1");
                node.make_top_leaf(items[0] as u32);
            },
        );

        let bottom_base = top_nodes.len();
        let mut all_nodes = top_nodes;

        self.inv_transforms = vec![Mat4::IDENTITY; self.instances.len()];
        self.bottom_roots = vec![0u32; self.instances.len()];
        for (instance_idx, instance) in self.instances.iter().enumerate() {
            self.inv_transforms[instance_idx] = instance.transform.inverse_matrix();
            self.bottom_roots[instance_idx] = bottom_base as u32 + bottom_root_by_mesh[instance.mesh_id];
        }

        // Bottom subtrees were baked with node indices relative to their
        // own mesh's start; rebase them by where they land after the
        // top-level array plus every previously appended mesh subtree.
        for node in self.nodes.iter_mut() {
            node.offset_interior_child(bottom_base);
        }

        all_nodes.append(&mut self.nodes);
        self.nodes = all_nodes;
    }

    pub fn get_bbox(&mut self) -> Aabb {
        if let Some(bbox) = self.bbox {
            return bbox;
        }
        let mut bbox = Aabb::empty();
        for instance in &self.instances {
            bbox = Aabb::surrounding(&bbox, &instance.world_bbox());
        }
        self.bbox = Some(bbox);
        bbox
    }

    pub fn intersect(&self, ray: &Ray) -> Option<HitInfo> {
        bvh::traversal::intersect(
            &self.nodes,
            &self.positions,
            &self.inv_transforms,
            &self.bottom_roots,
            ray.origin,
            ray.direction,
            ray.tmin,
            ray.tmax,
        )
    }

    pub fn intersect_any(&self, ray: &Ray) -> bool {
        bvh::traversal::intersect_any(
            &self.nodes,
            &self.positions,
            &self.inv_transforms,
            &self.bottom_roots,
            ray.origin,
            ray.direction,
            ray.tmin,
            ray.tmax,
        )
    }

    /// Build the differential-geometry record for a hit. Tangents come
    /// from UV derivatives; degenerate UVs fall back to an arbitrary
    /// orthonormal basis around the normal. Traversal and the baked
    /// triangle arrays are in instance-local space, so everything is
    /// transformed out to world space by the instance's transform before
    /// it is returned.
    pub fn get_surface_interaction(&self, hit: &HitInfo) -> SurfaceInteraction {
        debug_assert!(hit.is_valid());
        let base = hit.primitive_id as usize * 3;
        let p0 = self.positions[base];
        let p1 = self.positions[base + 1];
        let p2 = self.positions[base + 2];
        let n0 = self.normals[base];
        let n1 = self.normals[base + 1];
        let n2 = self.normals[base + 2];
        let (u0, v0) = self.uvs[base];
        let (u1, v1) = self.uvs[base + 1];
        let (u2, v2) = self.uvs[base + 2];

        let b0 = hit.b0();
        let p = p0 * b0 + p1 * hit.b1 + p2 * hit.b2;
        let n = (n0 * b0 + n1 * hit.b1 + n2 * hit.b2).normalize();
        let uv = (u0 * b0 + u1 * hit.b1 + u2 * hit.b2, v0 * b0 + v1 * hit.b1 + v2 * hit.b2);

        let du02 = u0 - u2;
        let dv02 = v0 - v2;
        let du12 = u1 - u2;
        let dv12 = v1 - v2;
        let determinant = du02 * dv12 - dv02 * du12;

        let dp02 = p0 - p2;
        let dp12 = p1 - p2;

        let (dpdu, dpdv) = if determinant.abs() < 1e-12 {
            let (t, bt) = coordinate_system(n);
            (t, bt)
        } else {
            let inv_det = 1.0 / determinant;
            let dpdu = (dp02 * dv12 - dp12 * dv02) * inv_det;
            let dpdv = (dp12 * du02 - dp02 * du12) * inv_det;
            (dpdu, dpdv)
        };

        let ss = dpdu.normalize();
        let mut ts = n.cross(ss);
        let (ss, ts) = if ts.length_squared() <= 0.0 {
            coordinate_system(n)
        } else {
            ts = ts.normalize();
            (ss, ts)
        };

        let material_id = self.material_ids[hit.primitive_id as usize];

        let transform = &self.instances[hit.shape_id as usize].transform;
        let p = transform.transform_point(p);
        let n = transform.transform_normal(n).normalize();
        let dpdu = transform.transform_vector(dpdu);
        let dpdv = transform.transform_vector(dpdv);
        let shading_ss = transform.transform_vector(ss).normalize();
        let shading_ts = transform.transform_vector(ts).normalize();

        SurfaceInteraction {
            p,
            n,
            dpdu,
            dpdv,
            shading_n: n,
            shading_dpdu: shading_ss,
            shading_dpdv: shading_ts,
            uv,
            wo: -hit.incoming_direction,
            shape_id: hit.shape_id as usize,
            material_id,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bif_core::Mesh;
    use bif_math::Transform;

    fn unit_quad_mesh() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Mesh::new(positions, indices, None)
    }

    #[test]
    fn scenario_c_instance_translation() {
        let mesh = TriangleMesh::from_mesh("quad", &unit_quad_mesh());
        let mesh_bbox = mesh.bbox();

        let mut world = World::new();
        let mesh_id = world.add_mesh(mesh);
        let transform = Transform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        world.add_instance(ShapeInstance::new("inst0", mesh_id, transform, mesh_bbox));
        world.preprocess();

        let ray = Ray::new_primary(Vec3::new(5.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = world.intersect(&ray).expect("should hit translated quad");
        assert!((hit.t - 1.0).abs() < 1e-3);
        assert_eq!(hit.shape_id, 0);

        let si = world.get_surface_interaction(&hit);
        // The hit point is local-space (0.25, 0.25, 0) on the quad; the
        // instance's +5 X translation must carry through to world space.
        assert!((si.p - Vec3::new(5.25, 0.25, 0.0)).length() < 1e-3);
    }

    #[test]
    fn surface_interaction_world_point_follows_instance_rotation() {
        let mesh = TriangleMesh::from_mesh("quad", &unit_quad_mesh());
        let mesh_bbox = mesh.bbox();

        let mut world = World::new();
        let mesh_id = world.add_mesh(mesh);
        // Rotate the quad 90 degrees about Y so its local +Z normal faces +X.
        let transform = Transform::from_rotation_y(std::f32::consts::FRAC_PI_2);
        world.add_instance(ShapeInstance::new("rotated", mesh_id, transform, mesh_bbox));
        world.preprocess();

        let ray = Ray::new_primary(Vec3::new(-1.0, 0.25, -0.25), Vec3::new(1.0, 0.0, 0.0));
        let hit = world.intersect(&ray).expect("should hit rotated quad");
        let si = world.get_surface_interaction(&hit);

        // World-space normal must point along world +X, not local +Z.
        assert!(si.n.x.abs() > 0.9, "expected normal rotated into +/-X, got {:?}", si.n);
        assert!(si.n.z.abs() < 0.1, "world normal should not still point along local Z, got {:?}", si.n);
    }

    #[test]
    fn scenario_d_two_instances_closest_wins() {
        let mesh = TriangleMesh::from_mesh("quad", &unit_quad_mesh());
        let mesh_bbox = mesh.bbox();

        let mut world = World::new();
        let mesh_id = world.add_mesh(mesh);
        world.add_instance(ShapeInstance::new(
            "near",
            mesh_id,
            Transform::IDENTITY,
            mesh_bbox,
        ));
        world.add_instance(ShapeInstance::new(
            "far",
            mesh_id,
            Transform::from_translation(Vec3::new(0.0, 0.0, 3.0)),
            mesh_bbox,
        ));
        world.preprocess();

        let ray = Ray::new_primary(Vec3::new(0.5, 0.5, -2.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = world.intersect(&ray).expect("should hit nearer instance");
        assert!((hit.t - 2.0).abs() < 1e-3);

        assert!(world.intersect_any(&ray));
    }

    #[test]
    fn empty_world_returns_no_hit() {
        let mut world = World::new();
        world.preprocess();
        let ray = Ray::new_primary(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        assert!(world.intersect(&ray).is_none());
        assert!(!world.intersect_any(&ray));
    }
}
