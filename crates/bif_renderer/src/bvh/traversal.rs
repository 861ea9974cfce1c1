//! Two-level stack-based BVH traversal.
//!
//! Both queries walk the same flat node array: a top-level instance BVH
//! whose leaves (`num_primitives == 0`) hand off into a per-mesh
//! bottom-level BVH concatenated into the same array. Descending into a
//! bottom-level leaf means transforming the ray into instance-local space;
//! popping back out past the depth at which that happened restores the
//! world-space ray. See `World::intersect`/`World::intersect_any` for the
//! array layout this walks.

use bif_math::{Mat4Ext, Vec3};
use glam::Mat4;

use crate::geometry::intersect_triangle;
use crate::hit::HitInfo;
use crate::BVH_MAX_STACK_DEPTH;

use super::node::Node;

/// Fixed-depth stack of pending node indices, 32-entry bound.
struct Stack {
    entries: [u32; BVH_MAX_STACK_DEPTH],
    len: usize,
}

impl Stack {
    fn new() -> Self {
        Self {
            entries: [0; BVH_MAX_STACK_DEPTH],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, index: usize) {
        assert!(self.len < BVH_MAX_STACK_DEPTH, "BVH traversal stack overflow");
        self.entries[self.len] = index as u32;
        self.len += 1;
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(self.entries[self.len] as usize)
        }
    }
}

#[inline]
fn axis_component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

/// Ray state that gets swapped in when descending into an instance's
/// bottom-level BVH, and restored when traversal pops back out of it.
struct RayState {
    origin: Vec3,
    dir: Vec3,
    inv_dir: Vec3,
}

impl RayState {
    fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir,
            inv_dir: Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z),
        }
    }
}

/// Closest-hit query. `positions` is the World's flat vertex array (stride
/// 3 per triangle); `inv_transforms`/`bottom_roots` are indexed by instance.
pub fn intersect(
    nodes: &[Node],
    positions: &[Vec3],
    inv_transforms: &[Mat4],
    bottom_roots: &[u32],
    ray_origin: Vec3,
    ray_dir: Vec3,
    tmin: f32,
    tmax: f32,
) -> Option<HitInfo> {
    if nodes.is_empty() {
        return None;
    }

    let world = RayState::new(ray_origin, ray_dir);
    let mut active = RayState::new(ray_origin, ray_dir);

    let mut closest = tmax;
    let mut best = HitInfo::NONE;

    let mut stack = Stack::new();
    let mut current = 0usize;
    let mut instance_id: i64 = -1;
    let mut bottom_entry_depth: Option<usize> = None;

    loop {
        let node = &nodes[current];
        let mut advanced = false;

        if node.is_interior() {
            let origin_arr = active.origin.to_array();
            let inv_arr = active.inv_dir.to_array();
            let (near0, far0) = node.child_slab(0, origin_arr, inv_arr, tmin, closest);
            let (near1, far1) = node.child_slab(1, origin_arr, inv_arr, tmin, closest);
            let hit0 = near0 <= far0;
            let hit1 = near1 <= far1;

            let left = current + 1;
            let right = node.right_child_index();
            let dir_negative = axis_component(active.dir, node.split_axis()) < 0.0;
            let (near_child, near_hit, far_child, far_hit) = if dir_negative {
                (right, hit1, left, hit0)
            } else {
                (left, hit0, right, hit1)
            };

            if near_hit && far_hit {
                stack.push(far_child);
                current = near_child;
                advanced = true;
            } else if near_hit {
                current = near_child;
                advanced = true;
            } else if far_hit {
                current = far_child;
                advanced = true;
            }
        } else if node.is_top_level_leaf() {
            let inst = node.instance_index();
            bottom_entry_depth = Some(stack.len);
            instance_id = inst as i64;

            let inv = &inv_transforms[inst];
            let local_origin = inv.transform_point3(world.origin);
            let local_dir = inv.transform_vector3(world.dir);
            active = RayState::new(local_origin, local_dir);

            current = bottom_roots[inst] as usize;
            advanced = true;
        } else {
            let offset = node.primitive_offset();
            let count = node.primitive_count();
            for i in 0..count {
                let base = offset + i;
                let v0 = positions[base * 3];
                let v1 = positions[base * 3 + 1];
                let v2 = positions[base * 3 + 2];
                if let Some((t, b1, b2)) = intersect_triangle(v0, v1, v2, active.origin, active.dir, tmin, closest) {
                    closest = t;
                    best = HitInfo {
                        t,
                        b1,
                        b2,
                        primitive_id: base as i64,
                        shape_id: instance_id,
                        incoming_direction: world.dir,
                    };
                }
            }
        }

        if !advanced {
            match stack.pop() {
                Some(next) => {
                    current = next;
                    if let Some(depth) = bottom_entry_depth {
                        if stack.len < depth {
                            active = RayState::new(world.origin, world.dir);
                            bottom_entry_depth = None;
                            instance_id = -1;
                        }
                    }
                }
                None => break,
            }
        }
    }

    if best.is_valid() {
        Some(best)
    } else {
        None
    }
}

/// Any-hit query: returns as soon as a single intersection is found within
/// `[tmin, tmax]`; does not guarantee which primitive is reported.
pub fn intersect_any(
    nodes: &[Node],
    positions: &[Vec3],
    inv_transforms: &[Mat4],
    bottom_roots: &[u32],
    ray_origin: Vec3,
    ray_dir: Vec3,
    tmin: f32,
    tmax: f32,
) -> bool {
    if nodes.is_empty() {
        return false;
    }

    let world = RayState::new(ray_origin, ray_dir);
    let mut active = RayState::new(ray_origin, ray_dir);

    let mut stack = Stack::new();
    let mut current = 0usize;
    let mut bottom_entry_depth: Option<usize> = None;

    loop {
        let node = &nodes[current];
        let mut advanced = false;

        if node.is_interior() {
            let origin_arr = active.origin.to_array();
            let inv_arr = active.inv_dir.to_array();
            let (near0, far0) = node.child_slab(0, origin_arr, inv_arr, tmin, tmax);
            let (near1, far1) = node.child_slab(1, origin_arr, inv_arr, tmin, tmax);
            let hit0 = near0 <= far0;
            let hit1 = near1 <= far1;

            let left = current + 1;
            let right = node.right_child_index();
            let dir_negative = axis_component(active.dir, node.split_axis()) < 0.0;
            let (near_child, near_hit, far_child, far_hit) = if dir_negative {
                (right, hit1, left, hit0)
            } else {
                (left, hit0, right, hit1)
            };

            if near_hit && far_hit {
                stack.push(far_child);
                current = near_child;
                advanced = true;
            } else if near_hit {
                current = near_child;
                advanced = true;
            } else if far_hit {
                current = far_child;
                advanced = true;
            }
        } else if node.is_top_level_leaf() {
            let inst = node.instance_index();
            bottom_entry_depth = Some(stack.len);

            let inv = &inv_transforms[inst];
            let local_origin = inv.transform_point3(world.origin);
            let local_dir = inv.transform_vector3(world.dir);
            active = RayState::new(local_origin, local_dir);

            current = bottom_roots[inst] as usize;
            advanced = true;
        } else {
            let offset = node.primitive_offset();
            let count = node.primitive_count();
            for i in 0..count {
                let base = offset + i;
                let v0 = positions[base * 3];
                let v1 = positions[base * 3 + 1];
                let v2 = positions[base * 3 + 2];
                if intersect_triangle(v0, v1, v2, active.origin, active.dir, tmin, tmax).is_some() {
                    return true;
                }
            }
        }

        if !advanced {
            match stack.pop() {
                Some(next) => {
                    current = next;
                    if let Some(depth) = bottom_entry_depth {
                        if stack.len < depth {
                            active = RayState::new(world.origin, world.dir);
                            bottom_entry_depth = None;
                        }
                    }
                }
                None => break,
            }
        }
    }

    false
}
