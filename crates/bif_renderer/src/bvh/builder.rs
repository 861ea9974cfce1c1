//! Generic binary BVH builder: given any item type with a bbox/centroid
//! accessor and a minimum leaf size, produce a flat array of `Node`s in DFS
//! order. The only splitting strategy provided is SAH, but the
//! scoring step is a free function so an alternative strategy could be
//! substituted without touching the partitioner.

use bif_math::Aabb;
use glam::Vec3;

use super::node::Node;

/// Tunable build-time constants.
#[derive(Clone, Copy, Debug)]
pub struct BuildParams {
    pub min_leaf_size: usize,
    pub num_sah_splits: usize,
    pub trav_cost: f32,
    pub min_side_length: f32,
    pub min_split_step: f32,
}

impl BuildParams {
    /// MIN_PRIMS_PER_LEAF = 8 for mesh triangles.
    pub fn for_mesh_triangles() -> Self {
        Self {
            min_leaf_size: 8,
            ..Self::defaults()
        }
    }

    /// MIN_PRIMS_PER_LEAF = 1 for instances (every instance is its own leaf).
    pub fn for_instances() -> Self {
        Self {
            min_leaf_size: 1,
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            min_leaf_size: 1,
            num_sah_splits: 20,
            trav_cost: 0.25,
            min_side_length: 1e-3,
            min_split_step: 1e-5,
        }
    }
}

/// Build a BVH over `items`, reordering them in place so that each leaf's
/// members are contiguous. `make_leaf` is called once per leaf with the
/// fresh node and the (now-reordered) slice of items that landed in it; it
/// must set the leaf payload (the builder forces the type tag to Leaf
/// either way).
///
/// Returns the flat node array; `nodes[0]` is the root.
pub fn build<T>(
    items: &mut [T],
    bbox_of: impl Fn(&T) -> Aabb,
    centroid_of: impl Fn(&T) -> Vec3,
    params: &BuildParams,
    mut make_leaf: impl FnMut(&mut Node, &[T]),
) -> Vec<Node> {
    let mut nodes = Vec::new();
    if !items.is_empty() {
        build_recursive(items, &bbox_of, &centroid_of, params, &mut make_leaf, &mut nodes);
    }
    nodes
}

fn build_recursive<T>(
    items: &mut [T],
    bbox_of: &impl Fn(&T) -> Aabb,
    centroid_of: &impl Fn(&T) -> Vec3,
    params: &BuildParams,
    make_leaf: &mut impl FnMut(&mut Node, &[T]),
    nodes: &mut Vec<Node>,
) -> (usize, Aabb) {
    let node_bbox = items
        .iter()
        .fold(Aabb::empty(), |acc, it| Aabb::surrounding(&acc, &bbox_of(it)));

    let node_index = nodes.len();
    nodes.push(Node::default());

    let emit_leaf = |nodes: &mut Vec<Node>, make_leaf: &mut dyn FnMut(&mut Node, &[T]), items: &[T]| {
        let mut node = Node::default();
        make_leaf(&mut node, items);
        nodes[node_index] = node;
    };

    if items.len() <= params.min_leaf_size {
        emit_leaf(nodes, make_leaf, items);
        return (node_index, node_bbox);
    }

    let baseline_score = items.len() as f32 * node_bbox.half_area();

    let mut best: Option<(usize, f32, f32)> = None;
    for axis in 0..3 {
        let interval = node_bbox.axis_interval(axis);
        let side_length = interval.size();
        if side_length < params.min_side_length {
            continue;
        }
        let step = side_length / params.num_sah_splits as f32;
        if step < params.min_split_step {
            continue;
        }

        for i in 0..params.num_sah_splits {
            let plane = interval.min + i as f32 * step;
            let score = score_split(items, bbox_of, centroid_of, axis, plane, params.trav_cost);
            if score < baseline_score && best.map_or(true, |(_, _, best_score)| score < best_score) {
                best = Some((axis, plane, score));
            }
        }
    }

    let Some((axis, plane, _)) = best else {
        emit_leaf(nodes, make_leaf, items);
        return (node_index, node_bbox);
    };

    let mid = partition_by_centroid(items, centroid_of, axis, plane);
    if mid == 0 || mid == items.len() {
        // Degenerate split (can happen at floating-point ties); fall back
        // to a leaf rather than recursing into an empty side forever.
        emit_leaf(nodes, make_leaf, items);
        return (node_index, node_bbox);
    }

    let (left_items, right_items) = items.split_at_mut(mid);
    let (left_index, left_bbox) = build_recursive(left_items, bbox_of, centroid_of, params, make_leaf, nodes);
    debug_assert_eq!(left_index, node_index + 1, "left child must be adjacent to its parent");
    let (right_index, right_bbox) = build_recursive(right_items, bbox_of, centroid_of, params, make_leaf, nodes);

    nodes[node_index].make_interior(axis, left_bbox, right_bbox, right_index);

    (node_index, node_bbox)
}

/// SAH score for splitting `items` at `plane` along `axis`. `+inf` if
/// either side would be empty.
fn score_split<T>(
    items: &[T],
    bbox_of: &impl Fn(&T) -> Aabb,
    centroid_of: &impl Fn(&T) -> Vec3,
    axis: usize,
    plane: f32,
    trav_cost: f32,
) -> f32 {
    let mut left_bbox = Aabb::empty();
    let mut right_bbox = Aabb::empty();
    let mut left_count = 0usize;
    let mut right_count = 0usize;

    for item in items {
        let c = axis_component(centroid_of(item), axis);
        if c < plane {
            left_bbox = Aabb::surrounding(&left_bbox, &bbox_of(item));
            left_count += 1;
        } else {
            right_bbox = Aabb::surrounding(&right_bbox, &bbox_of(item));
            right_count += 1;
        }
    }

    if left_count == 0 || right_count == 0 {
        return f32::INFINITY;
    }

    trav_cost * (left_count as f32 * left_bbox.half_area() + right_count as f32 * right_bbox.half_area())
}

/// In-place Lomuto partition by centroid axis comparison (strict
/// less-than goes left). Returns the split point (count of left items).
fn partition_by_centroid<T>(
    items: &mut [T],
    centroid_of: &impl Fn(&T) -> Vec3,
    axis: usize,
    plane: f32,
) -> usize {
    let mut i = 0;
    for j in 0..items.len() {
        if axis_component(centroid_of(&items[j]), axis) < plane {
            items.swap(i, j);
            i += 1;
        }
    }
    i
}

#[inline]
fn axis_component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::node::Node;

    #[derive(Clone, Copy)]
    struct Point(Vec3);

    fn bbox_of(p: &Point) -> Aabb {
        Aabb::from_points(p.0, p.0)
    }
    fn centroid_of(p: &Point) -> Vec3 {
        p.0
    }

    #[test]
    fn min_leaf_size_one_gives_one_item_per_leaf() {
        let mut items: Vec<Point> = (0..8).map(|i| Point(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let params = BuildParams::for_instances();
        let mut leaf_sizes = Vec::new();
        let nodes = build(&mut items, bbox_of, centroid_of, &params, |node, leaf_items| {
            leaf_sizes.push(leaf_items.len());
            node.make_top_leaf(leaf_items.len() as u32);
        });
        assert!(!nodes.is_empty());
        assert!(leaf_sizes.iter().all(|&n| n == 1));
    }

    #[test]
    fn scenario_a_cube_fits_in_one_or_three_nodes() {
        // 8 corner points of a unit cube, min_leaf_size = 8 (cube triangle count proxy).
        let mut items: Vec<Point> = vec![
            Point(Vec3::new(0.0, 0.0, 0.0)),
            Point(Vec3::new(1.0, 0.0, 0.0)),
            Point(Vec3::new(0.0, 1.0, 0.0)),
            Point(Vec3::new(1.0, 1.0, 0.0)),
            Point(Vec3::new(0.0, 0.0, 1.0)),
            Point(Vec3::new(1.0, 0.0, 1.0)),
            Point(Vec3::new(0.0, 1.0, 1.0)),
            Point(Vec3::new(1.0, 1.0, 1.0)),
        ];
        let params = BuildParams {
            min_leaf_size: 8,
            ..BuildParams::for_mesh_triangles()
        };
        let nodes = build(&mut items, bbox_of, centroid_of, &params, |node, leaf_items| {
            node.make_bottom_leaf(0, leaf_items.len() as u16);
        });
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_leaf());
    }

    #[test]
    fn left_child_is_always_adjacent_to_parent() {
        let mut items: Vec<Point> = (0..64).map(|i| Point(Vec3::new(i as f32, (i * 7 % 13) as f32, 0.0))).collect();
        let params = BuildParams::for_mesh_triangles();
        let nodes = build(&mut items, bbox_of, centroid_of, &params, |node, leaf_items| {
            node.make_bottom_leaf(0, leaf_items.len() as u16);
        });
        for (i, node) in nodes.iter().enumerate() {
            if node.is_interior() {
                assert!(i + 1 < nodes.len());
                assert!(node.right_child_index() > i + 1 || node.right_child_index() == i + 1);
            }
        }
    }

    #[test]
    fn child_bounds_are_subsets_of_parent() {
        let mut items: Vec<Point> = (0..40).map(|i| Point(Vec3::new((i % 5) as f32, (i % 7) as f32, (i % 3) as f32))).collect();
        let params = BuildParams::for_mesh_triangles();
        let mut leaves_total = 0usize;
        let nodes = build(&mut items, bbox_of, centroid_of, &params, |node, leaf_items| {
            leaves_total += leaf_items.len();
            node.make_bottom_leaf(0, leaf_items.len() as u16);
        });
        assert_eq!(leaves_total, 40);
        assert!(!nodes.is_empty());
    }
}
