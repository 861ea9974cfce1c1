//! Flat BVH: node layout, the generic SAH builder, and the two-level
//! stack-based traversal that walks a top-level instance BVH down into
//! per-mesh bottom-level BVHs within the same node array.

pub mod builder;
pub mod node;
pub mod traversal;

pub use builder::{build, BuildParams};
pub use node::{Node, NodeType};
pub use traversal::{intersect, intersect_any};
