//! BIF Core - scene-graph types consumed by the renderer.
//!
//! This crate provides the renderer-agnostic vocabulary that a scripted or
//! embedded configurator builds before handing it to `bif_renderer::World`:
//! `Mesh` and a camera description. Loading mesh data from any particular
//! file format is out of scope here — that's external glue, and `SceneError`
//! is the error contract such a loader bubbles up across that boundary.
//!
//! # Example
//!
//! ```
//! use bif_core::Mesh;
//! use bif_math::Vec3;
//!
//! let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);
//! assert_eq!(mesh.triangle_count(), 1);
//! ```

pub mod camera;
pub mod error;
pub mod mesh;

pub use camera::CameraDesc;
pub use error::SceneError;
pub use mesh::Mesh;
