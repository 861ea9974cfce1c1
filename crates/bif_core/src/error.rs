//! Input-error taxonomy for scene assembly.
//!
//! These surface to the script layer as recoverable failures ("Input
//! errors"), distinct from the programmer errors the renderer panics on
//! for malformed BVH invariants.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("instance references unknown prototype id {0}")]
    UnknownPrototype(usize),

    #[error("material id {0} is out of range (scene has {1} materials)")]
    UnknownMaterial(usize, usize),

    #[error("mesh file not found: {0}")]
    MeshNotFound(String),

    #[error("io error loading scene asset: {0}")]
    Io(#[from] std::io::Error),
}
