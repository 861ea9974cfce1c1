//! BIF Renderer "Ivar" - CPU Path Tracing
//!
//! A multithreaded Monte Carlo path tracer: a two-level BVH over
//! instanced triangle meshes, a tiled worker-pool renderer with preview
//! refinement and adaptive/firefly sampling, and a Film accumulator with
//! online mean/variance.
//!
//! Named "Ivar" to distinguish from the GPU viewport renderer.

pub mod bvh;
pub mod camera;
pub mod film;
pub mod geometry;
pub mod hit;
pub mod integrator;
pub mod material;
pub mod ray;
pub mod renderer;
pub mod sampling;
pub mod tile;
pub mod tonemap;
pub mod window;
pub mod world;

pub use bvh::Node;
pub use camera::PerspectiveCamera;
pub use film::Film;
pub use geometry::{ShapeInstance, TriangleMesh};
pub use hit::{HitInfo, SurfaceInteraction};
pub use integrator::{AmbientOcclusion, DebugIntegrator, DebugMode, Integrator, PathTracer};
pub use material::{Bsdf, Material, MaterialTable};
pub use ray::Ray;
pub use renderer::{DisplayChannel, RenderOptions, RenderOptionsError, Renderer};
pub use tile::{Tile, TileOrder, TileQueue};
pub use tonemap::ToneMap;
pub use window::{InputEvent, Key, MouseButton, WindowAdapter};
pub use world::World;

pub use bif_math::Spectrum;

/// Epsilon used by Möller–Trumbore triangle intersection and by ray-origin
/// offsets that push occlusion rays off the surface they were spawned from.
pub const RAY_EPSILON: f64 = 1e-14;

/// Lower bound of a freshly spawned secondary ray's valid interval.
pub const RAY_TMIN: f32 = 1e-4;

/// Upper bound used for occlusion/any-hit rays that don't target a known t.
pub const RAY_TFAR: f32 = 1e30;

/// Ambient occlusion sample count.
pub const NUM_AO_RAYS: usize = 5;

/// Maximum BVH traversal stack depth.
pub const BVH_MAX_STACK_DEPTH: usize = 32;
