//! Light transport: the `Integrator` trait and its implementations.
//!
//! Every integrator takes a single primary ray and returns an estimate of
//! the radiance arriving along it. `Renderer` holds an integrator behind a
//! swappable shared reference so the display loop can switch estimators
//! (path tracer, AO, debug views) without tearing down the World or BVH.

use bif_math::{Rand, Spectrum};
use glam::Vec3;

use crate::hit::coordinate_system;
use crate::material::Bsdf;
use crate::ray::Ray;
use crate::sampling::{local_to_world, uniform_sample_hemisphere, world_to_local};
use crate::world::World;
use crate::material::MaterialTable;
use crate::{NUM_AO_RAYS, RAY_EPSILON, RAY_TFAR, RAY_TMIN};

/// Path depth after which Russian roulette starts culling paths.
const RR_START_DEPTH: u32 = 3;
/// Per-bounce absorption probability once roulette kicks in.
const RR_ABSORPTION: f32 = 0.2;
/// Hard cap so a pathological scene (e.g. a perfect mirror hallway) cannot
/// spin forever even if roulette keeps surviving.
const MAX_PATH_DEPTH: u32 = 64;

pub trait Integrator: Send + Sync {
    fn li(&self, ray: Ray, world: &World, materials: &MaterialTable, rng: &mut Rand, background: Spectrum) -> Spectrum;
}

/// Unidirectional Monte Carlo path tracer with cosine-weighted diffuse
/// sampling and Russian roulette termination. Has no emitters of its own,
/// so a miss contributes throughput against a constant-white sky rather
/// than the configurable `background` (that knob is for `AmbientOcclusion`
/// and the debug integrators, whose "background" really is a backdrop).
#[derive(Default)]
pub struct PathTracer;

impl Integrator for PathTracer {
    fn li(&self, mut ray: Ray, world: &World, materials: &MaterialTable, rng: &mut Rand, _background: Spectrum) -> Spectrum {
        let mut radiance = Spectrum::BLACK;
        let mut throughput = Spectrum::WHITE;
        let mut depth = 0u32;

        loop {
            let Some(hit) = world.intersect(&ray) else {
                radiance += throughput * Spectrum::WHITE;
                break;
            };

            let si = world.get_surface_interaction(&hit);
            let material = materials.get(si.material_id);
            let bsdf = material.get_bsdf(&si);

            let t = si.shading_dpdu;
            let b = si.shading_dpdv;
            let n = si.shading_n;
            let wo_local = world_to_local(si.wo, t, b, n);

            let Some(sample) = bsdf.sample_f(wo_local, rng.next_2d()) else {
                break;
            };
            if sample.pdf <= 0.0 || sample.f.is_black() {
                break;
            }

            throughput = throughput * sample.f * sample.wi.z.abs() / sample.pdf;

            depth += 1;
            if depth > RR_START_DEPTH {
                if rng.next_f32() < RR_ABSORPTION {
                    break;
                }
                throughput = throughput / (1.0 - RR_ABSORPTION);
            }
            if depth >= MAX_PATH_DEPTH {
                break;
            }

            let wi_world = local_to_world(sample.wi, t, b, n);
            let origin = si.p + wi_world * RAY_TMIN;
            ray = Ray::new(origin, wi_world, RAY_TMIN, RAY_TFAR);
        }

        radiance
    }
}

/// Ambient occlusion: fraction of `NUM_AO_RAYS` cosine-free hemisphere
/// samples that reach the background unoccluded, as a grey value.
#[derive(Default)]
pub struct AmbientOcclusion;

impl Integrator for AmbientOcclusion {
    fn li(&self, ray: Ray, world: &World, _materials: &MaterialTable, rng: &mut Rand, background: Spectrum) -> Spectrum {
        let Some(hit) = world.intersect(&ray) else {
            return background;
        };
        let si = world.get_surface_interaction(&hit);
        let (t, b) = coordinate_system(si.n);

        let mut unoccluded = 0u32;
        for _ in 0..NUM_AO_RAYS {
            let local_dir = uniform_sample_hemisphere(rng.next_2d());
            let dir = local_to_world(local_dir, t, b, si.n);
            let origin = si.p + dir * RAY_EPSILON as f32;
            let occlusion_ray = Ray::new(origin, dir, RAY_TMIN, RAY_TFAR);
            if !world.intersect_any(&occlusion_ray) {
                unoccluded += 1;
            }
        }

        Spectrum::splat(unoccluded as f32 / NUM_AO_RAYS as f32)
    }
}

/// Visualization modes that bypass shading entirely, useful for sanity
/// checking the geometry and BVH in isolation from material/light setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugMode {
    /// Hit position as a color (unnormalized, clipped by the tone-mapper).
    Position,
    /// Shading normal remapped from `[-1,1]` to `[0,1]` per component.
    NormalRemapped,
    /// Shading normal as-is; negative components show as negative color.
    NormalRaw,
    /// Surface UV coordinates as (u, v, 0).
    Uv,
}

pub struct DebugIntegrator(pub DebugMode);

impl Integrator for DebugIntegrator {
    fn li(&self, ray: Ray, world: &World, _materials: &MaterialTable, _rng: &mut Rand, background: Spectrum) -> Spectrum {
        let Some(hit) = world.intersect(&ray) else {
            return background;
        };
        let si = world.get_surface_interaction(&hit);

        match self.0 {
            DebugMode::Position => Spectrum::new(si.p.x, si.p.y, si.p.z),
            DebugMode::NormalRemapped => {
                let n: Vec3 = (si.shading_n + Vec3::ONE) * 0.5;
                Spectrum::new(n.x, n.y, n.z)
            }
            DebugMode::NormalRaw => Spectrum::new(si.shading_n.x, si.shading_n.y, si.shading_n.z),
            DebugMode::Uv => Spectrum::new(si.uv.0, si.uv.1, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeInstance;
    use crate::geometry::TriangleMesh;
    use bif_core::Mesh;
    use bif_math::Transform;

    fn single_quad_world() -> World {
        let positions = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let mesh = Mesh::new(positions, indices, None);
        let tri_mesh = TriangleMesh::from_mesh("quad", &mesh);
        let bbox = tri_mesh.bbox();

        let mut world = World::new();
        let mesh_id = world.add_mesh(tri_mesh);
        world.add_instance(ShapeInstance::new("quad0", mesh_id, Transform::IDENTITY, bbox));
        world.preprocess();
        world
    }

    #[test]
    fn path_tracer_misses_return_constant_white_sky_regardless_of_background() {
        let mut world = World::new();
        world.preprocess();
        let materials = MaterialTable::new();
        let ray = Ray::new_primary(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));

        let mut rng = Rand::new(7);
        let radiance = PathTracer.li(ray, &world, &materials, &mut rng, Spectrum::BLACK);
        assert_eq!(radiance.0, Spectrum::WHITE.0);

        let mut rng = Rand::new(7);
        let radiance_with_configured_background =
            PathTracer.li(ray, &world, &materials, &mut rng, Spectrum::new(0.2, 0.4, 0.6));
        assert_eq!(radiance_with_configured_background.0, Spectrum::WHITE.0);
    }

    #[test]
    fn path_tracer_hit_produces_nonnegative_finite_radiance() {
        let world = single_quad_world();
        let materials = MaterialTable::new();
        let mut rng = Rand::new(11);
        let ray = Ray::new_primary(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let radiance = PathTracer.li(ray, &world, &materials, &mut rng, Spectrum::BLACK);
        assert!(radiance.r().is_finite() && radiance.r() >= 0.0);
    }

    #[test]
    fn ambient_occlusion_unoccluded_plane_returns_full_value() {
        let world = single_quad_world();
        let materials = MaterialTable::new();
        let mut rng = Rand::new(3);
        let ray = Ray::new_primary(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let ao = AmbientOcclusion.li(ray, &world, &materials, &mut rng, Spectrum::WHITE);
        assert!((ao.r() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn debug_normal_remapped_points_toward_viewer_on_front_face() {
        let world = single_quad_world();
        let materials = MaterialTable::new();
        let mut rng = Rand::new(0);
        let ray = Ray::new_primary(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let color = DebugIntegrator(DebugMode::NormalRemapped).li(ray, &world, &materials, &mut rng, Spectrum::BLACK);
        // Facing +z, remapped normal.z should sit near 1.0.
        assert!(color.b() > 0.9);
    }

    #[test]
    fn debug_integrator_miss_returns_background() {
        let mut world = World::new();
        world.preprocess();
        let materials = MaterialTable::new();
        let mut rng = Rand::new(0);
        let ray = Ray::new_primary(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        let color = DebugIntegrator(DebugMode::Uv).li(ray, &world, &materials, &mut rng, Spectrum::splat(0.25));
        assert_eq!(color.0, Spectrum::splat(0.25).0);
    }
}
