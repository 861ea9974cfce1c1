//! Material and BSDF boundary.
//!
//! The renderer's integrators do not dispatch through a BSDF today — the
//! path tracer samples a hardcoded cosine-weighted diffuse lobe directly —
//! but the boundary is kept so a future integrator can attach real shading
//! models without changing the World/Renderer contract. Materials are
//! opaque handles retrievable from a table by name or id; id 0 is always
//! the default material.

use bif_math::Spectrum;
use glam::Vec3;

use crate::hit::SurfaceInteraction;

/// A sampled BSDF direction paired with its value and pdf, as returned by
/// `Bsdf::sample_f`.
pub struct BsdfSample {
    pub wi: Vec3,
    pub f: Spectrum,
    pub pdf: f32,
}

/// BSDF evaluated in the local shading frame: `wo`/`wi` are unit vectors
/// with the shading normal along +z.
pub trait Bsdf {
    /// Value of the BSDF for the given outgoing/incoming directions.
    fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum;

    /// Importance-sample an incoming direction given an outgoing direction
    /// and a 2D random sample. Returns `None` if the BSDF has zero measure
    /// in every direction (e.g. a perfectly absorbing surface).
    fn sample_f(&self, wo: Vec3, u: glam::Vec2) -> Option<BsdfSample>;

    /// Probability density of `sample_f` having produced `wi` given `wo`.
    fn pdf(&self, wo: Vec3, wi: Vec3) -> f32;
}

/// A diffuse (Lambertian) BSDF: cosine-weighted sampling, constant albedo.
pub struct LambertianBsdf {
    pub albedo: Spectrum,
}

impl Bsdf for LambertianBsdf {
    fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        if wo.z <= 0.0 || wi.z <= 0.0 {
            Spectrum::BLACK
        } else {
            self.albedo * std::f32::consts::FRAC_1_PI
        }
    }

    fn sample_f(&self, wo: Vec3, u: glam::Vec2) -> Option<BsdfSample> {
        if wo.z <= 0.0 {
            return None;
        }
        let wi = crate::sampling::cosine_sample_hemisphere(u);
        let pdf = self.pdf(wo, wi);
        Some(BsdfSample {
            wi,
            f: self.f(wo, wi),
            pdf,
        })
    }

    fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        if wo.z <= 0.0 || wi.z <= 0.0 {
            0.0
        } else {
            wi.z * std::f32::consts::FRAC_1_PI
        }
    }
}

/// A named material; for now every material resolves to a Lambertian BSDF
/// of its own albedo. `get_bsdf` is the only entry point an integrator
/// should use — the concrete BSDF type is an implementation detail.
pub struct Material {
    pub name: String,
    pub albedo: Spectrum,
}

impl Material {
    pub fn new(name: impl Into<String>, albedo: Spectrum) -> Self {
        Self {
            name: name.into(),
            albedo,
        }
    }

    /// Default material: 50% grey diffuse.
    pub fn default_material() -> Self {
        Self::new("default", Spectrum::splat(0.5))
    }

    pub fn get_bsdf(&self, _interaction: &SurfaceInteraction) -> LambertianBsdf {
        LambertianBsdf { albedo: self.albedo }
    }
}

/// Registry of materials keyed by both name and id. Id 0 is always the
/// default material, inserted at construction.
pub struct MaterialTable {
    materials: Vec<Material>,
    by_name: std::collections::HashMap<String, u32>,
}

impl MaterialTable {
    pub fn new() -> Self {
        let mut table = Self {
            materials: Vec::new(),
            by_name: std::collections::HashMap::new(),
        };
        table.insert(Material::default_material());
        table
    }

    /// Register a material, returning its id. Re-registering an existing
    /// name replaces that slot's material but keeps its id stable.
    pub fn insert(&mut self, material: Material) -> u32 {
        if let Some(&id) = self.by_name.get(&material.name) {
            self.materials[id as usize] = material;
            return id;
        }
        let id = self.materials.len() as u32;
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        id
    }

    pub fn get(&self, id: u32) -> &Material {
        self.materials.get(id as usize).unwrap_or(&self.materials[0])
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name).map(|&id| self.get(id))
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_is_id_zero() {
        let table = MaterialTable::new();
        assert_eq!(table.get(0).name, "default");
    }

    #[test]
    fn insert_returns_stable_ids() {
        let mut table = MaterialTable::new();
        let red = table.insert(Material::new("red", Spectrum::new(1.0, 0.0, 0.0)));
        let blue = table.insert(Material::new("blue", Spectrum::new(0.0, 0.0, 1.0)));
        assert_eq!(red, 1);
        assert_eq!(blue, 2);
        assert_eq!(table.id_of("red"), Some(1));
    }

    #[test]
    fn lambertian_pdf_matches_cosine_law() {
        let bsdf = LambertianBsdf {
            albedo: Spectrum::WHITE,
        };
        let wo = Vec3::new(0.0, 0.0, 1.0);
        let wi = Vec3::new(0.0, 0.0, 1.0);
        assert!((bsdf.pdf(wo, wi) - std::f32::consts::FRAC_1_PI).abs() < 1e-5);
    }

    #[test]
    fn lambertian_f_is_zero_below_horizon() {
        let bsdf = LambertianBsdf {
            albedo: Spectrum::WHITE,
        };
        let wo = Vec3::new(0.0, 0.0, 1.0);
        let wi = Vec3::new(0.0, 0.0, -0.5);
        assert!(bsdf.f(wo, wi).is_black());
    }
}
