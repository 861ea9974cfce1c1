//! Perspective camera: maps a film-space sample to a world-space ray.

use bif_core::CameraDesc;
use bif_math::Transform;
use glam::{Vec2, Vec3};

use crate::ray::Ray;
use crate::sampling::concentric_sample_disk;

/// A sample requesting a ray: `film_point` is a pixel location in
/// `[0, film_w] x [0, film_h]` raster space (including sub-pixel jitter);
/// `lens_point` is a 2D sample in `[0,1)^2` for defocus blur.
#[derive(Clone, Copy, Debug)]
pub struct CameraSample {
    pub film_point: Vec2,
    pub lens_point: Vec2,
}

pub struct PerspectiveCamera {
    camera_to_world: Transform,
    half_width: f32,
    half_height: f32,
    film_width: f32,
    film_height: f32,
    lens_radius: f32,
    focal_distance: f32,
}

impl PerspectiveCamera {
    pub fn new(desc: &CameraDesc) -> Self {
        debug_assert!(desc.is_well_formed(), "camera description must be well-formed");

        let camera_to_world = Transform::look_at(desc.eye, desc.target, desc.up);
        let aspect = desc.film_width as f32 / desc.film_height as f32;
        let half_height = (desc.fovy_degrees.to_radians() * 0.5).tan();
        let half_width = half_height * aspect;

        Self {
            camera_to_world,
            half_width,
            half_height,
            film_width: desc.film_width as f32,
            film_height: desc.film_height as f32,
            lens_radius: desc.lens_radius,
            focal_distance: desc.focal_distance,
        }
    }

    /// Generate a world-space ray and its weight for the given sample.
    /// Weight is always 1.0 today; the slot is reserved for aperture
    /// weighting.
    pub fn generate_ray(&self, sample: CameraSample) -> (Ray, f32) {
        let ndc_x = 2.0 * (sample.film_point.x / self.film_width) - 1.0;
        let ndc_y = 1.0 - 2.0 * (sample.film_point.y / self.film_height);

        let cam_point = Vec3::new(ndc_x * self.half_width, ndc_y * self.half_height, -1.0);

        let mut origin = Vec3::ZERO;
        let mut direction = cam_point.normalize();

        if self.lens_radius > 0.0 {
            let disk = concentric_sample_disk(sample.lens_point) * self.lens_radius;
            let t_focus = self.focal_distance / -direction.z;
            let focus_point = origin + direction * t_focus;
            origin = Vec3::new(disk.x, disk.y, 0.0);
            direction = (focus_point - origin).normalize();
        }

        let world_origin = self.camera_to_world.transform_point(origin);
        let world_direction = self.camera_to_world.transform_vector(direction).normalize();

        (Ray::new_primary(world_origin, world_direction), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> CameraDesc {
        CameraDesc {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy_degrees: 40.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
            film_width: 200,
            film_height: 100,
            near: 1e-2,
            far: 1e4,
        }
    }

    #[test]
    fn center_ray_points_toward_target() {
        let camera = PerspectiveCamera::new(&desc());
        let (ray, weight) = camera.generate_ray(CameraSample {
            film_point: Vec2::new(100.0, 50.0),
            lens_point: Vec2::splat(0.5),
        });
        assert_eq!(weight, 1.0);
        // Looking from +z at the origin, the center ray should point -z.
        assert!(ray.direction.z < -0.99);
    }

    #[test]
    fn ray_direction_is_normalized() {
        let camera = PerspectiveCamera::new(&desc());
        let (ray, _) = camera.generate_ray(CameraSample {
            film_point: Vec2::new(10.0, 90.0),
            lens_point: Vec2::splat(0.2),
        });
        assert!((ray.direction.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn lens_sampling_perturbs_origin_away_from_eye() {
        let mut d = desc();
        d.lens_radius = 0.5;
        d.focal_distance = 5.0;
        let camera = PerspectiveCamera::new(&d);
        let (ray, _) = camera.generate_ray(CameraSample {
            film_point: Vec2::new(100.0, 50.0),
            lens_point: Vec2::new(0.9, 0.5),
        });
        assert!((ray.origin - d.eye).length() > 1e-3);
    }
}
