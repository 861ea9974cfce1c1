//! Camera description — the scene-assembly side of the camera contract.
//!
//! `CameraDesc` is plain data produced by the scripted/embedded
//! configurator; `bif_renderer::camera::PerspectiveCamera` consumes it to
//! build the actual ray-generating camera.

use bif_math::Vec3;

#[derive(Clone, Copy, Debug)]
pub struct CameraDesc {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fovy_degrees: f32,
    pub lens_radius: f32,
    pub focal_distance: f32,
    pub film_width: u32,
    pub film_height: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy_degrees: 40.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
            film_width: 640,
            film_height: 480,
            near: 1e-2,
            far: 1e4,
        }
    }
}

impl CameraDesc {
    /// True when every numeric field is finite and the describes a usable
    /// pinhole/thin-lens setup. Used by `RenderOptions::validate`.
    pub fn is_well_formed(&self) -> bool {
        let finite = self.eye.is_finite()
            && self.target.is_finite()
            && self.up.is_finite()
            && self.fovy_degrees.is_finite()
            && self.lens_radius.is_finite()
            && self.focal_distance.is_finite();
        let lens_ok = self.lens_radius <= 0.0 || self.focal_distance > 0.0;
        let film_ok = self.film_width > 0 && self.film_height > 0;
        finite && lens_ok && film_ok && self.fovy_degrees > 0.0 && self.fovy_degrees < 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_well_formed() {
        assert!(CameraDesc::default().is_well_formed());
    }

    #[test]
    fn lens_without_positive_focal_distance_is_invalid() {
        let desc = CameraDesc {
            lens_radius: 0.1,
            focal_distance: 0.0,
            ..CameraDesc::default()
        };
        assert!(!desc.is_well_formed());
    }

    #[test]
    fn non_finite_eye_is_invalid() {
        let desc = CameraDesc {
            eye: Vec3::new(f32::NAN, 0.0, 0.0),
            ..CameraDesc::default()
        };
        assert!(!desc.is_well_formed());
    }
}
