//! Orbit/pan/dolly camera control driven by `InputEvent`s.
//!
//! Mapping: left drag orbits the eye around the target, right drag dollies
//! along the view direction, middle drag pans target and eye together.
//! The scroll wheel also dollies, for mice without a usable right button.

use bif_core::CameraDesc;
use bif_renderer::window::{InputEvent, MouseButton};
use bif_math::Vec3;

const ORBIT_SENSITIVITY: f32 = 0.005;
const PAN_SENSITIVITY: f32 = 0.0015;
const DOLLY_DRAG_SENSITIVITY: f32 = 0.01;
const DOLLY_SCROLL_SENSITIVITY: f32 = 0.5;
const MIN_DISTANCE: f32 = 1e-3;
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Spherical orbit state around a fixed `up`. Call [`Trackball::apply`]
/// each frame to get a `CameraDesc` with the updated eye/target/up.
pub struct Trackball {
    target: Vec3,
    up: Vec3,
    distance: f32,
    yaw: f32,
    pitch: f32,

    left_down: bool,
    middle_down: bool,
    right_down: bool,
    last_cursor: Option<(f32, f32)>,
}

impl Trackball {
    pub fn new(desc: &CameraDesc) -> Self {
        let offset = desc.eye - desc.target;
        let distance = offset.length().max(MIN_DISTANCE);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw = offset.z.atan2(offset.x);
        Self {
            target: desc.target,
            up: desc.up,
            distance,
            yaw,
            pitch,
            left_down: false,
            middle_down: false,
            right_down: false,
            last_cursor: None,
        }
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::MouseButton { button, pressed } => {
                let down = match button {
                    MouseButton::Left => &mut self.left_down,
                    MouseButton::Middle => &mut self.middle_down,
                    MouseButton::Right => &mut self.right_down,
                };
                *down = pressed;
                if !pressed {
                    self.last_cursor = None;
                }
            }
            InputEvent::CursorMoved { x, y } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    let dx = x - last_x;
                    let dy = y - last_y;
                    if self.left_down {
                        self.orbit(dx, dy);
                    } else if self.middle_down {
                        self.pan(dx, dy);
                    } else if self.right_down {
                        self.dolly(dy * DOLLY_DRAG_SENSITIVITY);
                    }
                }
                self.last_cursor = Some((x, y));
            }
            InputEvent::Scroll { delta } => self.dolly(-delta * DOLLY_SCROLL_SENSITIVITY),
            InputEvent::Key { .. } => {}
        }
    }

    fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + dy * ORBIT_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    fn pan(&mut self, dx: f32, dy: f32) {
        let eye = self.eye();
        let forward = (self.target - eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        let scale = self.distance * PAN_SENSITIVITY;
        self.target += right * (-dx * scale) + up * (dy * scale);
    }

    fn dolly(&mut self, amount: f32) {
        self.distance = (self.distance + amount).max(MIN_DISTANCE);
    }

    fn eye(&self) -> Vec3 {
        let direction = Vec3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        );
        self.target + direction * self.distance
    }

    /// A `CameraDesc` carrying the current orbit state, with every other
    /// field (fov, lens, film size, clip planes) copied from `base`.
    pub fn apply(&self, base: &CameraDesc) -> CameraDesc {
        CameraDesc { eye: self.eye(), target: self.target, up: self.up, ..*base }
    }
}
