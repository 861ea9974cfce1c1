//! External windowing boundary.
//!
//! The renderer core depends only on this trait — never on winit, wgpu, or
//! any other windowing crate directly — so `bif_viewport` (or a headless
//! test double) can drive the display loop without the renderer knowing
//! how pixels actually reach a screen.

use glam::Vec3;

/// Input events the display loop forwards to a camera controller. Kept
/// deliberately small: position/delta data only, no platform key codes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    CursorMoved { x: f32, y: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    Scroll { delta: f32 },
    Key { key: Key, pressed: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// The handful of keys the viewer binds: integrator/tonemap/channel
/// cycling and a render reset. Anything else is the window's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Reset,
    NextIntegrator,
    NextToneMap,
    NextDisplayChannel,
    Close,
    Other(u32),
}

/// Boundary a windowing substrate implements so `Renderer::publish_frame`
/// can blit a tone-mapped Film snapshot into it, independent of whatever
/// GPU or OS surface backs the actual pixels.
pub trait WindowAdapter {
    /// Borrow the buffer the renderer writes RGB samples into. Length must
    /// equal `frame_width * frame_height`.
    fn acquire_writable_rgb_buffer(&mut self) -> &mut [Vec3];

    /// Signal that the buffer borrowed above is done being written.
    fn release_writable_rgb_buffer(&mut self);

    /// Present the buffer (e.g. upload to a GPU texture and flip).
    fn swap(&mut self);

    /// Pump the underlying event loop, draining `InputEvent`s to callbacks.
    fn poll_events(&mut self);

    fn should_close(&self) -> bool;

    fn show(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-memory adapter used to exercise `Renderer::publish_frame`
    /// without a real window.
    struct TestWindow {
        buffer: Vec<Vec3>,
        closed: bool,
    }

    impl WindowAdapter for TestWindow {
        fn acquire_writable_rgb_buffer(&mut self) -> &mut [Vec3] {
            &mut self.buffer
        }
        fn release_writable_rgb_buffer(&mut self) {}
        fn swap(&mut self) {}
        fn poll_events(&mut self) {}
        fn should_close(&self) -> bool {
            self.closed
        }
        fn show(&mut self) {}
    }

    #[test]
    fn test_window_round_trips_buffer_contents() {
        let mut window = TestWindow {
            buffer: vec![Vec3::ZERO; 4],
            closed: false,
        };
        window.acquire_writable_rgb_buffer()[0] = Vec3::new(1.0, 0.0, 0.0);
        window.release_writable_rgb_buffer();
        window.swap();
        assert_eq!(window.acquire_writable_rgb_buffer()[0], Vec3::new(1.0, 0.0, 0.0));
        assert!(!window.should_close());
    }
}
