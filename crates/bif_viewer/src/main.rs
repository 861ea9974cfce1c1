//! Interactive viewer: drives a `bif_renderer::Renderer` against a small
//! built-in demo scene, displaying progressive samples through
//! `bif_viewport::DisplayWindow` and a trackball camera.
//!
//! Scene assembly here stands in for the "scripted or embedded
//! configurator" the core expects at its command-surface boundary —
//! mesh data is just flat arrays, as if handed over by an external loader.

use std::sync::Arc;

use anyhow::Result;
use bif_core::{CameraDesc, Mesh};
use bif_math::Transform;
use bif_renderer::{
    AmbientOcclusion, DebugIntegrator, DebugMode, DisplayChannel, Integrator, Material, MaterialTable, PathTracer,
    RenderOptions, Renderer, ShapeInstance, Spectrum, ToneMap, TriangleMesh, WindowAdapter, World,
};
use bif_viewport::trackball::Trackball;
use bif_viewport::DisplayWindow;
use bif_math::Vec3;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const FRAME_WIDTH: u32 = 960;
const FRAME_HEIGHT: u32 = 540;

/// Integrators cycled by the `NextIntegrator` key binding, in order.
fn integrator_by_index(index: usize) -> Arc<dyn Integrator> {
    match index % 5 {
        0 => Arc::new(PathTracer),
        1 => Arc::new(AmbientOcclusion),
        2 => Arc::new(DebugIntegrator(DebugMode::NormalRemapped)),
        3 => Arc::new(DebugIntegrator(DebugMode::Position)),
        _ => Arc::new(DebugIntegrator(DebugMode::Uv)),
    }
}

fn tonemap_by_index(index: usize) -> ToneMap {
    match index % 4 {
        0 => ToneMap::Linear,
        1 => ToneMap::Gamma,
        2 => ToneMap::Reinhard,
        _ => ToneMap::Filmic,
    }
}

fn display_channel_by_index(index: usize) -> DisplayChannel {
    match index % 3 {
        0 => DisplayChannel::Color,
        1 => DisplayChannel::Variance,
        _ => DisplayChannel::SampleCount,
    }
}

/// A ground plane under a small pyramid, each with its own material —
/// enough geometry to exercise instancing, shading, and occlusion.
fn build_demo_scene() -> (World, MaterialTable, CameraDesc) {
    let mut materials = MaterialTable::new();
    let ground_id = materials.insert(Material::new("ground", Spectrum::new(0.6, 0.6, 0.65)));
    let pyramid_id = materials.insert(Material::new("pyramid", Spectrum::new(0.8, 0.3, 0.2)));

    let ground_positions = vec![
        Vec3::new(-5.0, 0.0, -5.0),
        Vec3::new(5.0, 0.0, -5.0),
        Vec3::new(5.0, 0.0, 5.0),
        Vec3::new(-5.0, 0.0, 5.0),
    ];
    let ground_indices = vec![0, 1, 2, 0, 2, 3];
    let ground_mesh =
        Mesh::new(ground_positions, ground_indices, None).with_material_ids(vec![ground_id, ground_id]);

    let apex = Vec3::new(0.0, 1.5, 0.0);
    let base = [
        Vec3::new(-1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, 1.0),
    ];
    let pyramid_positions = vec![base[0], base[1], base[2], base[3], apex];
    let pyramid_indices = vec![0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4, 0, 2, 1, 0, 3, 2];
    let pyramid_mesh =
        Mesh::new(pyramid_positions, pyramid_indices, None).with_material_ids(vec![pyramid_id; 6]);

    let mut world = World::new();
    let ground_tri_mesh = TriangleMesh::from_mesh("ground", &ground_mesh);
    let ground_bbox = ground_tri_mesh.bbox();
    let ground_mesh_id = world.add_mesh(ground_tri_mesh);
    world.add_instance(ShapeInstance::new("ground0", ground_mesh_id, Transform::IDENTITY, ground_bbox));

    let pyramid_tri_mesh = TriangleMesh::from_mesh("pyramid", &pyramid_mesh);
    let pyramid_bbox = pyramid_tri_mesh.bbox();
    let pyramid_mesh_id = world.add_mesh(pyramid_tri_mesh);
    world.add_instance(ShapeInstance::new("pyramid0", pyramid_mesh_id, Transform::IDENTITY, pyramid_bbox));

    world.preprocess();

    let camera = CameraDesc {
        eye: Vec3::new(4.0, 3.0, 6.0),
        target: Vec3::new(0.0, 0.7, 0.0),
        up: Vec3::Y,
        fovy_degrees: 45.0,
        lens_radius: 0.0,
        focal_distance: 1.0,
        film_width: FRAME_WIDTH,
        film_height: FRAME_HEIGHT,
        near: 1e-2,
        far: 1e4,
    };

    (world, materials, camera)
}

struct App {
    window: Option<Arc<Window>>,
    display: Option<DisplayWindow>,
    renderer: Option<Arc<Renderer>>,
    workers: Vec<std::thread::JoinHandle<()>>,
    trackball: Trackball,
    base_camera: CameraDesc,
    integrator_index: usize,
    tonemap_index: usize,
    display_channel_index: usize,
}

impl App {
    fn new() -> Self {
        let (_, _, camera) = build_demo_scene();
        Self {
            window: None,
            display: None,
            renderer: None,
            workers: Vec::new(),
            trackball: Trackball::new(&camera),
            base_camera: camera,
            integrator_index: 0,
            tonemap_index: 0,
            display_channel_index: 0,
        }
    }

    fn update_camera_from_trackball(&self) {
        if let Some(renderer) = &self.renderer {
            let desc = self.trackball.apply(&self.base_camera);
            if let Err(err) = renderer.set_camera(&desc) {
                log::warn!("rejected camera update: {err}");
            }
        }
    }

    fn handle_key(&mut self, key: bif_renderer::Key, event_loop: &ActiveEventLoop) {
        use bif_renderer::Key;
        let Some(renderer) = &self.renderer else { return };
        match key {
            Key::Reset => renderer.reset(),
            Key::NextIntegrator => {
                self.integrator_index += 1;
                renderer.set_integrator(integrator_by_index(self.integrator_index));
            }
            Key::NextToneMap => {
                self.tonemap_index += 1;
                renderer.set_tonemap(tonemap_by_index(self.tonemap_index));
            }
            Key::NextDisplayChannel => {
                self.display_channel_index += 1;
                renderer.set_display_channel(display_channel_by_index(self.display_channel_index));
            }
            Key::Close => {
                self.shut_down();
                event_loop.exit();
            }
            Key::Other(_) => {}
        }
    }

    fn shut_down(&mut self) {
        if let Some(renderer) = &self.renderer {
            renderer.stop();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("BIF Viewer")
            .with_inner_size(winit::dpi::PhysicalSize::new(FRAME_WIDTH, FRAME_HEIGHT));
        let window = Arc::new(event_loop.create_window(window_attrs).expect("failed to create window"));

        let mut display = pollster::block_on(DisplayWindow::new(window.clone(), FRAME_WIDTH, FRAME_HEIGHT))
            .expect("failed to initialize display window");
        display.show();

        let (world, materials, camera) = build_demo_scene();
        let mut options = RenderOptions::default();
        options.frame_width = FRAME_WIDTH;
        options.frame_height = FRAME_HEIGHT;
        options.spp = 4;
        options.adaptive_spp = 8;
        options.firefly_spp = 4;
        options.firefly_threshold = 4.0;

        let renderer = Arc::new(Renderer::new(world, &camera, materials, options).expect("invalid render options"));
        let workers = renderer.spawn_workers();

        self.trackball = Trackball::new(&camera);
        self.base_camera = camera;
        self.window = Some(window);
        self.display = Some(display);
        self.renderer = Some(renderer);
        self.workers = workers;

        log::info!("BIF viewer running: left drag orbits, right drag/scroll dollies, middle drag pans");
        log::info!("keys: R reset, I next integrator, T next tonemap, C next display channel, Esc quit");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => {
                self.shut_down();
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                if let Some(display) = &mut self.display {
                    display.resize(size.width, size.height);
                }
                return;
            }
            WindowEvent::RedrawRequested => {
                if let (Some(renderer), Some(display)) = (&self.renderer, &mut self.display) {
                    renderer.publish_frame(display);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                return;
            }
            _ => {}
        }

        let Some(input_event) = bif_viewport::translate_window_event(&event) else {
            return;
        };

        let is_drag_or_scroll = matches!(
            input_event,
            bif_renderer::InputEvent::CursorMoved { .. } | bif_renderer::InputEvent::Scroll { .. }
        );
        self.trackball.handle_event(input_event);
        if is_drag_or_scroll {
            self.update_camera_from_trackball();
        }

        if let bif_renderer::InputEvent::Key { key, pressed: true } = input_event {
            self.handle_key(key, event_loop);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Info).init();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
