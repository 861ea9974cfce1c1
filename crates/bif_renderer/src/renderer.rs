//! Renderer: owns the World, camera, Film, and tile queue, and drives the
//! worker pool that fills the Film with progressively refined samples.
//!
//! The concurrency model rests on one invariant: a tile's pixel rectangle
//! is owned exclusively by whichever worker currently holds it. A worker
//! snapshots its tile's pixels out of the shared Film, mutates the copy
//! without touching any lock, then writes the copy back — so the lock is
//! held only for the snapshot and the writeback, never across the
//! sample-generation loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::thread::JoinHandle;

use bif_core::CameraDesc;
use bif_math::{Rand, Spectrum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{CameraSample, PerspectiveCamera};
use crate::film::{Film, FilmPixel};
use crate::integrator::{Integrator, PathTracer};
use crate::material::MaterialTable;
use crate::tile::{Tile, TileOrder, TileQueue};
use crate::tonemap::ToneMap;
use crate::window::WindowAdapter;
use crate::world::World;

/// Which per-pixel quantity the display loop blits into the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayChannel {
    #[default]
    Color,
    Variance,
    SampleCount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderOptions {
    pub frame_width: u32,
    pub frame_height: u32,
    pub tile_size: u32,
    pub tile_order: TileOrder,

    /// Samples per pixel shot during a normal (non-preview) tile pass.
    pub spp: u32,
    /// Samples per representative point during a preview block pass.
    pub preview_spp: u32,
    /// Whether tiles run a quadtree preview refinement before normal passes.
    pub preview: bool,

    /// Extra samples a noisy pixel may earn on top of `spp`, scaled by
    /// `clamp(stddev / adaptive_threshold, 0, 1) ^ adaptive_exponent`.
    pub adaptive_spp: u32,
    pub adaptive_threshold: f32,
    pub adaptive_exponent: f32,

    /// Extra samples shot at a pixel whose stddev exceeds `firefly_threshold`.
    pub firefly_spp: u32,
    pub firefly_threshold: f32,

    pub tonemap: ToneMap,
    pub display_channel: DisplayChannel,

    /// Radiance returned for rays that escape the scene, for integrators
    /// that read it (ambient occlusion, the debug views). `PathTracer` has
    /// no emitters of its own and always treats the miss as a constant
    /// white sky, independent of this setting.
    pub background: [f32; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            tile_size: 32,
            tile_order: TileOrder::Spiral,
            spp: 1,
            preview_spp: 1,
            preview: true,
            adaptive_spp: 0,
            adaptive_threshold: 0.1,
            adaptive_exponent: 1.0,
            firefly_spp: 0,
            firefly_threshold: f32::INFINITY,
            tonemap: ToneMap::default(),
            display_channel: DisplayChannel::default(),
            background: [0.0, 0.0, 0.0],
        }
    }
}

impl RenderOptions {
    pub fn background(&self) -> Spectrum {
        Spectrum::new(self.background[0], self.background[1], self.background[2])
    }

    /// Parse render options from a scripted/embedded configurator's JSON,
    /// a convenience on top of `serde` — the renderer core never reads
    /// files itself, this just saves every caller hand-rolling the same
    /// `serde_json::from_str` call.
    pub fn from_json(json: &str) -> Result<Self, RenderOptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self, camera: &CameraDesc) -> Result<(), RenderOptionsError> {
        if self.tile_size == 0 {
            return Err(RenderOptionsError::ZeroTileSize);
        }
        if self.spp == 0 {
            return Err(RenderOptionsError::ZeroSamplesPerPixel);
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(RenderOptionsError::ZeroFrameSize);
        }
        if !camera.is_well_formed() {
            return Err(RenderOptionsError::InvalidCamera);
        }
        if camera.lens_radius > 0.0 && camera.focal_distance <= 0.0 {
            return Err(RenderOptionsError::InvalidFocalDistance);
        }
        if !self.adaptive_threshold.is_finite() || self.adaptive_threshold < 0.0 {
            return Err(RenderOptionsError::InvalidAdaptiveThreshold);
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum RenderOptionsError {
    #[error("tile size must be nonzero")]
    ZeroTileSize,
    #[error("samples per pixel must be nonzero")]
    ZeroSamplesPerPixel,
    #[error("frame dimensions must be nonzero")]
    ZeroFrameSize,
    #[error("camera description is not well-formed (non-finite or degenerate parameters)")]
    InvalidCamera,
    #[error("lens_radius > 0 requires a positive focal_distance")]
    InvalidFocalDistance,
    #[error("adaptive_threshold must be a finite, non-negative number")]
    InvalidAdaptiveThreshold,
    #[error("malformed render options JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct Renderer {
    world: World,
    camera: RwLock<PerspectiveCamera>,
    materials: MaterialTable,
    options: RenderOptions,
    tonemap: Mutex<ToneMap>,
    display_channel: Mutex<DisplayChannel>,
    film: Mutex<Film>,
    tiles: Mutex<TileQueue>,
    integrator: Mutex<Arc<dyn Integrator>>,
    rendering_done: AtomicBool,
}

impl Renderer {
    pub fn new(
        world: World,
        camera_desc: &CameraDesc,
        materials: MaterialTable,
        options: RenderOptions,
    ) -> Result<Self, RenderOptionsError> {
        options.validate(camera_desc)?;

        let camera = PerspectiveCamera::new(camera_desc);
        let film = Film::new(options.frame_width, options.frame_height);
        let tiles = TileQueue::build(options.frame_width, options.frame_height, options.tile_size, options.tile_order);
        let tonemap = options.tonemap;
        let display_channel = options.display_channel;

        Ok(Self {
            world,
            camera: RwLock::new(camera),
            materials,
            options,
            tonemap: Mutex::new(tonemap),
            display_channel: Mutex::new(display_channel),
            film: Mutex::new(film),
            tiles: Mutex::new(tiles),
            integrator: Mutex::new(Arc::new(PathTracer)),
            rendering_done: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_integrator(&self, integrator: Arc<dyn Integrator>) {
        *self.integrator.lock().unwrap() = integrator;
        self.reset();
    }

    pub fn set_tonemap(&self, tonemap: ToneMap) {
        *self.tonemap.lock().unwrap() = tonemap;
    }

    pub fn tonemap(&self) -> ToneMap {
        *self.tonemap.lock().unwrap()
    }

    pub fn set_display_channel(&self, channel: DisplayChannel) {
        *self.display_channel.lock().unwrap() = channel;
    }

    pub fn display_channel(&self) -> DisplayChannel {
        *self.display_channel.lock().unwrap()
    }

    /// Replace the live camera and reset the film (§4.8 reset contract:
    /// camera change invalidates every accumulated pixel).
    pub fn set_camera(&self, camera_desc: &CameraDesc) -> Result<(), RenderOptionsError> {
        self.options.validate(camera_desc)?;
        *self.camera.write().unwrap() = PerspectiveCamera::new(camera_desc);
        self.reset();
        Ok(())
    }

    /// Run a closure with read access to the current Film snapshot; used by
    /// the display loop to tone-map and blit.
    pub fn with_film<R>(&self, f: impl FnOnce(&Film) -> R) -> R {
        let film = self.film.lock().unwrap();
        f(&film)
    }

    /// Reset contract (§4.8): clear every tile's pass counter and the Film
    /// under both locks, in that order, so no worker can observe a tile
    /// with a stale pass count against a freshly cleared pixel.
    pub fn reset(&self) {
        let mut tiles = self.tiles.lock().unwrap();
        tiles.reset();
        let mut film = self.film.lock().unwrap();
        film.clear();
    }

    pub fn stop(&self) {
        self.rendering_done.store(true, Ordering::Relaxed);
    }

    pub fn is_done(&self) -> bool {
        self.rendering_done.load(Ordering::Relaxed)
    }

    /// Spawn the worker pool: `hardware_concurrency - 1` threads (at least
    /// one), each looping claim-render-advance until `stop()` is called.
    pub fn spawn_workers(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.rendering_done.store(false, Ordering::Relaxed);
        let worker_count = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .saturating_sub(1)
            .max(1);

        (0..worker_count)
            .map(|i| {
                let renderer = Arc::clone(self);
                thread::spawn(move || renderer.worker_loop(i as u64))
            })
            .collect()
    }

    fn worker_loop(&self, worker_seed: u64) {
        let mut rng_seed = worker_seed;
        while !self.rendering_done.load(Ordering::Relaxed) {
            let tile_count = {
                let tiles = self.tiles.lock().unwrap();
                tiles.len()
            };
            if tile_count == 0 {
                break;
            }
            let index = {
                let mut tiles = self.tiles.lock().unwrap();
                tiles.claim().0
            };
            self.render_one_tile(index, rng_seed);
            rng_seed = rng_seed.wrapping_add(worker_count_hint());
        }
    }

    /// Render every tile exactly once, single-threaded. Deterministic and
    /// convenient for tests and offline/batch use; the interactive display
    /// loop instead drives `spawn_workers`/`stop`.
    pub fn render_sync(&self) {
        let tile_count = {
            let tiles = self.tiles.lock().unwrap();
            tiles.len()
        };
        for index in 0..tile_count {
            self.render_one_tile(index, index as u64);
        }
    }

    fn render_one_tile(&self, index: usize, rng_seed: u64) {
        let (tile, pass) = {
            let mut tiles = self.tiles.lock().unwrap();
            let tile = tiles.tile(index);
            let pass = tiles.pass_count(index);
            (tile, pass)
        };

        let integrator = Arc::clone(&self.integrator.lock().unwrap());
        let mut rng = Rand::new(rng_seed ^ ((tile.x as u64) << 32 | tile.y as u64) ^ pass as u64);

        let mut local = {
            let film = self.film.lock().unwrap();
            film.tile_pixels(tile.x, tile.y, tile.w, tile.h)
        };

        let preview_stages = if self.options.preview {
            (tile.w.max(tile.h) as f32).log2().ceil().max(0.0) as u32
        } else {
            0
        };

        if self.options.preview && pass < preview_stages {
            self.render_preview_pass(tile, pass, &*integrator, &mut rng, &mut local);
        } else {
            self.render_normal_pass(tile, &*integrator, &mut rng, &mut local);
            self.apply_adaptive_sampling(tile, &*integrator, &mut rng, &mut local);
            self.apply_firefly_sampling(tile, &*integrator, &mut rng, &mut local);
        }

        {
            let mut film = self.film.lock().unwrap();
            film.set_tile_pixels(tile.x, tile.y, tile.w, tile.h, &local);
        }
        {
            let mut tiles = self.tiles.lock().unwrap();
            tiles.advance_pass(index);
        }
    }

    fn sample_pixel(&self, integrator: &dyn Integrator, rng: &mut Rand, x: u32, y: u32) -> Spectrum {
        let sample = CameraSample {
            film_point: glam::Vec2::new(x as f32 + rng.next_f32(), y as f32 + rng.next_f32()),
            lens_point: rng.next_2d(),
        };
        let (ray, weight) = self.camera.read().unwrap().generate_ray(sample);
        integrator.li(ray, &self.world, &self.materials, rng, self.options.background()) * weight
    }

    /// Quadtree preview: at pass `p` the block side is
    /// `max(1, 2^(preview_stages - p))`. One representative sample average
    /// is computed per block and written to every pixel in it, after
    /// resetting those pixels.
    fn render_preview_pass(&self, tile: Tile, pass: u32, integrator: &dyn Integrator, rng: &mut Rand, local: &mut [FilmPixel]) {
        let max_side = tile.w.max(tile.h);
        let stages = (max_side as f32).log2().ceil().max(0.0) as u32;
        let block = 1u32 << stages.saturating_sub(pass).min(31);

        let mut by = 0u32;
        while by < tile.h {
            let mut bx = 0u32;
            while bx < tile.w {
                let cx = tile.x + bx + (block.min(tile.w - bx)) / 2;
                let cy = tile.y + by + (block.min(tile.h - by)) / 2;

                let mut color = Spectrum::BLACK;
                for _ in 0..self.options.preview_spp.max(1) {
                    color += self.sample_pixel(integrator, rng, cx, cy);
                }
                color = color / self.options.preview_spp.max(1) as f32;

                let block_w = block.min(tile.w - bx);
                let block_h = block.min(tile.h - by);
                for py in by..by + block_h {
                    for px in bx..bx + block_w {
                        let idx = (py * tile.w + px) as usize;
                        local[idx].reset();
                        local[idx].add_sample(color);
                    }
                }
                bx += block;
            }
            by += block;
        }
    }

    fn render_normal_pass(&self, tile: Tile, integrator: &dyn Integrator, rng: &mut Rand, local: &mut [FilmPixel]) {
        for y in 0..tile.h {
            for x in 0..tile.w {
                let idx = (y * tile.w + x) as usize;
                for _ in 0..self.options.spp {
                    let color = self.sample_pixel(integrator, rng, tile.x + x, tile.y + y);
                    local[idx].add_sample(color);
                }
            }
        }
    }

    fn apply_adaptive_sampling(&self, tile: Tile, integrator: &dyn Integrator, rng: &mut Rand, local: &mut [FilmPixel]) {
        if self.options.adaptive_spp == 0 {
            return;
        }
        for y in 0..tile.h {
            for x in 0..tile.w {
                let idx = (y * tile.w + x) as usize;
                let stddev = local[idx].stddev();
                let v = (stddev / self.options.adaptive_threshold.max(1e-8)).clamp(0.0, 1.0);
                let extra = (v.powf(self.options.adaptive_exponent) * self.options.adaptive_spp as f32).floor() as u32;
                for _ in 0..extra {
                    let color = self.sample_pixel(integrator, rng, tile.x + x, tile.y + y);
                    local[idx].add_sample(color);
                }
            }
        }
    }

    fn apply_firefly_sampling(&self, tile: Tile, integrator: &dyn Integrator, rng: &mut Rand, local: &mut [FilmPixel]) {
        if self.options.firefly_spp == 0 {
            return;
        }
        for y in 0..tile.h {
            for x in 0..tile.w {
                let idx = (y * tile.w + x) as usize;
                if local[idx].stddev() > self.options.firefly_threshold {
                    for _ in 0..self.options.firefly_spp {
                        let color = self.sample_pixel(integrator, rng, tile.x + x, tile.y + y);
                        local[idx].add_sample(color);
                    }
                }
            }
        }
    }

    /// Tone-map the current Film snapshot per `display_channel` and blit it
    /// into the window's writable buffer, per the §6 display contract.
    pub fn publish_frame(&self, window: &mut dyn WindowAdapter) {
        let film = self.film.lock().unwrap();
        let buffer = window.acquire_writable_rgb_buffer();
        debug_assert_eq!(buffer.len(), film.pixels().len());

        let tonemap = self.tonemap();
        let display_channel = self.display_channel();
        for (dst, pixel) in buffer.iter_mut().zip(film.pixels().iter()) {
            let color = match display_channel {
                DisplayChannel::Color => tonemap.apply(pixel.mean),
                DisplayChannel::Variance => Spectrum::splat(pixel.luminance_variance),
                DisplayChannel::SampleCount => Spectrum::splat(pixel.sample_count as f32),
            };
            *dst = glam::Vec3::new(color.r(), color.g(), color.b());
        }

        window.release_writable_rgb_buffer();
        window.swap();
    }
}

fn worker_count_hint() -> u64 {
    thread::available_parallelism().map(|n| n.get() as u64).unwrap_or(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeInstance;
    use crate::geometry::TriangleMesh;
    use bif_core::Mesh;
    use bif_math::Transform;
    use glam::Vec3;

    fn quad_camera() -> CameraDesc {
        CameraDesc {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy_degrees: 40.0,
            lens_radius: 0.0,
            focal_distance: 1.0,
            film_width: 32,
            film_height: 32,
            near: 1e-2,
            far: 1e4,
        }
    }

    fn quad_world() -> World {
        let positions = vec![
            Vec3::new(-5.0, -5.0, 0.0),
            Vec3::new(5.0, -5.0, 0.0),
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::new(-5.0, 5.0, 0.0),
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
    fn validate_rejects_zero_tile_size() {
        let mut options = RenderOptions::default();
        options.tile_size = 0;
        assert!(matches!(options.validate(&quad_camera()), Err(RenderOptionsError::ZeroTileSize)));
    }

    #[test]
    fn validate_rejects_lens_without_focal_distance() {
        let options = RenderOptions::default();
        let mut camera = quad_camera();
        camera.lens_radius = 1.0;
        camera.focal_distance = 0.0;
        assert!(matches!(options.validate(&camera), Err(RenderOptionsError::InvalidFocalDistance)));
    }

    #[test]
    fn from_json_round_trips_through_serde() {
        let original = RenderOptions { spp: 16, tile_size: 64, ..RenderOptions::default() };
        let json = serde_json::to_string(&original).unwrap();
        let parsed = RenderOptions::from_json(&json).unwrap();
        assert_eq!(parsed.spp, 16);
        assert_eq!(parsed.tile_size, 64);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(RenderOptions::from_json("not json"), Err(RenderOptionsError::Malformed(_))));
    }

    #[test]
    fn render_sync_fills_every_pixel_with_at_least_one_sample() {
        let world = quad_world();
        let mut options = RenderOptions::default();
        options.frame_width = 32;
        options.frame_height = 32;
        options.tile_size = 16;
        options.preview = false;
        options.spp = 2;

        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        renderer.set_integrator(Arc::new(PathTracer));
        renderer.render_sync();

        renderer.with_film(|film| {
            for pixel in film.pixels() {
                assert!(pixel.sample_count >= 2);
            }
        });
    }

    #[test]
    fn reset_clears_film_and_pass_counters() {
        let world = quad_world();
        let mut options = RenderOptions::default();
        options.frame_width = 16;
        options.frame_height = 16;
        options.tile_size = 16;
        options.preview = false;

        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        renderer.render_sync();
        renderer.reset();
        renderer.with_film(|film| {
            for pixel in film.pixels() {
                assert_eq!(pixel.sample_count, 0);
            }
        });
    }

    #[test]
    fn adaptive_sampling_adds_no_extra_when_disabled() {
        let world = quad_world();
        let mut options = RenderOptions::default();
        options.frame_width = 16;
        options.frame_height = 16;
        options.tile_size = 16;
        options.preview = false;
        options.spp = 1;
        options.adaptive_spp = 0;

        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        renderer.render_sync();
        renderer.with_film(|film| {
            for pixel in film.pixels() {
                assert_eq!(pixel.sample_count, 1);
            }
        });
    }

    #[test]
    fn set_camera_resets_film() {
        let world = quad_world();
        let mut options = RenderOptions::default();
        options.frame_width = 16;
        options.frame_height = 16;
        options.tile_size = 16;
        options.preview = false;

        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        renderer.render_sync();
        let mut moved = quad_camera();
        moved.eye.x += 1.0;
        renderer.set_camera(&moved).unwrap();
        renderer.with_film(|film| {
            for pixel in film.pixels() {
                assert_eq!(pixel.sample_count, 0);
            }
        });
    }

    #[test]
    fn set_camera_rejects_malformed_description() {
        let world = quad_world();
        let options = RenderOptions::default();
        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        let mut bad = quad_camera();
        bad.fovy_degrees = 0.0;
        assert!(renderer.set_camera(&bad).is_err());
    }

    #[test]
    fn tonemap_and_display_channel_are_independently_swappable() {
        let world = quad_world();
        let options = RenderOptions::default();
        let renderer = Renderer::new(world, &quad_camera(), MaterialTable::new(), options).unwrap();
        assert_eq!(renderer.tonemap(), ToneMap::default());
        renderer.set_tonemap(ToneMap::Reinhard);
        assert_eq!(renderer.tonemap(), ToneMap::Reinhard);
        renderer.set_display_channel(DisplayChannel::Variance);
        assert_eq!(renderer.display_channel(), DisplayChannel::Variance);
    }
}
