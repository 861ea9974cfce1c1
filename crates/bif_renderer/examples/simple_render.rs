//! Renders a ground plane and a cube with the path tracer and saves the
//! result as a PPM.

use bif_core::{CameraDesc, Mesh};
use bif_math::Transform;
use bif_renderer::{MaterialTable, PathTracer, RenderOptions, Renderer, ShapeInstance, ToneMap, TriangleMesh, World};
use glam::Vec3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

fn quad_mesh(half_extent: f32) -> Mesh {
    let positions = vec![
        Vec3::new(-half_extent, 0.0, -half_extent),
        Vec3::new(half_extent, 0.0, -half_extent),
        Vec3::new(half_extent, 0.0, half_extent),
        Vec3::new(-half_extent, 0.0, half_extent),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    Mesh::new(positions, indices, None)
}

fn cube_mesh(half_extent: f32) -> Mesh {
    let h = half_extent;
    let corners = [
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ];
    let faces: [[u32; 4]; 6] = [
        [0, 1, 2, 3], // back
        [5, 4, 7, 6], // front
        [4, 0, 3, 7], // left
        [1, 5, 6, 2], // right
        [3, 2, 6, 7], // top
        [4, 5, 1, 0], // bottom
    ];
    let mut indices = Vec::with_capacity(36);
    for face in faces {
        indices.extend_from_slice(&[face[0], face[1], face[2], face[0], face[2], face[3]]);
    }
    Mesh::new(corners.to_vec(), indices, None)
}

fn build_world() -> World {
    let ground = TriangleMesh::from_mesh("ground", &quad_mesh(8.0));
    let ground_bbox = ground.bbox();
    let cube = TriangleMesh::from_mesh("cube", &cube_mesh(1.0));
    let cube_bbox = cube.bbox();

    let mut world = World::new();
    let ground_id = world.add_mesh(ground);
    let cube_id = world.add_mesh(cube);

    world.add_instance(ShapeInstance::new("ground0", ground_id, Transform::IDENTITY, ground_bbox));
    world.add_instance(ShapeInstance::new(
        "cube0",
        cube_id,
        Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        cube_bbox,
    ));

    world.preprocess();
    world
}

fn main() {
    let world = build_world();

    let camera_desc = CameraDesc {
        eye: Vec3::new(4.0, 3.0, 6.0),
        target: Vec3::new(0.0, 1.0, 0.0),
        up: Vec3::Y,
        fovy_degrees: 35.0,
        lens_radius: 0.0,
        focal_distance: 1.0,
        film_width: 400,
        film_height: 225,
        near: 1e-2,
        far: 1e4,
    };

    let mut options = RenderOptions::default();
    options.frame_width = camera_desc.film_width;
    options.frame_height = camera_desc.film_height;
    options.preview = false;
    options.spp = 32;

    let renderer = Renderer::new(world, &camera_desc, MaterialTable::new(), options).expect("valid render options");
    // PathTracer has no emitters and always sees a constant-white sky on
    // miss, so `options.background` is left at its default here — it only
    // takes effect for AmbientOcclusion or a debug integrator.
    renderer.set_integrator(Arc::new(PathTracer));

    let start = std::time::Instant::now();
    renderer.render_sync();
    println!("rendered in {:?}", start.elapsed());

    renderer
        .with_film(|film| save_ppm(film, renderer.options(), "output.ppm"))
        .expect("failed to save image");
    println!("saved to output.ppm");
}

fn save_ppm(film: &bif_renderer::Film, options: &RenderOptions, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", film.width(), film.height())?;
    writeln!(writer, "255")?;

    for y in 0..film.height() {
        for x in 0..film.width() {
            let mapped = options.tonemap.apply(film.pixel(x, y).mean);
            let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            writeln!(writer, "{} {} {}", to_u8(mapped.r()), to_u8(mapped.g()), to_u8(mapped.b()))?;
        }
    }

    Ok(())
}
