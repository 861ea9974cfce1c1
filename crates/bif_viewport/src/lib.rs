//! Windowing boundary: a winit + wgpu implementation of
//! [`bif_renderer::window::WindowAdapter`].
//!
//! This crate draws nothing of the scene itself. The renderer core already
//! produces a tone-mapped RGB frame; `DisplayWindow` only has to get that
//! frame onto the screen, which it does with a single full-screen textured
//! quad. Everything that decides *what* to render (integrator, camera,
//! input handling) lives one layer up in `bif_viewer`.

pub mod trackball;

use std::sync::Arc;

use anyhow::Result;
use bif_renderer::window::{InputEvent, WindowAdapter};
use bif_math::Vec3;
use wgpu::util::DeviceExt;
use winit::window::Window;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const BLIT_VERTICES: [BlitVertex; 4] = [
    BlitVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    BlitVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    BlitVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    BlitVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];
const BLIT_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// A winit window paired with a wgpu pipeline that blits a CPU-side RGB
/// buffer to the screen.
///
/// `bif_viewer` owns the winit event loop and forwards translated input
/// through [`DisplayWindow::record_event`]; this type never touches the
/// event loop directly, which keeps it usable from a headless harness too
/// (anything implementing the handful of winit calls used in `resize`).
pub struct DisplayWindow {
    window: Arc<Window>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    frame_texture: wgpu::Texture,

    frame_width: u32,
    frame_height: u32,
    cpu_buffer: Vec<Vec3>,
    upload_scratch: Vec<f32>,

    should_close: bool,
}

impl DisplayWindow {
    /// Set up the wgpu surface/device/pipeline for `window`, with a frame
    /// texture sized `frame_width x frame_height` — independent of the
    /// window's own size, which only affects the surface swapchain.
    pub async fn new(window: Arc<Window>, frame_width: u32, frame_height: u32) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("failed to find a suitable GPU adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("bif_viewport device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Pick a non-sRGB surface format: the buffer we upload is already
        // tone-mapped by the renderer, so an sRGB surface would gamma-encode
        // it a second time on store.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Mailbox,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let frame_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bif film frame"),
            size: wgpu::Extent3d {
                width: frame_width,
                height: frame_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&frame_view),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<BlitVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0, shader_location: 0 },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                            shader_location: 1,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit vertex buffer"),
            contents: bytemuck::cast_slice(&BLIT_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit index buffer"),
            contents: bytemuck::cast_slice(&BLIT_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pixel_count = (frame_width * frame_height) as usize;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            pipeline,
            vertex_buffer,
            index_buffer,
            bind_group,
            frame_texture,
            frame_width,
            frame_height,
            cpu_buffer: vec![Vec3::ZERO; pixel_count],
            upload_scratch: vec![0.0f32; pixel_count * 4],
            should_close: false,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Reconfigure the swapchain after a winit resize event. Does not
    /// touch the frame texture, which stays tied to the renderer's options.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }
}

impl WindowAdapter for DisplayWindow {
    fn acquire_writable_rgb_buffer(&mut self) -> &mut [Vec3] {
        &mut self.cpu_buffer
    }

    fn release_writable_rgb_buffer(&mut self) {
        for (dst, src) in self.upload_scratch.chunks_exact_mut(4).zip(self.cpu_buffer.iter()) {
            dst[0] = src.x;
            dst[1] = src.y;
            dst[2] = src.z;
            dst[3] = 1.0;
        }
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.frame_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.upload_scratch),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.frame_width * 4 * 4),
                rows_per_image: Some(self.frame_height),
            },
            wgpu::Extent3d {
                width: self.frame_width,
                height: self.frame_height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn swap(&mut self) {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("wgpu surface out of memory, closing window");
                self.should_close = true;
                return;
            }
            Err(e) => {
                log::warn!("failed to acquire surface texture: {e:?}");
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blit encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..BLIT_INDICES.len() as u32, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn poll_events(&mut self) {
        // The winit event loop lives in `bif_viewer`; events arrive here
        // via `record_event` as they're translated, not by pumping here.
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn show(&mut self) {
        self.window.set_visible(true);
    }
}

/// Build a `bif_renderer::window::InputEvent` from a winit window event,
/// if it is one the trackball/keyboard bindings care about.
pub fn translate_window_event(event: &winit::event::WindowEvent) -> Option<InputEvent> {
    use bif_renderer::window::{Key, MouseButton};
    use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta};
    use winit::keyboard::{KeyCode, PhysicalKey};

    match event {
        winit::event::WindowEvent::CursorMoved { position, .. } => {
            Some(InputEvent::CursorMoved { x: position.x as f32, y: position.y as f32 })
        }
        winit::event::WindowEvent::MouseInput { button, state, .. } => {
            let button = match button {
                WinitMouseButton::Left => MouseButton::Left,
                WinitMouseButton::Middle => MouseButton::Middle,
                WinitMouseButton::Right => MouseButton::Right,
                _ => return None,
            };
            Some(InputEvent::MouseButton { button, pressed: *state == ElementState::Pressed })
        }
        winit::event::WindowEvent::MouseWheel { delta, .. } => {
            let delta = match *delta {
                MouseScrollDelta::LineDelta(_, y) => y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
            };
            Some(InputEvent::Scroll { delta })
        }
        winit::event::WindowEvent::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return None;
            };
            let key = match code {
                KeyCode::KeyR => Key::Reset,
                KeyCode::KeyI => Key::NextIntegrator,
                KeyCode::KeyT => Key::NextToneMap,
                KeyCode::KeyC => Key::NextDisplayChannel,
                KeyCode::Escape => Key::Close,
                other => Key::Other(other as u32),
            };
            Some(InputEvent::Key { key, pressed: event.state == ElementState::Pressed })
        }
        _ => None,
    }
}
