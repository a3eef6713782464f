use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use glam::Vec3;
use log::info;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::app::AppContext;
use crate::assets::ScenePrograms;
use crate::error::StartupError;
use crate::mesh::MeshData;
use crate::scene::Scene;
use crate::texture::TextureImage;

use super::frame::{
    draw_calls, prepare_draw, DrawCall, FrameClock, FrameState, PhaseTracker, Projection,
    RenderPhase,
};
use super::resources::{DepthBuffer, GpuMesh, GpuProgram, GpuTexture, PipelineTargets};

/// GPU renderer that owns the surface and every resource it draws with.
pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    mesh: GpuMesh,
    lighting: GpuProgram,
    lamp: GpuProgram,
    texture: GpuTexture,
    phases: PhaseTracker,
    clock: FrameClock,
    projection: Projection,
    clear_color: wgpu::Color,
    // dropped after the surface created from it
    window: Arc<Window>,
}

impl Renderer {
    /// Initializes the GPU and uploads the mesh, programs and texture.
    pub async fn new(
        window: Arc<Window>,
        mesh: &MeshData,
        programs: ScenePrograms,
        texture: &TextureImage,
        clear_color: Vec3,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(StartupError::GraphicsInit("window has zero area".into()).into());
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the renderer keeps `window` alive for as long as `surface`.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .map_err(|err| StartupError::GraphicsInit(format!("failed to create surface: {err}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| StartupError::GraphicsInit("no compatible GPU adapter".into()))?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|err| StartupError::GraphicsInit(format!("failed to create GPU device: {err}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| StartupError::GraphicsInit("surface reports no formats".into()))?;
        info!("surface format {surface_format:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let targets = PipelineTargets {
            color_format: surface_format,
            depth_format: DepthBuffer::FORMAT,
        };
        let gpu_mesh = GpuMesh::create(&device, mesh, "pyramid");
        let gpu_texture = GpuTexture::create(&device, &queue, texture, "diffuse-texture");
        let lighting = GpuProgram::create(
            &device,
            programs.lighting,
            gpu_mesh.layout(),
            &targets,
            Some(&gpu_texture),
            "lighting",
        )?;
        let lamp = GpuProgram::create(
            &device,
            programs.lamp,
            gpu_mesh.layout(),
            &targets,
            None,
            "lamp",
        )?;

        let mut phases = PhaseTracker::new();
        phases.advance(RenderPhase::Ready)?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth,
            mesh: gpu_mesh,
            lighting,
            lamp,
            texture: gpu_texture,
            phases,
            clock: FrameClock::default(),
            projection: Projection::default(),
            clear_color: wgpu::Color {
                r: f64::from(clear_color.x),
                g: f64::from(clear_color.y),
                b: f64::from(clear_color.z),
                a: 1.0,
            },
            window,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reconfigures the surface and depth buffer; zero-sized requests
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        let depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
        std::mem::replace(&mut self.depth, depth).destroy();
    }

    /// Reconfigures the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Runs one clear/update/draw/present cycle timed at `now`. Surface acquisition errors are returned as
    /// [`wgpu::SurfaceError`] inside the `anyhow` error.
    pub fn render_frame(&mut self, ctx: &mut AppContext, scene: &mut Scene, now: Instant) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.phases.advance(RenderPhase::Clearing)?;
        self.clear(&target);

        self.phases.advance(RenderPhase::Updating)?;
        let delta_time = self.clock.tick(now);
        ctx.process_input(delta_time);
        scene.lights.follow_camera(&ctx.camera);
        let frame = FrameState::new(delta_time, &ctx.camera, ctx.aspect(), &self.projection);

        self.phases.advance(RenderPhase::Drawing)?;
        for call in draw_calls(scene) {
            self.draw(&target, &frame, scene, &call);
        }

        self.phases.advance(RenderPhase::Presenting)?;
        output.present();
        self.phases.advance(RenderPhase::Ready)?;
        Ok(())
    }

    fn clear(&self, target: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear-encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    // One submission per draw so the next draw's uniform writes cannot
    // overwrite data this draw still reads.
    fn draw(&mut self, target: &wgpu::TextureView, frame: &FrameState, scene: &Scene, call: &DrawCall) {
        let program = match call {
            DrawCall::Pyramid { .. } => &mut self.lighting,
            DrawCall::Lamp { .. } => &mut self.lamp,
        };
        prepare_draw(call, frame, scene, program.program_mut());
        program.flush(&self.queue);
        let program = &*program;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });
            program.bind(&mut pass);
            self.mesh.bind(&mut pass);
            pass.draw(0..self.mesh.vertex_count(), 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Releases every GPU resource. Only valid between frames.
    pub fn destroy(mut self) -> Result<()> {
        self.phases.advance(RenderPhase::Destroyed)?;
        self.lighting.destroy();
        self.lamp.destroy();
        self.mesh.destroy();
        self.texture.destroy();
        self.depth.destroy();
        info!("renderer resources released");
        Ok(())
    }
}
