use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use wgpu::util::DeviceExt;

use crate::mesh::{MeshData, VertexLayout};
use crate::shader::{ResourceKind, ShaderProgram};
use crate::texture::TextureImage;

/// Vertex buffer uploaded from a [`MeshData`].
pub struct GpuMesh {
    vertices: wgpu::Buffer,
    layout: VertexLayout,
    vertex_count: u32,
}

impl GpuMesh {
    pub fn create(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: mesh.bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        log::debug!(
            "uploaded mesh {label}: {} vertices, {} bytes",
            mesh.vertex_count(),
            mesh.bytes().len()
        );
        Self {
            vertices,
            layout: mesh.layout().clone(),
            vertex_count: mesh.vertex_count(),
        }
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn bind<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
    }

    pub fn destroy(self) {
        self.vertices.destroy();
    }
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes()
        .iter()
        .map(|attribute| wgpu::VertexAttribute {
            format: match attribute.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                _ => wgpu::VertexFormat::Float32x4,
            },
            offset: u64::from(attribute.offset),
            shader_location: attribute.location,
        })
        .collect()
}

/// Sampled colour texture with its view and sampler.
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTexture {
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        // wgpu has no 3-channel format; RGB images are widened here.
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.to_rgba(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}

/// A linked [`ShaderProgram`] turned into a pipeline, with one GPU buffer
/// per uniform block.
pub struct GpuProgram {
    program: ShaderProgram,
    pipeline: wgpu::RenderPipeline,
    uniform_buffers: Vec<wgpu::Buffer>,
    bind_groups: Vec<(u32, wgpu::BindGroup)>,
}

pub struct PipelineTargets {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
}

impl GpuProgram {
    pub fn create(
        device: &wgpu::Device,
        program: ShaderProgram,
        mesh_layout: &VertexLayout,
        targets: &PipelineTargets,
        texture: Option<&GpuTexture>,
        label: &str,
    ) -> Result<Self> {
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label}-vertex")),
            source: wgpu::ShaderSource::Wgsl(program.vertex_source().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label}-fragment")),
            source: wgpu::ShaderSource::Wgsl(program.fragment_source().into()),
        });

        let attributes = vertex_attributes(mesh_layout);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            // derived from the shaders; only bindings they use appear
            layout: None,
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: program.vertex_entry(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: u64::from(mesh_layout.stride()),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: targets.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: program.fragment_entry(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: targets.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let uniform_buffers: Vec<wgpu::Buffer> = program
            .uniform_blocks()
            .iter()
            .map(|block| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label}-{}", block.name)),
                    contents: block.bytes(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();

        let mut groups: BTreeMap<u32, Vec<wgpu::BindGroupEntry<'_>>> = BTreeMap::new();
        for (block, buffer) in program.uniform_blocks().iter().zip(&uniform_buffers) {
            groups.entry(block.group).or_default().push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: buffer.as_entire_binding(),
            });
        }
        for slot in program.resources() {
            let texture = texture
                .ok_or_else(|| anyhow!("{label} program samples `{}` but no texture was given", slot.name))?;
            let resource = match slot.kind {
                ResourceKind::Texture => wgpu::BindingResource::TextureView(&texture.view),
                ResourceKind::Sampler => wgpu::BindingResource::Sampler(&texture.sampler),
            };
            groups.entry(slot.group).or_default().push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource,
            });
        }

        let bind_groups = groups
            .into_iter()
            .map(|(group, entries)| {
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label}-group-{group}")),
                    layout: &pipeline.get_bind_group_layout(group),
                    entries: &entries,
                });
                (group, bind_group)
            })
            .collect();

        log::info!(
            "created {label} pipeline with {} uniform buffers",
            uniform_buffers.len()
        );

        Ok(Self {
            program,
            pipeline,
            uniform_buffers,
            bind_groups,
        })
    }

    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    /// Copies the CPU-side uniform blocks into their buffers.
    pub fn flush(&self, queue: &wgpu::Queue) {
        for (block, buffer) in self.program.uniform_blocks().iter().zip(&self.uniform_buffers) {
            queue.write_buffer(buffer, 0, block.bytes());
        }
    }

    pub fn bind<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_pipeline(&self.pipeline);
        for (group, bind_group) in &self.bind_groups {
            pass.set_bind_group(*group, bind_group, &[]);
        }
    }

    pub fn destroy(self) {
        for buffer in self.uniform_buffers {
            buffer.destroy();
        }
    }
}

pub struct DepthBuffer {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}
