//! Fullscreen Blit Pipelines
//!
//! Encodes copy and material blits as a fullscreen triangle draw.
//!
//! # Bind Group Layouts
//!
//! | Layout   | Bindings                                            |
//! |----------|-----------------------------------------------------|
//! | copy     | 0: source texture, 1: sampler                       |
//! | material | 0: source, 1: sampler, 2: uniforms, 3: linear depth |
//!
//! # Caching
//!
//! - Pipelines are cached by `(entry point, layout, output format)`.
//! - Bind groups are cached by the [`ResourceKey`]s of what they bind and
//!   dropped with [`BlitPipelines::clear_bind_groups`] when targets change.

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use super::keyed::{Keyed, ResourceKey};
use crate::effect::ScatteringUniforms;
use crate::errors::{Result, ScatteringError};
use crate::render::{FilterMode, MaterialId, Shading};

const SCATTERING_SHADER: &str = include_str!("../../shaders/scattering.wgsl");

/// Fragment entry points of the scattering material, indexed by sub-pass.
const SCATTERING_SUBPASSES: [Option<&str>; 4] = [Some("fs_copy"), None, None, Some("fs_fog")];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PipelineKey {
    entry_point: &'static str,
    material_layout: bool,
    format: wgpu::TextureFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct BindGroupKey {
    source_view: ResourceKey,
    sampler: ResourceKey,
    material: Option<(MaterialId, ResourceKey)>,
}

/// A material registered with the GPU backend.
pub struct GpuMaterial {
    entry_points: SmallVec<[Option<&'static str>; 4]>,
    uniform_buffer: Keyed<wgpu::Buffer>,
    uniform_size: u64,
}

impl GpuMaterial {
    fn entry_point(&self, subpass: u32) -> Option<&'static str> {
        self.entry_points.get(subpass as usize).copied().flatten()
    }
}

/// A resolved blit input.
pub struct BlitSource<'a> {
    pub view: &'a Keyed<wgpu::TextureView>,
    pub filter: FilterMode,
}

/// A resolved blit output.
pub struct BlitTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// Shared blit state: shader, layouts, samplers and caches.
pub struct BlitPipelines {
    shader: wgpu::ShaderModule,
    copy_layout: Keyed<wgpu::BindGroupLayout>,
    material_layout: Keyed<wgpu::BindGroupLayout>,
    copy_pipeline_layout: wgpu::PipelineLayout,
    material_pipeline_layout: wgpu::PipelineLayout,
    point_sampler: Keyed<wgpu::Sampler>,
    linear_sampler: Keyed<wgpu::Sampler>,
    /// Bound at binding 3 when the camera has no depth. All zeros, which the
    /// shader reads as "no geometry".
    empty_depth: Keyed<wgpu::TextureView>,

    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_groups: FxHashMap<BindGroupKey, wgpu::BindGroup>,
    materials: FxHashMap<MaterialId, GpuMaterial>,
}

impl BlitPipelines {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scattering Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SCATTERING_SHADER)),
        });

        let source_entries = [
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];

        let copy_layout = Keyed::new(device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Blit Copy Layout"),
                entries: &source_entries,
            },
        ));

        let material_layout = Keyed::new(device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Blit Material Layout"),
                entries: &[
                    source_entries[0],
                    source_entries[1],
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            },
        ));

        let copy_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Copy Pipeline Layout"),
            bind_group_layouts: &[&copy_layout],
            immediate_size: 0,
        });
        let material_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Blit Material Pipeline Layout"),
                bind_group_layouts: &[&material_layout],
                immediate_size: 0,
            });

        let point_sampler = Keyed::new(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Point Sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        }));
        let linear_sampler = Keyed::new(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Linear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        }));

        let empty_depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Empty Linear Depth"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let empty_depth = Keyed::new(
            empty_depth_texture.create_view(&wgpu::TextureViewDescriptor::default()),
        );

        Self {
            shader,
            copy_layout,
            material_layout,
            copy_pipeline_layout,
            material_pipeline_layout,
            point_sampler,
            linear_sampler,
            empty_depth,
            pipelines: FxHashMap::default(),
            bind_groups: FxHashMap::default(),
            materials: FxHashMap::default(),
        }
    }

    /// Registers the scattering material under `id`.
    pub fn register_scattering_material(&mut self, device: &wgpu::Device, id: MaterialId) {
        let uniform_size = std::mem::size_of::<ScatteringUniforms>() as u64;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scattering Uniforms"),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.materials.insert(
            id,
            GpuMaterial {
                entry_points: smallvec![
                    SCATTERING_SUBPASSES[0],
                    SCATTERING_SUBPASSES[1],
                    SCATTERING_SUBPASSES[2],
                    SCATTERING_SUBPASSES[3],
                ],
                uniform_buffer: Keyed::new(uniform_buffer),
                uniform_size,
            },
        );
    }

    /// Uploads a material's uniform block.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, id: MaterialId, data: &[u8]) -> Result<()> {
        let material = self
            .materials
            .get(&id)
            .ok_or(ScatteringError::MaterialNotFound(id))?;
        if data.len() as u64 != material.uniform_size {
            return Err(ScatteringError::UniformSizeMismatch {
                material: id,
                expected: material.uniform_size as usize,
                actual: data.len(),
            });
        }
        queue.write_buffer(&material.uniform_buffer, 0, data);
        Ok(())
    }

    /// Drops cached bind groups. Call when target views are replaced.
    pub fn clear_bind_groups(&mut self) {
        self.bind_groups.clear();
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Records one fullscreen blit into `encoder`.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        source: &BlitSource<'_>,
        target: &BlitTarget<'_>,
        shading: Option<Shading>,
        depth: Option<&Keyed<wgpu::TextureView>>,
    ) -> Result<()> {
        if !target.format.has_color_aspect() {
            return Err(ScatteringError::UnsupportedFormat(target.format));
        }

        let (entry_point, material) = match shading {
            None => ("fs_copy", None),
            Some(Shading { material, subpass }) => {
                let gpu_material = self
                    .materials
                    .get(&material)
                    .ok_or(ScatteringError::MaterialNotFound(material))?;
                let entry_point = gpu_material
                    .entry_point(subpass)
                    .ok_or(ScatteringError::InvalidSubpass { material, subpass })?;
                (entry_point, Some(material))
            }
        };

        let key = PipelineKey {
            entry_point,
            material_layout: material.is_some(),
            format: target.format,
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(device, key);
            self.pipelines.insert(key, pipeline);
        }

        let bind_group = self.bind_group(device, source, material, depth);
        let Some(pipeline) = self.pipelines.get(&key) else {
            return Ok(());
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(entry_point),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        log::debug!(
            "Compiling blit pipeline {} for format {:?}",
            key.entry_point,
            key.format
        );

        let layout = if key.material_layout {
            &self.material_pipeline_layout
        } else {
            &self.copy_pipeline_layout
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.entry_point),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(key.entry_point),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn bind_group(
        &mut self,
        device: &wgpu::Device,
        source: &BlitSource<'_>,
        material: Option<MaterialId>,
        depth: Option<&Keyed<wgpu::TextureView>>,
    ) -> wgpu::BindGroup {
        let sampler = match source.filter {
            FilterMode::Point => &self.point_sampler,
            FilterMode::Bilinear => &self.linear_sampler,
        };
        let depth = depth.unwrap_or(&self.empty_depth);

        let key = BindGroupKey {
            source_view: source.view.key(),
            sampler: sampler.key(),
            material: material.map(|id| (id, depth.key())),
        };
        if let Some(cached) = self.bind_groups.get(&key) {
            return cached.clone();
        }

        let gpu_material = material.and_then(|id| self.materials.get(&id));
        let bind_group = match gpu_material {
            Some(gpu_material) => device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blit Material BindGroup"),
                layout: &self.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: gpu_material.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(depth),
                    },
                ],
            }),
            None => device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blit Copy BindGroup"),
                layout: &self.copy_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }),
        };

        self.bind_groups.insert(key, bind_group.clone());
        bind_group
    }
}
