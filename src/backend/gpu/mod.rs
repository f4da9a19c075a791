//! wgpu Render Context
//!
//! Executes recorded command buffers on the GPU. Each submitted
//! [`CommandBuffer`] becomes one `wgpu::CommandEncoder` and one queue submit.
//!
//! # Target Requirements
//!
//! The camera color texture must be created with
//! `RENDER_ATTACHMENT | TEXTURE_BINDING`. The optional camera depth is a
//! linear view-depth `R32Float` view (0 = no geometry), not a depth-stencil
//! attachment.
//!
//! Shaded blits that read and write the same target are rejected: a texture
//! cannot be sampled and rendered in the same pass.

mod blit;
mod keyed;
mod transient_pool;

use rustc_hash::FxHashMap;

pub use blit::BlitPipelines;
pub use keyed::{Keyed, ResourceKey};
pub use transient_pool::{TARGET_USAGE, TransientTexturePool};

use blit::{BlitSource, BlitTarget};

use crate::errors::{Result, ScatteringError};
use crate::render::{
    CommandBuffer, FilterMode, MaterialId, RenderCommand, RenderTargetHandle,
    ScriptableRenderContext, Shading, TargetId, TextureDesc, TextureId,
};

/// A render target texture with its default view.
struct TargetTexture {
    texture: wgpu::Texture,
    view: Keyed<wgpu::TextureView>,
}

impl TargetTexture {
    fn new(texture: wgpu::Texture) -> Self {
        let view = Keyed::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Self { texture, view }
    }

    fn create(device: &wgpu::Device, desc: &TextureDesc, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: TARGET_USAGE,
            view_formats: &[],
        });
        Self::new(texture)
    }
}

/// GPU render context.
pub struct WgpuRenderContext {
    device: wgpu::Device,
    queue: wgpu::Queue,

    camera_color: TargetTexture,
    camera_depth: Option<Keyed<wgpu::TextureView>>,
    textures: FxHashMap<TextureId, TargetTexture>,
    transient_pool: TransientTexturePool,
    blitter: BlitPipelines,
}

impl WgpuRenderContext {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, camera_color: wgpu::Texture) -> Self {
        let blitter = BlitPipelines::new(&device);
        Self {
            device,
            queue,
            camera_color: TargetTexture::new(camera_color),
            camera_depth: None,
            textures: FxHashMap::default(),
            transient_pool: TransientTexturePool::new(),
            blitter,
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Replaces the camera color, e.g. with this frame's swapchain texture.
    pub fn set_camera_color(&mut self, texture: wgpu::Texture) {
        self.camera_color = TargetTexture::new(texture);
        self.blitter.clear_bind_groups();
    }

    #[inline]
    #[must_use]
    pub fn camera_color(&self) -> &wgpu::Texture {
        &self.camera_color.texture
    }

    /// Sets the linear view-depth view used by fog sub-passes.
    pub fn set_camera_depth(&mut self, view: Option<wgpu::TextureView>) {
        self.camera_depth = view.map(Keyed::new);
        self.blitter.clear_bind_groups();
    }

    /// Creates a named target sized by `desc`.
    pub fn create_target(&mut self, desc: &TextureDesc) -> RenderTargetHandle {
        let id = TextureId::next();
        self.textures
            .insert(id, TargetTexture::create(&self.device, desc, "Render Target"));
        RenderTargetHandle::new(id)
    }

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&wgpu::Texture> {
        self.textures.get(&id).map(|t| &t.texture)
    }

    pub fn register_scattering_material(&mut self, id: MaterialId) {
        self.blitter.register_scattering_material(&self.device, id);
    }

    #[inline]
    #[must_use]
    pub fn transient_pool(&self) -> &TransientTexturePool {
        &self.transient_pool
    }

    /// Frees pooled temporaries idle for more than `max_idle_frames` calls.
    pub fn trim(&mut self, max_idle_frames: u32) {
        self.transient_pool.trim(max_idle_frames);
        self.blitter.clear_bind_groups();
    }

    fn resolve(&self, target: TargetId) -> Result<(Keyed<wgpu::TextureView>, wgpu::TextureFormat, FilterMode)> {
        match target {
            TargetId::CameraColor => Ok((
                self.camera_color.view.clone(),
                self.camera_color.texture.format(),
                FilterMode::Bilinear,
            )),
            TargetId::Temporary(id) => {
                let view = self
                    .transient_pool
                    .view(id)
                    .ok_or(ScatteringError::TargetNotFound(target))?;
                let format = self
                    .transient_pool
                    .texture(id)
                    .map(wgpu::Texture::format)
                    .ok_or(ScatteringError::TargetNotFound(target))?;
                let filter = self.transient_pool.filter(id).unwrap_or_default();
                Ok((view.clone(), format, filter))
            }
            TargetId::Texture(id) => {
                let texture = self
                    .textures
                    .get(&id)
                    .ok_or(ScatteringError::TargetNotFound(target))?;
                Ok((texture.view.clone(), texture.texture.format(), FilterMode::Bilinear))
            }
        }
    }

    fn encode_blit(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        source: TargetId,
        destination: TargetId,
        shading: Option<Shading>,
    ) -> Result<()> {
        if source == destination {
            return Err(ScatteringError::SameTargetBlit(source));
        }

        let (source_view, _, filter) = self.resolve(source)?;
        let (target_view, format, _) = self.resolve(destination)?;

        self.blitter.encode(
            &self.device,
            encoder,
            &BlitSource {
                view: &source_view,
                filter,
            },
            &BlitTarget {
                view: &target_view,
                format,
            },
            shading,
            self.camera_depth.as_ref(),
        )
    }

    fn apply(&mut self, encoder: &mut wgpu::CommandEncoder, command: &RenderCommand) -> Result<()> {
        match command {
            RenderCommand::GetTemporary { id, desc, filter } => {
                self.transient_pool
                    .acquire(&self.device, *id, desc, *filter)?;
            }
            RenderCommand::ReleaseTemporary(id) => self.transient_pool.release(*id)?,
            RenderCommand::CreateTexture { id, desc } => {
                log::debug!(
                    "Creating persistent texture {id:?} {}x{}",
                    desc.width,
                    desc.height
                );
                self.textures
                    .insert(*id, TargetTexture::create(&self.device, desc, "Persistent Texture"));
            }
            RenderCommand::DestroyTexture(id) => {
                // Dropped rather than destroyed: earlier commands in this
                // encoder may still reference it.
                self.textures
                    .remove(id)
                    .ok_or(ScatteringError::TargetNotFound(TargetId::Texture(*id)))?;
                self.blitter.clear_bind_groups();
            }
            RenderCommand::SetMaterialUniforms { material, data } => {
                self.blitter.write_uniforms(&self.queue, *material, data)?;
            }
            RenderCommand::Blit {
                source,
                destination,
                shading,
            } => self.encode_blit(encoder, *source, *destination, *shading)?,
        }
        Ok(())
    }
}

impl ScriptableRenderContext for WgpuRenderContext {
    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> Result<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(cmd.name()),
            });

        // Commands applied before a failure are still submitted so the
        // encoder's work is not lost.
        let result = cmd
            .commands()
            .iter()
            .try_for_each(|command| self.apply(&mut encoder, command));

        self.queue.submit(std::iter::once(encoder.finish()));
        result
    }
}
