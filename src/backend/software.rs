//! Software Render Context
//!
//! A CPU implementation of [`ScriptableRenderContext`] over RGBA8 images.
//!
//! It executes exactly the same command buffers as the GPU backend and keeps
//! counters of every allocation, release and blit, which makes it suitable
//! for headless rendering and for checking pass behavior texel by texel.
//! A full command history can be recorded on request
//! ([`SoftwareRenderContext::with_history`]).
//!
//! # Sampling
//!
//! Blits between differently sized targets use nearest-neighbor sampling
//! regardless of the target's filter mode.
//!
//! # Depth
//!
//! Shaded blits receive the camera's linear view depth at the destination
//! texel (mapped by normalized coordinates). Without a depth buffer every
//! texel reports `0.0`, which fog treats as the far plane.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::effect::ScatteringUniforms;
use crate::errors::{Result, ScatteringError};
use crate::render::{
    CommandBuffer, FilterMode, MaterialId, RenderCommand, RenderTargetHandle,
    ScriptableRenderContext, Shading, TargetId, TemporaryTargetId, TextureDesc, TextureId,
};

// ─── Images ───────────────────────────────────────────────────────────────────

/// An RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftwareImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl SoftwareImage {
    /// A transparent-black image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Raw bytes in row-major RGBA order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Nearest texel for the normalized coordinates of texel (`x`, `y`)
    /// in a `width` × `height` grid.
    fn sample_nearest(&self, x: u32, y: u32, width: u32, height: u32) -> [u8; 4] {
        let sx = remap(x, width, self.width);
        let sy = remap(y, height, self.height);
        self.pixel(sx, sy)
    }
}

fn remap(coord: u32, from: u32, to: u32) -> u32 {
    if from == to {
        return coord;
    }
    let scaled = (u64::from(coord) * u64::from(to) + u64::from(to) / 2) / u64::from(from.max(1));
    (scaled as u32).min(to.saturating_sub(1))
}

// ─── Materials ────────────────────────────────────────────────────────────────

/// Shades one texel: `(uniform bytes, input color, linear depth) -> color`.
pub type ShadeFn = Box<dyn Fn(&[u8], [u8; 4], f32) -> [u8; 4]>;

/// A multi-technique CPU material.
pub struct SoftwareMaterial {
    subpasses: SmallVec<[Option<ShadeFn>; 4]>,
    uniform_size: Option<usize>,
    uniforms: Vec<u8>,
}

impl SoftwareMaterial {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subpasses: SmallVec::new(),
            uniform_size: None,
            uniforms: Vec::new(),
        }
    }

    /// Installs `shade` at sub-pass `index`.
    #[must_use]
    pub fn with_subpass(
        mut self,
        index: u32,
        shade: impl Fn(&[u8], [u8; 4], f32) -> [u8; 4] + 'static,
    ) -> Self {
        let index = index as usize;
        if self.subpasses.len() <= index {
            self.subpasses.resize_with(index + 1, || None);
        }
        self.subpasses[index] = Some(Box::new(shade));
        self
    }

    /// Requires uniform uploads to be exactly `size` bytes.
    #[must_use]
    pub fn with_uniform_size(mut self, size: usize) -> Self {
        self.uniform_size = Some(size);
        self
    }

    /// CPU twin of `scattering.wgsl`: copy at 0, fog at 3.
    #[must_use]
    pub fn atmospheric_scattering() -> Self {
        Self::new()
            .with_uniform_size(std::mem::size_of::<ScatteringUniforms>())
            .with_subpass(0, |_, color, _| color)
            .with_subpass(
                crate::passes::ATMOSPHERIC_FOG_SUBPASS,
                |uniforms, color, depth| {
                    if uniforms.len() != std::mem::size_of::<ScatteringUniforms>() {
                        return color;
                    }
                    let uniforms: ScatteringUniforms = bytemuck::pod_read_unaligned(uniforms);
                    uniforms.apply(color, depth)
                },
            )
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[u8] {
        &self.uniforms
    }

    fn subpass(&self, index: u32) -> Option<&ShadeFn> {
        self.subpasses.get(index as usize).and_then(Option::as_ref)
    }
}

impl Default for SoftwareMaterial {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Statistics ───────────────────────────────────────────────────────────────

/// Counters of executed work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub submissions: u32,
    pub temporary_allocations: u32,
    pub temporary_releases: u32,
    pub textures_created: u32,
    pub textures_destroyed: u32,
    pub uniform_uploads: u32,
    pub blits: u32,
    pub shaded_blits: u32,
}

// ─── Context ──────────────────────────────────────────────────────────────────

struct Temporary {
    image: SoftwareImage,
    filter: FilterMode,
}

/// CPU render context.
pub struct SoftwareRenderContext {
    camera_color: SoftwareImage,
    camera_depth: Option<Vec<f32>>,
    textures: FxHashMap<TextureId, SoftwareImage>,
    temporaries: FxHashMap<TemporaryTargetId, Temporary>,
    materials: FxHashMap<MaterialId, SoftwareMaterial>,
    stats: SoftwareStats,
    /// `Some` only when recording was enabled with `with_history`.
    history: Option<Vec<RenderCommand>>,
}

impl SoftwareRenderContext {
    #[must_use]
    pub fn new(camera_color: SoftwareImage) -> Self {
        Self {
            camera_color,
            camera_depth: None,
            textures: FxHashMap::default(),
            temporaries: FxHashMap::default(),
            materials: FxHashMap::default(),
            stats: SoftwareStats::default(),
            history: None,
        }
    }

    /// Enables or disables recording of executed commands.
    ///
    /// Off by default: the history keeps a copy of every command, uniform
    /// bytes included, and is never trimmed.
    #[must_use]
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = enabled.then(Vec::new);
        self
    }

    /// Replaces the camera color (e.g. after the scene was redrawn).
    pub fn set_camera_color(&mut self, image: SoftwareImage) {
        if image.width != self.camera_color.width || image.height != self.camera_color.height {
            self.camera_depth = None;
        }
        self.camera_color = image;
    }

    /// Sets linear view depth for the camera, one value per texel.
    pub fn set_camera_depth(&mut self, depth: Vec<f32>) -> Result<()> {
        let expected = self.camera_color.pixels.len();
        if depth.len() != expected {
            return Err(ScatteringError::DepthSizeMismatch {
                expected,
                actual: depth.len(),
            });
        }
        self.camera_depth = Some(depth);
        Ok(())
    }

    pub fn clear_camera_depth(&mut self) {
        self.camera_depth = None;
    }

    #[inline]
    #[must_use]
    pub fn camera_color(&self) -> &SoftwareImage {
        &self.camera_color
    }

    /// Creates a named target sized by `desc`.
    pub fn create_target(&mut self, desc: &TextureDesc) -> RenderTargetHandle {
        let id = TextureId::next();
        self.textures
            .insert(id, SoftwareImage::new(desc.width, desc.height));
        RenderTargetHandle::new(id)
    }

    #[must_use]
    pub fn target(&self, handle: RenderTargetHandle) -> Option<&SoftwareImage> {
        self.textures.get(&handle.texture_id())
    }

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&SoftwareImage> {
        self.textures.get(&id)
    }

    /// Live temporary targets.
    #[inline]
    #[must_use]
    pub fn temporary_count(&self) -> usize {
        self.temporaries.len()
    }

    #[must_use]
    pub fn temporary(&self, id: TemporaryTargetId) -> Option<&SoftwareImage> {
        self.temporaries.get(&id).map(|t| &t.image)
    }

    pub fn register_material(&mut self, id: MaterialId, material: SoftwareMaterial) {
        self.materials.insert(id, material);
    }

    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&SoftwareMaterial> {
        self.materials.get(&id)
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Every command executed so far, in order. Empty unless enabled with
    /// [`with_history`](Self::with_history).
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[RenderCommand] {
        self.history.as_deref().unwrap_or_default()
    }

    pub fn clear_history(&mut self) {
        if let Some(history) = &mut self.history {
            history.clear();
        }
    }

    fn image(&self, target: TargetId) -> Result<&SoftwareImage> {
        match target {
            TargetId::CameraColor => Ok(&self.camera_color),
            TargetId::Temporary(id) => self
                .temporaries
                .get(&id)
                .map(|t| &t.image)
                .ok_or(ScatteringError::TargetNotFound(target)),
            TargetId::Texture(id) => self
                .textures
                .get(&id)
                .ok_or(ScatteringError::TargetNotFound(target)),
        }
    }

    fn image_mut(&mut self, target: TargetId) -> Result<&mut SoftwareImage> {
        match target {
            TargetId::CameraColor => Ok(&mut self.camera_color),
            TargetId::Temporary(id) => self
                .temporaries
                .get_mut(&id)
                .map(|t| &mut t.image)
                .ok_or(ScatteringError::TargetNotFound(target)),
            TargetId::Texture(id) => self
                .textures
                .get_mut(&id)
                .ok_or(ScatteringError::TargetNotFound(target)),
        }
    }

    fn depth_at(&self, x: u32, y: u32, width: u32, height: u32) -> f32 {
        let Some(depth) = &self.camera_depth else {
            return 0.0;
        };
        let dx = remap(x, width, self.camera_color.width);
        let dy = remap(y, height, self.camera_color.height);
        depth[(dy * self.camera_color.width + dx) as usize]
    }

    fn blit(&mut self, source: TargetId, destination: TargetId, shading: Option<Shading>) -> Result<()> {
        let (width, height) = {
            let dst = self.image(destination)?;
            (dst.width, dst.height)
        };
        let src = self.image(source)?;

        let output = match shading {
            None => SoftwareImage::from_fn(width, height, |x, y| src.sample_nearest(x, y, width, height)),
            Some(Shading { material, subpass }) => {
                let mat = self
                    .materials
                    .get(&material)
                    .ok_or(ScatteringError::MaterialNotFound(material))?;
                let shade = mat
                    .subpass(subpass)
                    .ok_or(ScatteringError::InvalidSubpass { material, subpass })?;
                SoftwareImage::from_fn(width, height, |x, y| {
                    let color = src.sample_nearest(x, y, width, height);
                    shade(mat.uniforms.as_slice(), color, self.depth_at(x, y, width, height))
                })
            }
        };

        *self.image_mut(destination)? = output;

        if shading.is_some() {
            self.stats.shaded_blits += 1;
        } else {
            self.stats.blits += 1;
        }
        Ok(())
    }

    fn apply(&mut self, command: &RenderCommand) -> Result<()> {
        match command {
            RenderCommand::GetTemporary { id, desc, filter } => {
                if self.temporaries.contains_key(id) {
                    return Err(ScatteringError::TemporaryTargetInUse(*id));
                }
                self.temporaries.insert(
                    *id,
                    Temporary {
                        image: SoftwareImage::new(desc.width, desc.height),
                        filter: *filter,
                    },
                );
                self.stats.temporary_allocations += 1;
            }
            RenderCommand::ReleaseTemporary(id) => {
                let released = self
                    .temporaries
                    .remove(id)
                    .ok_or(ScatteringError::TemporaryTargetNotAllocated(*id))?;
                log::trace!("Released temporary {id:?} ({:?})", released.filter);
                self.stats.temporary_releases += 1;
            }
            RenderCommand::CreateTexture { id, desc } => {
                self.textures
                    .insert(*id, SoftwareImage::new(desc.width, desc.height));
                self.stats.textures_created += 1;
            }
            RenderCommand::DestroyTexture(id) => {
                self.textures
                    .remove(id)
                    .ok_or(ScatteringError::TargetNotFound(TargetId::Texture(*id)))?;
                self.stats.textures_destroyed += 1;
            }
            RenderCommand::SetMaterialUniforms { material, data } => {
                let mat = self
                    .materials
                    .get_mut(material)
                    .ok_or(ScatteringError::MaterialNotFound(*material))?;
                if let Some(expected) = mat.uniform_size
                    && expected != data.len()
                {
                    return Err(ScatteringError::UniformSizeMismatch {
                        material: *material,
                        expected,
                        actual: data.len(),
                    });
                }
                mat.uniforms.clone_from(data);
                self.stats.uniform_uploads += 1;
            }
            RenderCommand::Blit {
                source,
                destination,
                shading,
            } => self.blit(*source, *destination, *shading)?,
        }
        Ok(())
    }
}

impl ScriptableRenderContext for SoftwareRenderContext {
    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> Result<()> {
        log::trace!("Executing command buffer {} ({} commands)", cmd.name(), cmd.len());
        self.stats.submissions += 1;
        for command in cmd.commands() {
            self.apply(command)?;
            if let Some(history) = &mut self.history {
                history.push(command.clone());
            }
        }
        Ok(())
    }
}
