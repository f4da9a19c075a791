//! Transient Texture Pool
//!
//! GPU textures behind `GetTemporary` / `ReleaseTemporary` commands.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              TransientTexturePool                    │
//! │                                                     │
//! │  active: TemporaryTargetId → PooledTexture          │
//! │  free:   HashMap<Key, Vec<PooledTexture>>           │
//! │                                                     │
//! │  acquire(id, desc)  (GetTemporary)                  │
//! │  view(id)           (Blit)                          │
//! │  release(id)        (ReleaseTemporary)              │
//! │  trim(n)            (after resolution changes)      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Released textures stay in the free pool for reuse.
//! - The pool grows on demand when no compatible free texture exists.
//! - [`TransientTexturePool::trim`] drops textures idle for too many calls.

use rustc_hash::FxHashMap;

use super::keyed::Keyed;
use crate::errors::{Result, ScatteringError};
use crate::render::{FilterMode, TemporaryTargetId, TextureDesc};

/// Usage of every render target the backend creates.
pub const TARGET_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Key for texture recycling.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct PoolKey {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl PoolKey {
    pub(crate) fn from_desc(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width.max(1),
            height: desc.height.max(1),
            format: desc.format,
        }
    }
}

struct PooledTexture {
    key: PoolKey,
    texture: wgpu::Texture,
    view: Keyed<wgpu::TextureView>,
    filter: FilterMode,
    /// Number of trims this texture has survived in the free pool.
    idle_frames: u32,
}

impl PooledTexture {
    fn new(device: &wgpu::Device, key: PoolKey) -> Self {
        // Post-process targets are sampled afterwards, so they are always
        // single-sampled.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Transient Target"),
            size: wgpu::Extent3d {
                width: key.width,
                height: key.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: key.format,
            usage: TARGET_USAGE,
            view_formats: &[],
        });
        let view = Keyed::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));

        Self {
            key,
            texture,
            view,
            filter: FilterMode::default(),
            idle_frames: 0,
        }
    }
}

/// Pool of temporary render targets.
pub struct TransientTexturePool {
    active: FxHashMap<TemporaryTargetId, PooledTexture>,
    free: FxHashMap<PoolKey, Vec<PooledTexture>>,
}

impl TransientTexturePool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: FxHashMap::default(),
            free: FxHashMap::default(),
        }
    }

    /// Binds a texture matching `desc` to `id`, reusing a free one if possible.
    pub fn acquire(
        &mut self,
        device: &wgpu::Device,
        id: TemporaryTargetId,
        desc: &TextureDesc,
        filter: FilterMode,
    ) -> Result<()> {
        if self.active.contains_key(&id) {
            return Err(ScatteringError::TemporaryTargetInUse(id));
        }

        let key = PoolKey::from_desc(desc);
        let mut pooled = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(mut t) => {
                t.idle_frames = 0;
                t
            }
            None => {
                log::debug!(
                    "Allocating transient target {}x{} {:?}",
                    key.width,
                    key.height,
                    key.format
                );
                PooledTexture::new(device, key)
            }
        };
        pooled.filter = filter;

        self.active.insert(id, pooled);
        Ok(())
    }

    /// Returns the texture bound to `id` to the free pool.
    pub fn release(&mut self, id: TemporaryTargetId) -> Result<()> {
        let pooled = self
            .active
            .remove(&id)
            .ok_or(ScatteringError::TemporaryTargetNotAllocated(id))?;
        self.free.entry(pooled.key).or_default().push(pooled);
        Ok(())
    }

    #[must_use]
    #[inline]
    pub fn view(&self, id: TemporaryTargetId) -> Option<&Keyed<wgpu::TextureView>> {
        self.active.get(&id).map(|t| &t.view)
    }

    #[must_use]
    #[inline]
    pub fn texture(&self, id: TemporaryTargetId) -> Option<&wgpu::Texture> {
        self.active.get(&id).map(|t| &t.texture)
    }

    #[must_use]
    #[inline]
    pub fn filter(&self, id: TemporaryTargetId) -> Option<FilterMode> {
        self.active.get(&id).map(|t| t.filter)
    }

    /// Releases free textures that have been idle for more than
    /// `max_idle_frames` calls.
    pub fn trim(&mut self, max_idle_frames: u32) {
        for bucket in self.free.values_mut() {
            for t in bucket.iter_mut() {
                t.idle_frames += 1;
            }
            bucket.retain(|t| t.idle_frames <= max_idle_frames);
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active and free textures.
    #[must_use]
    pub fn total_texture_count(&self) -> usize {
        self.active.len() + self.free.values().map(Vec::len).sum::<usize>()
    }
}

impl Default for TransientTexturePool {
    fn default() -> Self {
        Self::new()
    }
}
