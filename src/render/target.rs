//! Render Target Identifiers & Descriptors
//!
//! Host-agnostic handles for everything a blit can read from or write to.
//!
//! | Handle                | Lifetime        | Created by                          |
//! |-----------------------|-----------------|-------------------------------------|
//! | [`TargetId::CameraColor`] | Backend-owned | The camera / swapchain            |
//! | [`TemporaryTargetId`] | One frame       | `GetTemporary` command              |
//! | [`TextureId`]         | Until destroyed | `CreateTexture` or backend helpers  |
//!
//! Identifiers are plain data; backends resolve them to GPU (or CPU) storage
//! when a command buffer is executed.

use std::hash::Hasher;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHasher;

static NEXT_TEXTURE_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_MATERIAL_ID: AtomicU32 = AtomicU32::new(1);

// ─── Texture Descriptor ───────────────────────────────────────────────────────

/// Describes a render texture: size, color format, depth attachment bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    /// Bits of the depth attachment. `0` means no depth attachment.
    pub depth_bits: u32,
    pub format: wgpu::TextureFormat,
    pub msaa_samples: u32,
    /// Whether the texture follows the dynamic-resolution scale.
    pub dynamic_scale: bool,
}

impl TextureDesc {
    /// A single-sampled color texture with a 24-bit depth attachment, the
    /// usual shape of a camera target.
    #[must_use]
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            depth_bits: 24,
            format,
            msaa_samples: 1,
            dynamic_scale: false,
        }
    }

    #[must_use]
    pub fn with_depth_bits(mut self, depth_bits: u32) -> Self {
        self.depth_bits = depth_bits;
        self
    }

    #[must_use]
    pub fn with_dynamic_scale(mut self, dynamic_scale: bool) -> Self {
        self.dynamic_scale = dynamic_scale;
        self
    }

    /// Returns a copy without a depth attachment.
    ///
    /// Post-process blits only touch color, so their working textures never
    /// carry depth.
    #[inline]
    #[must_use]
    pub fn without_depth(&self) -> Self {
        Self {
            depth_bits: 0,
            ..*self
        }
    }

    #[inline]
    #[must_use]
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Sampling filter used when a texture is read by a blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest-neighbor.
    Point,
    #[default]
    Bilinear,
}

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Frame-scoped texture slot, named like a shader property.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TemporaryTargetId(u32);

impl TemporaryTargetId {
    /// Derives a stable id from a property name, e.g. `"_TemporaryColorTexture"`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        Self(hasher.finish() as u32)
    }

    /// Like [`from_name`](Self::from_name), made distinct per `instance`.
    #[must_use]
    pub fn from_name_instance(name: &str, instance: u32) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        hasher.write_u32(instance);
        Self(hasher.finish() as u32)
    }

    #[inline]
    #[must_use]
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Long-lived texture owned by the backend until explicitly destroyed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TextureId(u32);

impl TextureId {
    /// Allocates a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a multi-technique material registered with a backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MaterialId(u32);

impl MaterialId {
    /// Allocates a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Anything a blit can read or write.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TargetId {
    /// The camera's current color target.
    CameraColor,
    Temporary(TemporaryTargetId),
    Texture(TextureId),
}

/// A named intermediate render target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RenderTargetHandle(TextureId);

impl RenderTargetHandle {
    #[must_use]
    pub fn new(id: TextureId) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub fn texture_id(self) -> TextureId {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn identifier(self) -> TargetId {
        TargetId::Texture(self.0)
    }
}

/// Where a pass writes its result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Destination {
    /// The final camera target. Writing here goes through a temporary copy,
    /// since the source is the camera color itself.
    #[default]
    CameraTarget,
    /// A named intermediate target.
    Target(RenderTargetHandle),
}
