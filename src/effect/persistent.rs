//! Persistent Render Texture
//!
//! A texture that lives across frames and follows the camera target's shape.
//! [`PersistentTexture::ensure`] compares the requested descriptor with the
//! cached one and records a reallocation when they differ, so a resolution
//! change is picked up on the next configure.

use crate::render::{CommandBuffer, TargetId, TextureDesc, TextureId};

/// Lazily allocated, descriptor-tracked texture slot.
#[derive(Debug, Default)]
pub struct PersistentTexture {
    slot: Option<(TextureId, TextureDesc)>,
    allocations: u32,
}

impl PersistentTexture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the texture matches `desc` (with dynamic scaling on).
    ///
    /// Records `CreateTexture` on first use, and `DestroyTexture` +
    /// `CreateTexture` when the descriptor changed. Returns `true` when
    /// anything was recorded.
    pub fn ensure(&mut self, cmd: &mut CommandBuffer, desc: &TextureDesc) -> bool {
        let wanted = desc.with_dynamic_scale(true);

        if let Some((id, current)) = self.slot {
            if current == wanted {
                return false;
            }
            log::debug!(
                "Persistent texture {id:?} resized {}x{} -> {}x{}",
                current.width,
                current.height,
                wanted.width,
                wanted.height
            );
            cmd.destroy_texture(id);
        }

        let id = TextureId::next();
        cmd.create_texture(id, wanted);
        self.slot = Some((id, wanted));
        self.allocations += 1;
        true
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<TextureId> {
        self.slot.map(|(id, _)| id)
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> Option<&TextureDesc> {
        self.slot.as_ref().map(|(_, desc)| desc)
    }

    #[inline]
    #[must_use]
    pub fn identifier(&self) -> Option<TargetId> {
        self.id().map(TargetId::Texture)
    }

    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.slot.is_some()
    }

    /// How many times the texture was (re)allocated.
    #[inline]
    #[must_use]
    pub fn allocation_count(&self) -> u32 {
        self.allocations
    }
}
