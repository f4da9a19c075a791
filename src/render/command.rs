//! Command Recording
//!
//! Passes never touch GPU objects directly. They record [`RenderCommand`]s
//! into a [`CommandBuffer`], and the render context executes the buffer later.
//!
//! ```text
//! CommandBufferPool::scoped() ──► PooledCommandBuffer ──► pass records commands
//!                                        │
//!                                        ├──► ScriptableRenderContext::execute_command_buffer
//!                                        ▼
//!                              Drop: buffer cleared, returned to pool
//! ```
//!
//! Buffers are recycled so steady-state frames do not allocate.

use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

use super::target::{FilterMode, MaterialId, TargetId, TemporaryTargetId, TextureDesc, TextureId};

/// Material technique applied by a shaded blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shading {
    pub material: MaterialId,
    pub subpass: u32,
}

/// A single recorded operation.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Request a frame-scoped texture from the backend's pool.
    GetTemporary {
        id: TemporaryTargetId,
        desc: TextureDesc,
        filter: FilterMode,
    },
    /// Return a frame-scoped texture to the pool.
    ReleaseTemporary(TemporaryTargetId),
    /// Create a long-lived texture.
    CreateTexture { id: TextureId, desc: TextureDesc },
    DestroyTexture(TextureId),
    /// Replace a material's uniform block.
    SetMaterialUniforms { material: MaterialId, data: Vec<u8> },
    /// Copy `source` into `destination`, optionally through a material sub-pass.
    Blit {
        source: TargetId,
        destination: TargetId,
        shading: Option<Shading>,
    },
}

/// An ordered list of recorded commands.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    name: Cow<'static, str>,
    commands: Vec<RenderCommand>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn get_temporary_rt(&mut self, id: TemporaryTargetId, desc: TextureDesc, filter: FilterMode) {
        self.commands.push(RenderCommand::GetTemporary { id, desc, filter });
    }

    pub fn release_temporary_rt(&mut self, id: TemporaryTargetId) {
        self.commands.push(RenderCommand::ReleaseTemporary(id));
    }

    pub fn create_texture(&mut self, id: TextureId, desc: TextureDesc) {
        self.commands.push(RenderCommand::CreateTexture { id, desc });
    }

    pub fn destroy_texture(&mut self, id: TextureId) {
        self.commands.push(RenderCommand::DestroyTexture(id));
    }

    pub fn set_material_uniforms(&mut self, material: MaterialId, data: &[u8]) {
        self.commands.push(RenderCommand::SetMaterialUniforms {
            material,
            data: data.to_vec(),
        });
    }

    /// Plain copy.
    pub fn blit(&mut self, source: TargetId, destination: TargetId) {
        self.commands.push(RenderCommand::Blit {
            source,
            destination,
            shading: None,
        });
    }

    /// Shaded copy through `material`'s technique at `subpass`.
    pub fn blit_with_material(
        &mut self,
        source: TargetId,
        destination: TargetId,
        material: MaterialId,
        subpass: u32,
    ) {
        self.commands.push(RenderCommand::Blit {
            source,
            destination,
            shading: Some(Shading { material, subpass }),
        });
    }
}

// ─── Pool ─────────────────────────────────────────────────────────────────────

/// Recycles command buffers across frames.
#[derive(Debug, Default)]
pub struct CommandBufferPool {
    free: Vec<CommandBuffer>,
    outstanding: usize,
}

impl CommandBufferPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a buffer out of the pool. Pair with [`release`](Self::release),
    /// or use [`scoped`](Self::scoped) to have it returned automatically.
    pub fn get(&mut self, name: impl Into<Cow<'static, str>>) -> CommandBuffer {
        self.outstanding += 1;
        match self.free.pop() {
            Some(mut cmd) => {
                cmd.name = name.into();
                cmd
            }
            None => CommandBuffer::new(name),
        }
    }

    pub fn release(&mut self, mut cmd: CommandBuffer) {
        cmd.clear();
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free.push(cmd);
    }

    /// Takes a buffer that goes back to the pool when the guard drops.
    pub fn scoped(&mut self, name: impl Into<Cow<'static, str>>) -> PooledCommandBuffer<'_> {
        let cmd = self.get(name);
        PooledCommandBuffer {
            pool: self,
            cmd: Some(cmd),
        }
    }

    /// Buffers handed out and not yet returned.
    #[inline]
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

/// A command buffer borrowed from a [`CommandBufferPool`].
pub struct PooledCommandBuffer<'a> {
    pool: &'a mut CommandBufferPool,
    cmd: Option<CommandBuffer>,
}

impl Deref for PooledCommandBuffer<'_> {
    type Target = CommandBuffer;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the buffer out.
        self.cmd.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledCommandBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cmd.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledCommandBuffer<'_> {
    fn drop(&mut self) {
        if let Some(cmd) = self.cmd.take() {
            self.pool.release(cmd);
        }
    }
}

// ─── Temporary Lease ──────────────────────────────────────────────────────────

/// Proof that a `GetTemporary` was recorded for `id`.
///
/// Not `Clone`: [`release`](Self::release) consumes the lease, so every
/// allocation is released at most once. Recording is not executing: keep the
/// lease only after the buffer holding the `GetTemporary` was submitted
/// successfully, otherwise the release refers to a target that never existed.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a leased temporary target must be released"]
pub struct TemporaryLease {
    id: TemporaryTargetId,
}

impl TemporaryLease {
    pub fn acquire(
        cmd: &mut CommandBuffer,
        id: TemporaryTargetId,
        desc: TextureDesc,
        filter: FilterMode,
    ) -> Self {
        cmd.get_temporary_rt(id, desc, filter);
        Self { id }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TemporaryTargetId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn identifier(&self) -> TargetId {
        TargetId::Temporary(self.id)
    }

    pub fn release(self, cmd: &mut CommandBuffer) {
        cmd.release_temporary_rt(self.id);
    }
}
