//! Frame plumbing shared by passes and backends.
//!
//! Provides:
//! - Target identifiers and descriptors (`TargetId`, `TextureDesc`, `Destination`)
//! - Command recording (`CommandBuffer`, `CommandBufferPool`, `TemporaryLease`)
//! - The pass interface (`ScriptableRenderPass`, `RenderPassEvent`)
//! - The renderer / feature interfaces and a reference frame queue (`PassQueue`)

pub mod command;
pub mod context;
pub mod pass;
pub mod renderer;
pub mod target;

pub use command::{
    CommandBuffer, CommandBufferPool, PooledCommandBuffer, RenderCommand, Shading, TemporaryLease,
};
pub use context::ScriptableRenderContext;
pub use pass::{
    CameraData, CameraId, RenderPassEvent, RenderingData, ScriptableRenderPass, SharedPass,
};
pub use renderer::{PassQueue, ScriptableRenderer, ScriptableRendererFeature};
pub use target::{
    Destination, FilterMode, MaterialId, RenderTargetHandle, TargetId, TemporaryTargetId,
    TextureDesc, TextureId,
};
