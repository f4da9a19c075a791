//! Render contexts that execute recorded command buffers.
//!
//! - [`SoftwareRenderContext`]: CPU, RGBA8, headless.
//! - [`WgpuRenderContext`]: GPU via wgpu.

pub mod gpu;
pub mod software;

pub use gpu::WgpuRenderContext;
pub use software::{SoftwareImage, SoftwareMaterial, SoftwareRenderContext, SoftwareStats};
