//! Render Pass Trait
//!
//! Defines the interface every pass in the frame queue implements.
//!
//! # Phases
//!
//! The host drives each enqueued pass through four phases per frame, strictly
//! in order:
//!
//! ```text
//! setup (by the feature) → configure → execute → frame_cleanup
//! ```
//!
//! - `configure` may record resource creation for the frame.
//! - `execute` records and submits the pass's commands.
//! - `frame_cleanup` releases anything `execute` leased, and runs even when
//!   `execute` failed.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::command::{CommandBuffer, CommandBufferPool};
use super::context::ScriptableRenderContext;
use super::target::TextureDesc;
use crate::errors::Result;

/// Where in the frame timeline a pass runs.
///
/// This is an ordering token only; the pass passes it through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderPassEvent {
    BeforeRendering,
    BeforeRenderingShadows,
    AfterRenderingShadows,
    BeforeRenderingPrePasses,
    AfterRenderingPrePasses,
    BeforeRenderingOpaques,
    AfterRenderingOpaques,
    BeforeRenderingSkybox,
    AfterRenderingSkybox,
    BeforeRenderingTransparents,
    AfterRenderingTransparents,
    #[default]
    BeforeRenderingPostProcessing,
    AfterRenderingPostProcessing,
    AfterRendering,
    /// Host-specific slot between the named points.
    Custom(i32),
}

impl RenderPassEvent {
    /// Sort key within the frame. Lower runs earlier.
    #[must_use]
    pub const fn order(self) -> i32 {
        match self {
            Self::BeforeRendering => 0,
            Self::BeforeRenderingShadows => 50,
            Self::AfterRenderingShadows => 100,
            Self::BeforeRenderingPrePasses => 150,
            Self::AfterRenderingPrePasses => 200,
            Self::BeforeRenderingOpaques => 250,
            Self::AfterRenderingOpaques => 300,
            Self::BeforeRenderingSkybox => 350,
            Self::AfterRenderingSkybox => 400,
            Self::BeforeRenderingTransparents => 450,
            Self::AfterRenderingTransparents => 500,
            Self::BeforeRenderingPostProcessing => 550,
            Self::AfterRenderingPostProcessing => 600,
            Self::AfterRendering => 1000,
            Self::Custom(order) => order,
        }
    }
}

/// Identifies a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub u32);

/// Per-camera frame data.
#[derive(Debug, Clone, Copy)]
pub struct CameraData {
    pub camera: CameraId,
    /// Descriptor of the camera's color target for this frame.
    pub target_descriptor: TextureDesc,
}

/// Everything a pass may read about the frame being rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderingData {
    pub camera: CameraData,
}

impl RenderingData {
    #[must_use]
    pub fn new(camera: CameraId, target_descriptor: TextureDesc) -> Self {
        Self {
            camera: CameraData {
                camera,
                target_descriptor,
            },
        }
    }
}

/// A pass shared between the feature that owns it and the frame queue.
pub type SharedPass = Rc<RefCell<dyn ScriptableRenderPass>>;

/// Render pass trait.
pub trait ScriptableRenderPass {
    /// Name used for command buffer labels and logging.
    fn name(&self) -> &str;

    fn render_pass_event(&self) -> RenderPassEvent;

    /// Called before `execute` every frame with the camera target descriptor.
    fn configure(&mut self, _cmd: &mut CommandBuffer, _camera_descriptor: &TextureDesc) {}

    /// Records and submits this pass's commands for the frame.
    fn execute(
        &mut self,
        ctx: &mut dyn ScriptableRenderContext,
        rendering_data: &RenderingData,
        pool: &mut CommandBufferPool,
    ) -> Result<()>;

    /// Releases anything allocated during `execute`.
    fn frame_cleanup(&mut self, _cmd: &mut CommandBuffer) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_order_follows_frame_timeline() {
        assert!(
            RenderPassEvent::AfterRenderingOpaques.order()
                < RenderPassEvent::BeforeRenderingPostProcessing.order()
        );
        assert_eq!(RenderPassEvent::Custom(525).order(), 525);
    }
}
