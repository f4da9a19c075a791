//! Renderer & Pass Queue
//!
//! [`ScriptableRenderer`] is what renderer features see: the camera color
//! target and a queue to push passes into. [`PassQueue`] is a minimal
//! implementation that drives the queued passes for one frame.
//!
//! # Frame Model
//!
//! - Passes run ordered by [`RenderPassEvent`](super::RenderPassEvent);
//!   ties keep enqueue order.
//! - Each pass is configured right before it executes.
//! - Once execution stops (all passes done, or one failed), every queued pass
//!   gets `frame_cleanup`, then the queue is cleared for the next frame.

use super::command::CommandBufferPool;
use super::context::ScriptableRenderContext;
use super::pass::{RenderingData, SharedPass};
use super::target::TargetId;
use crate::errors::Result;

/// The renderer surface exposed to features.
pub trait ScriptableRenderer {
    /// The camera's current color target.
    fn camera_color_target(&self) -> TargetId;

    /// Queues a pass for the current frame.
    fn enqueue_pass(&mut self, pass: SharedPass);
}

/// A pluggable feature that contributes passes to the renderer.
pub trait ScriptableRendererFeature {
    fn name(&self) -> &str;

    /// One-time construction of the feature's passes.
    fn create(&mut self);

    /// Called once per camera per frame to enqueue passes.
    fn add_render_passes(
        &mut self,
        renderer: &mut dyn ScriptableRenderer,
        rendering_data: &RenderingData,
    );
}

/// Linear pass queue for a single camera.
pub struct PassQueue {
    camera_color: TargetId,
    passes: Vec<SharedPass>,
    pool: CommandBufferPool,
}

impl Default for PassQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PassQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            camera_color: TargetId::CameraColor,
            passes: Vec::new(),
            pool: CommandBufferPool::new(),
        }
    }

    /// Overrides the target reported as the camera color.
    #[must_use]
    pub fn with_camera_color(mut self, target: TargetId) -> Self {
        self.camera_color = target;
        self
    }

    /// Adds every feature's passes for this frame.
    pub fn add_features(
        &mut self,
        features: &mut [Box<dyn ScriptableRendererFeature>],
        rendering_data: &RenderingData,
    ) {
        for feature in features.iter_mut() {
            feature.add_render_passes(self, rendering_data);
        }
    }

    /// Runs all queued passes for one frame, then clears the queue.
    ///
    /// Returns the first execution error. Passes after a failed one are not
    /// executed, but all passes are cleaned up.
    pub fn render_frame(
        &mut self,
        ctx: &mut dyn ScriptableRenderContext,
        rendering_data: &RenderingData,
    ) -> Result<()> {
        self.passes
            .sort_by_key(|pass| pass.borrow().render_pass_event().order());

        let mut result = Ok(());
        for pass in &self.passes {
            let mut pass = pass.borrow_mut();
            log::trace!("Executing pass {}", pass.name());

            {
                let mut cmd = self.pool.scoped("Configure");
                pass.configure(&mut cmd, &rendering_data.camera.target_descriptor);
                if !cmd.is_empty() {
                    result = ctx.execute_command_buffer(&cmd);
                }
            }
            if result.is_ok() {
                result = pass.execute(ctx, rendering_data, &mut self.pool);
            }
            if let Err(e) = &result {
                log::error!("Pass {} failed: {e}", pass.name());
                break;
            }
        }

        for pass in self.passes.drain(..) {
            let mut pass = pass.borrow_mut();
            let mut cmd = self.pool.scoped("FrameCleanup");
            pass.frame_cleanup(&mut cmd);
            if !cmd.is_empty() {
                let cleanup = ctx.execute_command_buffer(&cmd);
                if result.is_ok() {
                    result = cleanup;
                }
            }
        }

        result
    }

    #[inline]
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Names of the queued passes in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<String> {
        let mut passes: Vec<_> = self.passes.iter().map(|p| p.borrow()).collect();
        passes.sort_by_key(|p| p.render_pass_event().order());
        passes.iter().map(|p| p.name().to_owned()).collect()
    }

    #[inline]
    #[must_use]
    pub fn command_pool(&self) -> &CommandBufferPool {
        &self.pool
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

impl ScriptableRenderer for PassQueue {
    fn camera_color_target(&self) -> TargetId {
        self.camera_color
    }

    fn enqueue_pass(&mut self, pass: SharedPass) {
        self.passes.push(pass);
    }
}
