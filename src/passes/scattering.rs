//! Atmospheric Scattering Blit Pass
//!
//! Applies the fog sub-pass of the scattering material to the camera color.
//!
//! # Data Flow
//!
//! ```text
//! Camera target (terminal):
//!   fog off:  Source ──copy──► _TemporaryColorTexture
//!   fog on:   Source ──fog(3)──► _TemporaryColorTexture ──copy──► Source
//!
//! Named target (intermediate):
//!   fog off:  Source ──copy──► Target
//!   fog on:   Source ──fog(3)──► Target
//! ```
//!
//! Writing back to the camera color goes through a temporary because most
//! backends cannot sample and render the same texture in one draw. The
//! temporary is allocated by a separate submission in `execute` and released
//! in `frame_cleanup`, once. A failed allocation leaves nothing to release.
//! Each pass instance owns a distinct temporary id, so several passes can
//! target one camera in the same frame.
//!
//! When the blit submission fails, the effect's uniforms are invalidated and
//! uploaded again on the next frame.
//!
//! # Missing Effect
//!
//! Without an effect the pass logs at construction and every phase becomes a
//! no-op.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::effect::SharedEffect;
use crate::errors::{Result, ScatteringError};
use crate::render::{
    CommandBuffer, CommandBufferPool, Destination, FilterMode, RenderPassEvent, RenderingData,
    ScriptableRenderContext, ScriptableRenderPass, TargetId, TemporaryLease, TemporaryTargetId,
    TextureDesc,
};

/// Sub-pass index of the fog technique in the scattering material.
pub const ATMOSPHERIC_FOG_SUBPASS: u32 = 3;

const PASS_NAME: &str = "_AtmosphericScatteringPass";
const ALLOCATE_NAME: &str = "_AtmosphericScatteringPass.Allocate";
const TEMPORARY_COLOR_TEXTURE: &str = "_TemporaryColorTexture";

/// Distinguishes the temporaries of several passes queued for one camera.
static NEXT_INSTANCE: AtomicU32 = AtomicU32::new(0);

#[derive(Clone, Copy, Debug)]
struct FrameTargets {
    source: TargetId,
    destination: Destination,
}

/// Fog blit pass.
pub struct ScatteringPass {
    event: RenderPassEvent,
    effect: Option<SharedEffect>,
    temporary_color: TemporaryTargetId,

    // === Per-frame state ===
    /// Set by `setup`, consumed by `execute`.
    targets: Option<FrameTargets>,
    configured: bool,
    /// Live only between `execute` and `frame_cleanup` of a camera-target frame.
    lease: Option<TemporaryLease>,
}

impl ScatteringPass {
    #[must_use]
    pub fn new(event: RenderPassEvent, effect: Option<SharedEffect>) -> Self {
        if effect.is_none() {
            log::warn!("No atmospheric scattering effect; {PASS_NAME} will not render");
        }
        Self {
            event,
            effect,
            temporary_color: TemporaryTargetId::from_name_instance(
                TEMPORARY_COLOR_TEXTURE,
                NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            ),
            targets: None,
            configured: false,
            lease: None,
        }
    }

    /// Records the source and destination for the current frame.
    pub fn setup(&mut self, source: TargetId, destination: Destination) {
        self.targets = Some(FrameTargets {
            source,
            destination,
        });
    }

    #[inline]
    #[must_use]
    pub fn has_effect(&self) -> bool {
        self.effect.is_some()
    }

    /// Whether a temporary target is leased and awaiting cleanup.
    #[inline]
    #[must_use]
    pub fn holds_temporary(&self) -> bool {
        self.lease.is_some()
    }

    /// Id of the temporary used for camera-target frames.
    #[inline]
    #[must_use]
    pub fn temporary_color_id(&self) -> TemporaryTargetId {
        self.temporary_color
    }

    /// Records and submits the `GetTemporary` on its own, so the lease only
    /// exists once the backend actually holds the target.
    fn allocate_temporary(
        &mut self,
        ctx: &mut dyn ScriptableRenderContext,
        pool: &mut CommandBufferPool,
        desc: TextureDesc,
    ) -> Result<TargetId> {
        let mut alloc = pool.scoped(ALLOCATE_NAME);
        let lease = TemporaryLease::acquire(&mut alloc, self.temporary_color, desc, FilterMode::Point);
        ctx.execute_command_buffer(&alloc)?;

        let temporary = lease.identifier();
        self.lease = Some(lease);
        Ok(temporary)
    }

    /// Descriptor of the temporary: the camera target without depth.
    #[inline]
    #[must_use]
    pub fn working_descriptor(camera_descriptor: &TextureDesc) -> TextureDesc {
        camera_descriptor.without_depth()
    }
}

impl ScriptableRenderPass for ScatteringPass {
    fn name(&self) -> &str {
        PASS_NAME
    }

    fn render_pass_event(&self) -> RenderPassEvent {
        self.event
    }

    fn configure(&mut self, cmd: &mut CommandBuffer, camera_descriptor: &TextureDesc) {
        let Some(effect) = &self.effect else {
            return;
        };

        let mut effect = effect.borrow_mut();
        effect
            .persistent_texture_mut()
            .ensure(cmd, camera_descriptor);
        effect.on_pre_frame();
        self.configured = true;
    }

    fn execute(
        &mut self,
        ctx: &mut dyn ScriptableRenderContext,
        rendering_data: &RenderingData,
        pool: &mut CommandBufferPool,
    ) -> Result<()> {
        let Some(effect) = self.effect.clone() else {
            return Ok(());
        };

        let FrameTargets {
            source,
            destination,
        } = self
            .targets
            .take()
            .ok_or(ScatteringError::PassNotSetUp { pass: PASS_NAME })?;
        if !self.configured {
            return Err(ScatteringError::PassNotConfigured { pass: PASS_NAME });
        }
        if self.lease.is_some() {
            // Previous frame never reached frame_cleanup.
            return Err(ScatteringError::TemporaryTargetInUse(self.temporary_color));
        }

        let working = Self::working_descriptor(&rendering_data.camera.target_descriptor);
        let output = match destination {
            Destination::CameraTarget => self.allocate_temporary(ctx, pool, working)?,
            Destination::Target(handle) => handle.identifier(),
        };

        let mut cmd = pool.scoped(PASS_NAME);

        let (material, fog_enabled) = {
            let mut effect = effect.borrow_mut();
            (effect.shade_state(&mut cmd, source), effect.fog_enabled())
        };

        if fog_enabled {
            cmd.blit_with_material(source, output, material, ATMOSPHERIC_FOG_SUBPASS);
            if destination == Destination::CameraTarget {
                cmd.blit(output, source);
            }
        } else {
            cmd.blit(source, output);
        }

        let result = ctx.execute_command_buffer(&cmd);
        if let Err(e) = &result {
            log::debug!("{PASS_NAME}: submission failed ({e}); uniforms will be uploaded again");
            effect.borrow_mut().invalidate_uniforms();
        }
        result
    }

    fn frame_cleanup(&mut self, cmd: &mut CommandBuffer) {
        if let Some(lease) = self.lease.take() {
            lease.release(cmd);
        }
        self.configured = false;
        self.targets = None;
    }
}
