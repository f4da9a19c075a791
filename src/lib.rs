//! # Myth Scattering
//!
//! Atmospheric scattering (fog) as a post-process blit stage.
//!
//! The stage is a renderer feature ([`ScatteringFeature`]) that owns one pass
//! ([`ScatteringPass`]). Each frame the feature points the pass at the camera
//! color and enqueues it; the pass then records a plain or fog-shaded blit
//! into a command buffer that a render context executes.
//!
//! ```text
//! ScatteringFeature ──setup/enqueue──► PassQueue
//!                                         │ configure → execute → frame_cleanup
//!                                         ▼
//!                                   ScatteringPass ──reads──► EffectState
//!                                         │
//!                                   CommandBuffer
//!                                         ▼
//!                     SoftwareRenderContext / WgpuRenderContext
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_scattering::prelude::*;
//!
//! let material = MaterialId::next();
//! let mut ctx = SoftwareRenderContext::new(SoftwareImage::filled(640, 360, [40, 80, 120, 255]));
//! ctx.register_material(material, SoftwareMaterial::atmospheric_scattering());
//!
//! let effect = Rc::new(RefCell::new(AtmosphericScattering::new(material, ScatteringSettings::default())));
//! let shared: SharedEffect = effect.clone();
//! let mut feature = ScatteringFeature::new(FeatureSettings::default(), move || Some(shared.clone()));
//! feature.create();
//!
//! let data = RenderingData::new(CameraId(0), TextureDesc::new(640, 360, wgpu::TextureFormat::Rgba8Unorm));
//! let mut queue = PassQueue::new();
//! feature.add_render_passes(&mut queue, &data);
//! queue.render_frame(&mut ctx, &data)?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod effect;
pub mod errors;
pub mod passes;
pub mod render;
pub mod settings;

pub use backend::{SoftwareImage, SoftwareMaterial, SoftwareRenderContext, WgpuRenderContext};
pub use effect::{AtmosphericScattering, EffectRegistry, EffectSource, EffectState, SharedEffect};
pub use errors::{Result, ScatteringError};
pub use passes::{ATMOSPHERIC_FOG_SUBPASS, ScatteringFeature, ScatteringPass};
pub use settings::{FeatureSettings, ScatteringConfig, ScatteringSettings};

/// Commonly used types.
pub mod prelude {
    pub use std::cell::RefCell;
    pub use std::rc::Rc;

    pub use crate::backend::{SoftwareImage, SoftwareMaterial, SoftwareRenderContext};
    pub use crate::effect::{
        AtmosphericScattering, CameraView, EffectRegistry, EffectSource, EffectState, SharedEffect,
    };
    pub use crate::errors::{Result, ScatteringError};
    pub use crate::passes::{ATMOSPHERIC_FOG_SUBPASS, ScatteringFeature, ScatteringPass};
    pub use crate::render::{
        CameraId, CommandBuffer, CommandBufferPool, Destination, MaterialId, PassQueue,
        RenderPassEvent, RenderingData, ScriptableRenderContext, ScriptableRenderPass,
        ScriptableRenderer, ScriptableRendererFeature, TargetId, TextureDesc,
    };
    pub use crate::settings::{FeatureSettings, ScatteringConfig, ScatteringSettings};
}
