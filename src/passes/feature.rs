//! Atmospheric Scattering Renderer Feature
//!
//! Owns the [`ScatteringPass`] and plugs it into the renderer every frame.
//!
//! ```rust,ignore
//! let registry = EffectRegistry::new()
//!     .with_main_camera(camera)
//!     .with_factory(move |_| Rc::new(RefCell::new(AtmosphericScattering::new(material, settings.clone()))));
//!
//! let mut feature = ScatteringFeature::new(FeatureSettings::default(), registry);
//! feature.create();
//!
//! // every frame
//! feature.add_render_passes(&mut queue, &rendering_data);
//! queue.render_frame(&mut ctx, &rendering_data)?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use super::scattering::ScatteringPass;
use crate::effect::EffectSource;
use crate::render::{
    Destination, RenderingData, ScriptableRenderer, ScriptableRendererFeature,
};
use crate::settings::FeatureSettings;

/// Renderer feature driving one [`ScatteringPass`].
pub struct ScatteringFeature {
    settings: FeatureSettings,
    destination: Destination,
    source: Box<dyn EffectSource>,
    pass: Option<Rc<RefCell<ScatteringPass>>>,
}

impl ScatteringFeature {
    /// The effect is resolved from `source` in [`create`](ScriptableRendererFeature::create).
    #[must_use]
    pub fn new(settings: FeatureSettings, source: impl EffectSource + 'static) -> Self {
        Self {
            settings,
            destination: Destination::CameraTarget,
            source: Box::new(source),
            pass: None,
        }
    }

    /// Writes to `destination` instead of back into the camera target.
    #[must_use]
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    /// The pass built by `create`, if any.
    #[must_use]
    pub fn pass(&self) -> Option<&Rc<RefCell<ScatteringPass>>> {
        self.pass.as_ref()
    }
}

impl ScriptableRendererFeature for ScatteringFeature {
    fn name(&self) -> &str {
        "AtmosphericScatteringBlitPass"
    }

    fn create(&mut self) {
        let effect = self.source.find_or_create();
        if let Some(effect) = &effect {
            effect.borrow_mut().start();
        }
        self.pass = Some(Rc::new(RefCell::new(ScatteringPass::new(
            self.settings.pass_event,
            effect,
        ))));
    }

    fn add_render_passes(
        &mut self,
        renderer: &mut dyn ScriptableRenderer,
        _rendering_data: &RenderingData,
    ) {
        let Some(pass) = &self.pass else {
            log::warn!("{}: add_render_passes called before create", self.name());
            return;
        };

        pass.borrow_mut()
            .setup(renderer.camera_color_target(), self.destination);
        renderer.enqueue_pass(pass.clone());
    }
}
