//! Effect State
//!
//! The persistent, per-camera side of a post-process effect: its enable flag,
//! its material and a render texture it owns across frames. Passes read it;
//! they never own it.
//!
//! Effects are injected into features through an [`EffectSource`] instead of
//! being looked up globally. [`EffectRegistry`] keeps exactly one effect per
//! camera and can create the main camera's effect on demand.

pub mod persistent;
pub mod scattering;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::render::{CameraId, CommandBuffer, MaterialId, TargetId};

pub use persistent::PersistentTexture;
pub use scattering::{AtmosphericScattering, CameraView, ScatteringUniforms};

/// What a scattering-style pass needs from its effect.
pub trait EffectState {
    /// One-time initialization, called when the owning feature is created.
    fn start(&mut self) {}

    /// Called every frame after the persistent texture is up to date.
    fn on_pre_frame(&mut self);

    /// Returns the material used for shaded blits. May record per-frame
    /// parameter uploads into `cmd`.
    fn shade_state(&mut self, cmd: &mut CommandBuffer, source: TargetId) -> MaterialId;

    fn fog_enabled(&self) -> bool;

    /// Forces parameters to be recorded again by the next `shade_state`,
    /// e.g. after a submission carrying them failed.
    fn invalidate_uniforms(&mut self) {}

    fn persistent_texture_mut(&mut self) -> &mut PersistentTexture;
}

/// Effect shared between a feature, its pass and the application.
pub type SharedEffect = Rc<RefCell<dyn EffectState>>;

/// Finds or lazily builds the effect a feature should drive.
pub trait EffectSource {
    fn find_or_create(&mut self) -> Option<SharedEffect>;
}

impl<F> EffectSource for F
where
    F: FnMut() -> Option<SharedEffect>,
{
    fn find_or_create(&mut self) -> Option<SharedEffect> {
        self()
    }
}

/// Factory used by [`EffectRegistry`] to build an effect for a camera.
pub type EffectFactory = Box<dyn FnMut(CameraId) -> SharedEffect>;

/// One effect per camera.
///
/// Lookup order for [`find_or_create`](EffectSource::find_or_create):
/// 1. the main camera's effect,
/// 2. any registered effect (lowest camera id first),
/// 3. a new effect for the main camera, built by the factory.
#[derive(Default)]
pub struct EffectRegistry {
    effects: FxHashMap<CameraId, SharedEffect>,
    main_camera: Option<CameraId>,
    factory: Option<EffectFactory>,
}

impl EffectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_main_camera(mut self, camera: CameraId) -> Self {
        self.main_camera = Some(camera);
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: impl FnMut(CameraId) -> SharedEffect + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Registers `effect` for `camera`, replacing any previous one.
    pub fn insert(&mut self, camera: CameraId, effect: SharedEffect) -> Option<SharedEffect> {
        self.effects.insert(camera, effect)
    }

    #[must_use]
    pub fn get(&self, camera: CameraId) -> Option<&SharedEffect> {
        self.effects.get(&camera)
    }

    pub fn remove(&mut self, camera: CameraId) -> Option<SharedEffect> {
        self.effects.remove(&camera)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl EffectSource for EffectRegistry {
    fn find_or_create(&mut self) -> Option<SharedEffect> {
        if let Some(effect) = self.main_camera.and_then(|camera| self.effects.get(&camera)) {
            return Some(effect.clone());
        }

        if let Some((_, effect)) = self.effects.iter().min_by_key(|(camera, _)| **camera) {
            return Some(effect.clone());
        }

        let camera = self.main_camera?;
        let factory = self.factory.as_mut()?;
        let effect = factory(camera);
        log::debug!("Created scattering effect for camera {camera:?}");
        self.effects.insert(camera, effect.clone());
        Some(effect)
    }
}
