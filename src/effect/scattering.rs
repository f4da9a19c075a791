//! Atmospheric Scattering Effect
//!
//! Per-camera fog state consumed by [`ScatteringPass`](crate::passes::ScatteringPass).
//!
//! # Fog Model
//!
//! Exponential height fog evaluated per texel from linear view depth:
//!
//! ```text
//! density'  = density * exp(-height_falloff * camera_height)
//! distance  = min(depth, far_plane) - start_distance     (far_plane when depth <= 0)
//! fog       = clamp(1 - exp(-density' * distance), 0, max_opacity)
//! color_out = mix(color_in, fog_color, fog)
//! ```
//!
//! The sun glow is folded into `fog_color` on the CPU each time the camera
//! or settings change, so the shader only needs one color.

use glam::Vec3;

use super::persistent::PersistentTexture;
use super::EffectState;
use crate::render::{CommandBuffer, MaterialId, TargetId};
use crate::settings::ScatteringSettings;

/// Uniform block of the fog sub-pass. Layout matches `scattering.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScatteringUniforms {
    /// Linear RGB inscattering color; `a` is the max fog opacity.
    pub fog_color: [f32; 4],
    /// Density already scaled by the camera-height term.
    pub density: f32,
    pub start_distance: f32,
    pub far_plane: f32,
    pub _pad: f32,
}

impl Default for ScatteringUniforms {
    fn default() -> Self {
        Self::from_settings(&ScatteringSettings::default(), &CameraView::default())
    }
}

impl ScatteringUniforms {
    #[must_use]
    pub fn from_settings(settings: &ScatteringSettings, view: &CameraView) -> Self {
        let height_term = (-settings.height_falloff * view.height.max(0.0)).exp();

        let sun = Vec3::from(settings.sun_direction).normalize_or_zero();
        let forward = view.forward.normalize_or_zero();
        let glow = settings.directional_inscattering
            * forward.dot(sun).max(0.0).powf(settings.directional_exponent);

        let color = (Vec3::from(settings.inscattering_color) + Vec3::splat(glow))
            .clamp(Vec3::ZERO, Vec3::ONE);

        Self {
            fog_color: [color.x, color.y, color.z, settings.max_opacity.clamp(0.0, 1.0)],
            density: settings.density.max(0.0) * height_term,
            start_distance: settings.start_distance,
            far_plane: settings.far_plane,
            _pad: 0.0,
        }
    }

    /// Fog blend factor for a texel at linear view `depth`.
    ///
    /// `depth <= 0` means "no geometry" and is treated as the far plane.
    #[must_use]
    pub fn fog_factor(&self, depth: f32) -> f32 {
        let distance = if depth > 0.0 {
            depth.min(self.far_plane)
        } else {
            self.far_plane
        };
        let travelled = (distance - self.start_distance).max(0.0);
        let fog = 1.0 - (-self.density * travelled).exp();
        fog.clamp(0.0, self.fog_color[3])
    }

    /// Applies the fog to an RGBA8 texel. Alpha is preserved.
    #[must_use]
    pub fn apply(&self, color: [u8; 4], depth: f32) -> [u8; 4] {
        let fog = self.fog_factor(depth);
        let mut out = color;
        for (channel, fog_channel) in out.iter_mut().zip(self.fog_color).take(3) {
            let c = f32::from(*channel) / 255.0;
            let mixed = c + (fog_channel - c) * fog;
            *channel = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

/// Camera placement relevant to the fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// World-space height of the camera.
    pub height: f32,
    /// View direction.
    pub forward: Vec3,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            height: 0.0,
            forward: Vec3::NEG_Z,
        }
    }
}

/// Fog state for one camera.
#[derive(Debug)]
pub struct AtmosphericScattering {
    settings: ScatteringSettings,
    view: CameraView,
    material: MaterialId,
    persistent: PersistentTexture,

    uniforms: ScatteringUniforms,
    /// Settings or view changed since the uniforms were packed.
    dirty: bool,
    /// Packed uniforms not yet recorded for upload.
    pending_upload: bool,
    started: bool,
    frame_count: u64,
}

impl AtmosphericScattering {
    /// Creates the effect bound to `material`, which the backend must know
    /// (e.g. via `register_scattering_material`).
    #[must_use]
    pub fn new(material: MaterialId, settings: ScatteringSettings) -> Self {
        Self {
            settings,
            view: CameraView::default(),
            material,
            persistent: PersistentTexture::new(),
            uniforms: ScatteringUniforms::default(),
            dirty: true,
            pending_upload: true,
            started: false,
            frame_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ScatteringSettings {
        &self.settings
    }

    /// Mutable access; uniforms are repacked on the next frame.
    pub fn settings_mut(&mut self) -> &mut ScatteringSettings {
        self.dirty = true;
        &mut self.settings
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    pub fn set_view(&mut self, view: CameraView) {
        if self.view != view {
            self.view = view;
            self.dirty = true;
        }
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &ScatteringUniforms {
        &self.uniforms
    }

    #[inline]
    #[must_use]
    pub fn persistent_texture(&self) -> &PersistentTexture {
        &self.persistent
    }

    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Frames seen by `on_pre_frame`.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl EffectState for AtmosphericScattering {
    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.dirty = true;
        self.pending_upload = true;
        log::debug!("Atmospheric scattering started (material {:?})", self.material);
    }

    fn on_pre_frame(&mut self) {
        self.frame_count += 1;
        if self.dirty {
            self.uniforms = ScatteringUniforms::from_settings(&self.settings, &self.view);
            self.dirty = false;
            self.pending_upload = true;
        }
    }

    fn shade_state(&mut self, cmd: &mut CommandBuffer, source: TargetId) -> MaterialId {
        log::trace!("Scattering shade state for {source:?}");
        if self.pending_upload {
            cmd.set_material_uniforms(self.material, bytemuck::bytes_of(&self.uniforms));
            self.pending_upload = false;
        }
        self.material
    }

    fn fog_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn invalidate_uniforms(&mut self) {
        self.pending_upload = true;
    }

    fn persistent_texture_mut(&mut self) -> &mut PersistentTexture {
        &mut self.persistent
    }
}
