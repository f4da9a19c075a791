//! Scattering Configuration
//!
//! Pure data structures describing the fog look and where the pass is
//! injected. Both load from JSON so they can live next to other scene assets.
//!
//! # Example
//!
//! ```json
//! {
//!     "feature": { "pass_event": "AfterRenderingSkybox" },
//!     "scattering": {
//!         "enabled": true,
//!         "density": 0.015,
//!         "inscattering_color": [0.45, 0.64, 1.0]
//!     }
//! }
//! ```
//!
//! Missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::render::RenderPassEvent;

/// Atmospheric fog parameters.
///
/// | Field                      | Description                                 | Default           |
/// |----------------------------|---------------------------------------------|-------------------|
/// | `enabled`                  | Apply the fog sub-pass (else plain copy)    | `true`            |
/// | `density`                  | Extinction per world unit                   | `0.02`            |
/// | `height_falloff`           | Density decay with camera height            | `0.2`             |
/// | `start_distance`           | Distance before fog starts accumulating     | `0.0`             |
/// | `max_opacity`              | Upper bound of the fog blend factor         | `1.0`             |
/// | `inscattering_color`       | Linear RGB fog color                        | `[0.447, 0.639, 1.0]` |
/// | `directional_inscattering` | Extra sun-colored glow toward the sun       | `0.5`             |
/// | `directional_exponent`     | Tightness of the sun glow                   | `4.0`             |
/// | `sun_direction`            | Direction toward the sun (normalized later) | `[0.0, 1.0, 0.0]` |
/// | `far_plane`                | Distance used for texels without depth      | `1000.0`          |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatteringSettings {
    pub enabled: bool,
    pub density: f32,
    pub height_falloff: f32,
    pub start_distance: f32,
    pub max_opacity: f32,
    pub inscattering_color: [f32; 3],
    pub directional_inscattering: f32,
    pub directional_exponent: f32,
    pub sun_direction: [f32; 3],
    pub far_plane: f32,
}

impl Default for ScatteringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            density: 0.02,
            height_falloff: 0.2,
            start_distance: 0.0,
            max_opacity: 1.0,
            inscattering_color: [0.447, 0.639, 1.0],
            directional_inscattering: 0.5,
            directional_exponent: 4.0,
            sun_direction: [0.0, 1.0, 0.0],
            far_plane: 1000.0,
        }
    }
}

/// Renderer feature configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Injection point of the scattering pass.
    pub pass_event: RenderPassEvent,
}

/// Combined configuration file layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatteringConfig {
    pub feature: FeatureSettings,
    pub scattering: ScatteringSettings,
}

impl ScatteringConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading scattering config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
