//! Render passes and the features that enqueue them.

pub mod feature;
pub mod scattering;

pub use feature::ScatteringFeature;
pub use scattering::{ATMOSPHERIC_FOG_SUBPASS, ScatteringPass};
