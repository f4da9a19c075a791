//! Settings Tests
//!
//! Tests for:
//! - JSON defaults and partial overrides
//! - Config file loading
//! - Uniform packing from settings

use anyhow::Result;

use myth_scattering::effect::{CameraView, ScatteringUniforms};
use myth_scattering::render::RenderPassEvent;
use myth_scattering::settings::{ScatteringConfig, ScatteringSettings};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn empty_json_uses_defaults() -> Result<()> {
    let config = ScatteringConfig::from_json_str("{}")?;
    assert_eq!(config, ScatteringConfig::default());
    assert!(config.scattering.enabled);
    assert_eq!(
        config.feature.pass_event,
        RenderPassEvent::BeforeRenderingPostProcessing
    );
    Ok(())
}

#[test]
fn partial_json_overrides_only_named_fields() -> Result<()> {
    let json = r#"{
        "feature": { "pass_event": "AfterRenderingSkybox" },
        "scattering": { "enabled": false, "density": 0.5 }
    }"#;
    let config = ScatteringConfig::from_json_str(json)?;

    assert_eq!(config.feature.pass_event, RenderPassEvent::AfterRenderingSkybox);
    assert!(!config.scattering.enabled);
    assert!(approx(config.scattering.density, 0.5));
    assert!(approx(
        config.scattering.far_plane,
        ScatteringSettings::default().far_plane
    ));
    Ok(())
}

#[test]
fn custom_event_parses() -> Result<()> {
    let config = ScatteringConfig::from_json_str(r#"{ "feature": { "pass_event": { "Custom": 420 } } }"#)?;
    assert_eq!(config.feature.pass_event, RenderPassEvent::Custom(420));
    assert_eq!(config.feature.pass_event.order(), 420);
    Ok(())
}

#[test]
fn config_survives_a_file_round_trip() -> Result<()> {
    let mut config = ScatteringConfig::default();
    config.scattering.start_distance = 12.5;
    config.scattering.max_opacity = 0.75;

    let path = std::env::temp_dir().join(format!("myth_scattering_{}.json", std::process::id()));
    std::fs::write(&path, config.to_json_string()?)?;
    let loaded = ScatteringConfig::load(&path);
    std::fs::remove_file(&path)?;

    assert_eq!(loaded?, config);
    Ok(())
}

#[test]
fn malformed_json_is_an_error() {
    assert!(ScatteringConfig::from_json_str("{ \"scattering\": 3 }").is_err());
    assert!(ScatteringConfig::load("/nonexistent/myth_scattering.json").is_err());
}

// ============================================================================
// Uniform Packing
// ============================================================================

#[test]
fn max_opacity_lands_in_fog_alpha() {
    let settings = ScatteringSettings {
        max_opacity: 0.4,
        ..Default::default()
    };
    let uniforms = ScatteringUniforms::from_settings(&settings, &CameraView::default());
    assert!(approx(uniforms.fog_color[3], 0.4));
    assert!(uniforms.fog_factor(0.0) <= 0.4 + 1e-6);
}

#[test]
fn higher_camera_thins_the_fog() {
    let settings = ScatteringSettings::default();
    let ground = ScatteringUniforms::from_settings(&settings, &CameraView::default());
    let raised = ScatteringUniforms::from_settings(
        &settings,
        &CameraView {
            height: 10.0,
            ..Default::default()
        },
    );
    assert!(raised.density < ground.density);
    assert!(raised.fog_factor(50.0) < ground.fog_factor(50.0));
}

#[test]
fn fog_starts_after_start_distance() {
    let settings = ScatteringSettings {
        start_distance: 20.0,
        ..Default::default()
    };
    let uniforms = ScatteringUniforms::from_settings(&settings, &CameraView::default());
    assert!(approx(uniforms.fog_factor(5.0), 0.0));
    assert!(approx(uniforms.fog_factor(20.0), 0.0));
    assert!(uniforms.fog_factor(40.0) > 0.0);
}
