//! Feature & Queue Tests
//!
//! Tests for:
//! - EffectRegistry lookup order and lazy creation
//! - ScatteringFeature lifecycle (create / add_render_passes)
//! - PassQueue ordering by injection point
//! - PassQueue error handling and cleanup guarantees

use std::cell::RefCell;
use std::rc::Rc;

use myth_scattering::backend::{SoftwareImage, SoftwareMaterial, SoftwareRenderContext};
use myth_scattering::effect::{AtmosphericScattering, EffectRegistry, EffectSource, SharedEffect};
use myth_scattering::errors::ScatteringError;
use myth_scattering::passes::ScatteringFeature;
use myth_scattering::render::{
    CameraId, CommandBuffer, CommandBufferPool, MaterialId, PassQueue, RenderPassEvent,
    RenderingData, ScriptableRenderContext, ScriptableRenderPass, ScriptableRenderer,
    ScriptableRendererFeature, SharedPass, TargetId, TextureDesc,
};
use myth_scattering::settings::{FeatureSettings, ScatteringSettings};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_effect() -> SharedEffect {
    Rc::new(RefCell::new(AtmosphericScattering::new(
        MaterialId::next(),
        ScatteringSettings::default(),
    )))
}

fn rendering_data() -> RenderingData {
    RenderingData::new(
        CameraId(0),
        TextureDesc::new(4, 4, wgpu::TextureFormat::Rgba8Unorm),
    )
}

/// Records its phases into a shared journal.
struct MarkerPass {
    name: String,
    event: RenderPassEvent,
    journal: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl MarkerPass {
    fn shared(
        name: &str,
        event: RenderPassEvent,
        journal: &Rc<RefCell<Vec<String>>>,
        fail: bool,
    ) -> SharedPass {
        Rc::new(RefCell::new(Self {
            name: name.to_owned(),
            event,
            journal: journal.clone(),
            fail,
        }))
    }
}

impl ScriptableRenderPass for MarkerPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_pass_event(&self) -> RenderPassEvent {
        self.event
    }

    fn execute(
        &mut self,
        _ctx: &mut dyn ScriptableRenderContext,
        _rendering_data: &RenderingData,
        pool: &mut CommandBufferPool,
    ) -> myth_scattering::Result<()> {
        let _cmd = pool.scoped("Marker");
        self.journal.borrow_mut().push(format!("execute:{}", self.name));
        if self.fail {
            return Err(ScatteringError::TargetNotFound(TargetId::CameraColor));
        }
        Ok(())
    }

    fn frame_cleanup(&mut self, _cmd: &mut CommandBuffer) {
        self.journal.borrow_mut().push(format!("cleanup:{}", self.name));
    }
}

// ============================================================================
// Effect Registry
// ============================================================================

#[test]
fn registry_prefers_main_camera() {
    let main = new_effect();
    let other = new_effect();
    let mut registry = EffectRegistry::new().with_main_camera(CameraId(7));
    registry.insert(CameraId(1), other.clone());
    registry.insert(CameraId(7), main.clone());

    let found = registry.find_or_create().unwrap();
    assert!(Rc::ptr_eq(&found, &main));
}

#[test]
fn registry_falls_back_to_lowest_camera() {
    let first = new_effect();
    let second = new_effect();
    let mut registry = EffectRegistry::new().with_main_camera(CameraId(0));
    registry.insert(CameraId(5), second);
    registry.insert(CameraId(2), first.clone());

    let found = registry.find_or_create().unwrap();
    assert!(Rc::ptr_eq(&found, &first));
}

#[test]
fn registry_creates_once_for_main_camera() {
    let created = Rc::new(RefCell::new(0u32));
    let counter = created.clone();
    let mut registry = EffectRegistry::new()
        .with_main_camera(CameraId(3))
        .with_factory(move |_camera| {
            *counter.borrow_mut() += 1;
            new_effect()
        });

    let a = registry.find_or_create().unwrap();
    let b = registry.find_or_create().unwrap();

    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(*created.borrow(), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.get(CameraId(3)).is_some());
}

#[test]
fn registry_without_camera_or_factory_finds_nothing() {
    let mut registry = EffectRegistry::new();
    assert!(registry.find_or_create().is_none());

    let mut registry = EffectRegistry::new().with_main_camera(CameraId(0));
    assert!(registry.find_or_create().is_none());
    assert!(registry.is_empty());
}

// ============================================================================
// Feature Lifecycle
// ============================================================================

#[test]
fn feature_uses_registry_effect() {
    init_logger();
    let effect = Rc::new(RefCell::new(AtmosphericScattering::new(
        MaterialId::next(),
        ScatteringSettings::default(),
    )));
    let mut registry = EffectRegistry::new().with_main_camera(CameraId(0));
    registry.insert(CameraId(0), effect.clone());

    let mut feature = ScatteringFeature::new(FeatureSettings::default(), registry);
    assert!(feature.pass().is_none());

    feature.create();
    assert!(effect.borrow().is_started());
    assert!(feature.pass().unwrap().borrow().has_effect());
    assert_eq!(feature.name(), "AtmosphericScatteringBlitPass");
}

#[test]
fn add_render_passes_before_create_enqueues_nothing() {
    init_logger();
    let mut feature =
        ScatteringFeature::new(FeatureSettings::default(), move || Some(new_effect()));
    let mut queue = PassQueue::new();

    feature.add_render_passes(&mut queue, &rendering_data());
    assert_eq!(queue.pass_count(), 0);
}

#[test]
fn feature_pass_uses_configured_event() {
    let settings = FeatureSettings {
        pass_event: RenderPassEvent::AfterRenderingTransparents,
    };
    let mut feature = ScatteringFeature::new(settings, move || Some(new_effect()));
    feature.create();

    let pass = feature.pass().unwrap();
    assert_eq!(
        pass.borrow().render_pass_event(),
        RenderPassEvent::AfterRenderingTransparents
    );
}

#[test]
fn queue_reports_camera_color_target() {
    let queue = PassQueue::new();
    assert_eq!(queue.camera_color_target(), TargetId::CameraColor);
}

// ============================================================================
// Pass Queue
// ============================================================================

#[test]
fn passes_run_in_event_order() {
    init_logger();
    let journal = Rc::new(RefCell::new(Vec::new()));
    let mut queue = PassQueue::new();
    let mut ctx = SoftwareRenderContext::new(SoftwareImage::filled(4, 4, [0, 0, 0, 255]));

    queue.enqueue_pass(MarkerPass::shared(
        "late",
        RenderPassEvent::AfterRendering,
        &journal,
        false,
    ));
    queue.enqueue_pass(MarkerPass::shared(
        "custom",
        RenderPassEvent::Custom(275),
        &journal,
        false,
    ));
    queue.enqueue_pass(MarkerPass::shared(
        "early",
        RenderPassEvent::BeforeRenderingOpaques,
        &journal,
        false,
    ));

    assert_eq!(queue.pass_names(), vec!["early", "custom", "late"]);
    queue.render_frame(&mut ctx, &rendering_data()).unwrap();

    assert_eq!(
        *journal.borrow(),
        vec![
            "execute:early",
            "execute:custom",
            "execute:late",
            "cleanup:early",
            "cleanup:custom",
            "cleanup:late",
        ]
    );
    assert_eq!(queue.pass_count(), 0);
}

#[test]
fn scattering_pass_sorts_after_opaques() {
    let journal = Rc::new(RefCell::new(Vec::new()));
    let material = MaterialId::next();
    let effect: SharedEffect = Rc::new(RefCell::new(AtmosphericScattering::new(
        material,
        ScatteringSettings::default(),
    )));
    let mut feature =
        ScatteringFeature::new(FeatureSettings::default(), move || Some(effect.clone()));
    feature.create();

    let mut queue = PassQueue::new();
    queue.enqueue_pass(MarkerPass::shared(
        "ui",
        RenderPassEvent::AfterRendering,
        &journal,
        false,
    ));
    feature.add_render_passes(&mut queue, &rendering_data());
    queue.enqueue_pass(MarkerPass::shared(
        "opaque",
        RenderPassEvent::AfterRenderingOpaques,
        &journal,
        false,
    ));

    assert_eq!(
        queue.pass_names(),
        vec!["opaque", "_AtmosphericScatteringPass", "ui"]
    );

    let mut ctx = SoftwareRenderContext::new(SoftwareImage::filled(4, 4, [9, 9, 9, 255]));
    ctx.register_material(material, SoftwareMaterial::atmospheric_scattering());
    queue.render_frame(&mut ctx, &rendering_data()).unwrap();
    assert_eq!(ctx.temporary_count(), 0);
}

#[test]
fn failed_pass_stops_execution_but_cleans_up_all() {
    init_logger();
    let journal = Rc::new(RefCell::new(Vec::new()));
    let mut queue = PassQueue::new();
    let mut ctx = SoftwareRenderContext::new(SoftwareImage::filled(4, 4, [0, 0, 0, 255]));

    queue.enqueue_pass(MarkerPass::shared(
        "broken",
        RenderPassEvent::BeforeRenderingOpaques,
        &journal,
        true,
    ));
    queue.enqueue_pass(MarkerPass::shared(
        "after",
        RenderPassEvent::AfterRendering,
        &journal,
        false,
    ));

    let result = queue.render_frame(&mut ctx, &rendering_data());
    assert!(matches!(result, Err(ScatteringError::TargetNotFound(_))));

    assert_eq!(
        *journal.borrow(),
        vec!["execute:broken", "cleanup:broken", "cleanup:after"]
    );
    assert_eq!(queue.command_pool().outstanding(), 0);
    assert_eq!(queue.pass_count(), 0);
}
