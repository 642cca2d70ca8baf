//! Shared renderer state that used to be process-wide.
//!
//! A [`RenderContext`] is created once and passed to everything that needs the
//! blend-mode table, the current device or device-loss notifications.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::blend::{BlendFactors, BlendMode, BlendModeRegistry};
use super::gpu_context::GpuContext;
use crate::config::RenderConfig;
use crate::error::Result;

/// Something that owns GPU objects and has to rebuild them after the device
/// was lost.
pub trait GpuResource {
    fn on_device_lost(&self);
    fn on_device_restored(&self, gpu: &GpuContext);
}

pub struct RenderContext {
    config: RenderConfig,
    blend_modes: RefCell<BlendModeRegistry>,
    resources: RefCell<Vec<Weak<dyn GpuResource>>>,
    gpu: RefCell<Option<Rc<GpuContext>>>,
    /// Bumped whenever a new device is installed; buffers created for an
    /// older generation are stale.
    generation: Cell<u64>,
}

impl RenderContext {
    /// A context without a device. Useful for building scenes and for
    /// rendering into a recording target.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            blend_modes: RefCell::new(BlendModeRegistry::default()),
            resources: RefCell::new(Vec::new()),
            gpu: RefCell::new(None),
            generation: Cell::new(0),
        }
    }

    pub fn with_gpu(config: RenderConfig, gpu: Rc<GpuContext>) -> Self {
        let context = Self::new(config);
        *context.gpu.borrow_mut() = Some(gpu);
        context
    }

    /// Create a context together with a headless device.
    pub fn headless(config: RenderConfig) -> Result<Self> {
        let gpu = GpuContext::headless(&config)?;
        Ok(Self::with_gpu(config, Rc::new(gpu)))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn gpu(&self) -> Option<Rc<GpuContext>> {
        self.gpu.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn register_blend_mode(
        &self,
        mode: BlendMode,
        straight: BlendFactors,
        premultiplied: BlendFactors,
    ) {
        self.blend_modes
            .borrow_mut()
            .register(mode, straight, premultiplied);
    }

    pub fn blend_factors(
        &self,
        mode: BlendMode,
        premultiplied_alpha: bool,
    ) -> Result<BlendFactors> {
        self.blend_modes.borrow().factors(mode, premultiplied_alpha)
    }

    /// Subscribe a resource to device notifications. Dropping the resource
    /// unsubscribes it.
    pub fn register_resource(&self, resource: Weak<dyn GpuResource>) {
        self.resources.borrow_mut().push(resource);
    }

    /// Number of subscribed resources that are still alive.
    pub fn resource_count(&self) -> usize {
        self.resources
            .borrow()
            .iter()
            .filter(|resource| resource.strong_count() > 0)
            .count()
    }

    /// Drop the current device and tell every resource to forget its GPU objects.
    pub fn device_lost(&self) {
        log::warn!("GPU device lost");
        self.gpu.borrow_mut().take();
        for resource in self.live_resources() {
            resource.on_device_lost();
        }
    }

    /// Install a new device and let every resource rebuild on it.
    pub fn device_restored(&self, gpu: Rc<GpuContext>) {
        self.generation.set(self.generation.get() + 1);
        *self.gpu.borrow_mut() = Some(gpu.clone());

        let resources = self.live_resources();
        log::info!("GPU device restored, rebuilding {} resources", resources.len());
        for resource in resources {
            resource.on_device_restored(&gpu);
        }
    }

    /// Upgrade live subscribers and prune dead ones. The registry is not
    /// borrowed while callbacks run, so they may register new resources.
    fn live_resources(&self) -> Vec<Rc<dyn GpuResource>> {
        let mut resources = self.resources.borrow_mut();
        resources.retain(|resource| resource.strong_count() > 0);
        resources.iter().filter_map(Weak::upgrade).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct LossCounter {
        lost: Cell<u32>,
    }

    impl GpuResource for LossCounter {
        fn on_device_lost(&self) {
            self.lost.set(self.lost.get() + 1);
        }

        fn on_device_restored(&self, _gpu: &GpuContext) {}
    }

    #[test]
    fn test_device_lost_notifies_live_resources() {
        let context = RenderContext::new(RenderConfig::default());
        let kept = Rc::new(LossCounter::default());
        let dropped = Rc::new(LossCounter::default());
        context.register_resource(Rc::downgrade(&kept) as Weak<dyn GpuResource>);
        context.register_resource(Rc::downgrade(&dropped) as Weak<dyn GpuResource>);
        assert_eq!(context.resource_count(), 2);

        drop(dropped);
        context.device_lost();

        assert_eq!(kept.lost.get(), 1);
        assert_eq!(context.resource_count(), 1);
        assert_eq!(context.resources.borrow().len(), 1);
        assert!(context.gpu().is_none());
    }

    #[test]
    fn test_custom_blend_mode_registration() {
        use super::super::blend::BlendFactor;

        let context = RenderContext::new(RenderConfig::default());
        let glow = BlendMode::custom("glow");
        assert!(context.blend_factors(glow, true).is_err());

        let factors = BlendFactors::new(BlendFactor::One, BlendFactor::One);
        context.register_blend_mode(glow, factors, factors);
        assert_eq!(context.blend_factors(glow, false).unwrap(), factors);
    }
}
