//! Volume Overlay
//!
//! - [`VolumeRenderer`]: the render-thread side. Owns the registry, the pass
//!   scheduler, the host services and the overlay hook.
//! - [`OverlayHook`]: registration with the host's overlay extension point.
//! - [`VolumeOverlay`]: the any-thread facade. Every call becomes one command
//!   on the render queue.
//!
//! # Hook lifecycle
//!
//! ```text
//!                 init()                      release()
//! Uninitialized ─────────▶ Initializing ─┬─▶ Active ─────────▶ Releasing ─▶ Uninitialized
//!       ▲                                │
//!       └──── renderer module missing ◀──┘
//! ```
//!
//! `init()` on an active hook re-checks the cube buffers and keeps the
//! existing delegate handle. `release()` on an uninitialized hook does nothing.

use std::sync::Arc;

use crate::geometry::UnitCubeBuffers;
use crate::host::{
    BufferId, Compositor, Denoiser, ModuleLookup, OverlayDelegateHandle, PostOpaqueParams,
    RenderDevice,
};
use crate::proxy::{ProxyId, RenderConfig, VolumeParams, VolumeProxy};
use crate::registry::ProxyRegistry;
use crate::render_thread::{RenderCommandQueue, is_in_rendering_thread};
use crate::scheduler::{FrameResources, FrameStats, PassScheduler};
use crate::settings::{DenoiserMethod, OverlaySettings, Tunables};

// ============================================================================
// OverlayHook
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookState {
    #[default]
    Uninitialized,
    Initializing,
    Active,
    Releasing,
}

#[derive(Debug, Default)]
pub struct OverlayHook {
    state: HookState,
    delegate: Option<OverlayDelegateHandle>,
    cube: UnitCubeBuffers,
}

impl OverlayHook {
    #[inline]
    #[must_use]
    pub fn state(&self) -> HookState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == HookState::Active
    }

    #[inline]
    #[must_use]
    pub fn delegate(&self) -> Option<OverlayDelegateHandle> {
        self.delegate
    }

    #[inline]
    #[must_use]
    pub fn cube_buffers(&self) -> Option<(BufferId, BufferId)> {
        self.cube.handles()
    }

    pub fn init(&mut self, device: &mut dyn RenderDevice, modules: &dyn ModuleLookup) {
        debug_assert!(is_in_rendering_thread(), "OverlayHook::init outside the rendering thread");

        self.state = HookState::Initializing;
        self.cube.ensure(device);
        self.init_delegate(modules);

        self.state = if self.delegate.is_some() {
            HookState::Active
        } else {
            HookState::Uninitialized
        };
    }

    pub fn release(&mut self, modules: &dyn ModuleLookup) {
        debug_assert!(is_in_rendering_thread(), "OverlayHook::release outside the rendering thread");

        if self.state == HookState::Uninitialized && self.delegate.is_none() {
            return;
        }

        self.state = HookState::Releasing;
        if let Some(handle) = self.delegate.take() {
            if let Some(module) = modules.renderer_module() {
                module.remove_overlay_render_delegate(handle);
                log::debug!("Volume overlay delegate {} removed", handle.raw());
            }
        }
        self.state = HookState::Uninitialized;
    }

    fn init_delegate(&mut self, modules: &dyn ModuleLookup) {
        if self.delegate.is_some() {
            return;
        }

        match modules.renderer_module() {
            Some(module) => {
                let handle = module.register_overlay_render_delegate();
                log::debug!("Volume overlay delegate {} registered", handle.raw());
                self.delegate = Some(handle);
            }
            None => {
                log::debug!("Renderer module unavailable, volume overlay inactive");
            }
        }
    }
}

// ============================================================================
// VolumeRenderer
// ============================================================================

/// Host services handed to the renderer at creation.
pub struct VolumeRendererDesc {
    pub device: Box<dyn RenderDevice>,
    pub denoiser: Box<dyn Denoiser>,
    pub compositor: Box<dyn Compositor>,
    pub modules: Arc<dyn ModuleLookup>,
    pub settings: OverlaySettings,
}

/// Samples/depth forced onto every proxy by the control layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RenderOverrides {
    samples_per_pixel: Option<u32>,
    max_ray_depth: Option<u32>,
}

impl RenderOverrides {
    fn apply(self, render: &mut RenderConfig) {
        if let Some(spp) = self.samples_per_pixel {
            render.samples_per_pixel = spp;
        }
        if let Some(depth) = self.max_ray_depth {
            render.max_ray_depth = depth;
        }
    }
}

/// Render-thread owner of all overlay state.
pub struct VolumeRenderer {
    device: Box<dyn RenderDevice>,
    denoiser: Box<dyn Denoiser>,
    compositor: Box<dyn Compositor>,
    modules: Arc<dyn ModuleLookup>,
    tunables: Arc<Tunables>,

    registry: ProxyRegistry,
    scheduler: PassScheduler,
    hook: OverlayHook,

    overrides: RenderOverrides,
    denoiser_method: DenoiserMethod,
}

impl VolumeRenderer {
    #[must_use]
    pub fn new(desc: VolumeRendererDesc) -> Self {
        let tunables = Arc::new(Tunables::from_settings(&desc.settings));
        Self {
            device: desc.device,
            denoiser: desc.denoiser,
            compositor: desc.compositor,
            modules: desc.modules,
            tunables,
            registry: ProxyRegistry::new(),
            scheduler: PassScheduler::new(),
            hook: OverlayHook::default(),
            overrides: RenderOverrides {
                samples_per_pixel: desc.settings.samples_per_pixel.map(|v| v.max(1)),
                max_ray_depth: desc.settings.max_ray_depth.map(|v| v.max(1)),
            },
            denoiser_method: desc.settings.denoiser_method,
        }
    }

    /// Shared runtime tunables (console variables).
    #[must_use]
    pub fn tunables(&self) -> Arc<Tunables> {
        Arc::clone(&self.tunables)
    }

    // === Lifecycle ===

    pub fn init_rendering(&mut self) {
        self.hook.init(self.device.as_mut(), self.modules.as_ref());
    }

    pub fn release_rendering(&mut self) {
        self.hook.release(self.modules.as_ref());
    }

    #[inline]
    #[must_use]
    pub fn hook(&self) -> &OverlayHook {
        &self.hook
    }

    // === Proxies ===

    pub fn add_proxy(&mut self, mut proxy: VolumeProxy) {
        debug_assert!(is_in_rendering_thread());
        self.overrides.apply(proxy.render_config_mut());
        self.registry.add(proxy);
    }

    pub fn remove_proxy(&mut self, id: ProxyId) {
        debug_assert!(is_in_rendering_thread());
        if !self.registry.remove_and_release(id, self.device.as_mut()) {
            log::trace!("Volume proxy {id:?} already removed");
        }
    }

    pub fn update_transform(&mut self, id: ProxyId, local_to_world: glam::Mat4) {
        let Some(proxy) = self.registry.get_mut(id) else {
            return;
        };
        if let Err(err) = proxy.set_local_to_world(local_to_world) {
            log::warn!("Volume proxy {id:?}: {err}");
        }
    }

    pub fn update_params(&mut self, id: ProxyId, mut params: VolumeParams) {
        let Some(proxy) = self.registry.get_mut(id) else {
            return;
        };
        self.overrides.apply(&mut params.render);
        if let Err(err) = proxy.set_params(params) {
            log::warn!("Volume proxy {id:?}: {err}");
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ProxyRegistry {
        &self.registry
    }

    /// Host access for the visibility pass.
    #[inline]
    pub fn registry_mut(&mut self) -> &mut ProxyRegistry {
        &mut self.registry
    }

    // === Control ===

    pub fn set_samples_per_pixel(&mut self, samples: u32) {
        self.overrides.samples_per_pixel = Some(samples.max(1));
        self.apply_overrides();
    }

    pub fn set_max_ray_depth(&mut self, depth: u32) {
        self.overrides.max_ray_depth = Some(depth.max(1));
        self.apply_overrides();
    }

    pub fn set_denoiser_method(&mut self, method: DenoiserMethod) {
        self.denoiser_method = method;
    }

    #[inline]
    #[must_use]
    pub fn denoiser_method(&self) -> DenoiserMethod {
        self.denoiser_method
    }

    fn apply_overrides(&mut self) {
        let overrides = self.overrides;
        for proxy in self.registry.iter_mut() {
            overrides.apply(proxy.render_config_mut());
        }
    }

    // === Frame ===

    /// Clears per-frame visibility. Runs before the host's visibility pass.
    pub fn pre_render_view_family(&mut self) {
        self.registry.reset_visibility();
    }

    /// The overlay callback. Records nothing unless the hook is active.
    pub fn render_post_opaque(&mut self, params: PostOpaqueParams<'_>) -> FrameStats {
        debug_assert!(is_in_rendering_thread());

        if !self.hook.is_active() {
            return FrameStats::default();
        }
        let Some(cube) = self.hook.cube_buffers() else {
            return FrameStats::default();
        };

        let resources = FrameResources {
            registry: &mut self.registry,
            device: self.device.as_mut(),
            denoiser: self.denoiser.as_mut(),
            compositor: self.compositor.as_mut(),
            cube,
            max_spp_override: self.tunables.max_samples_per_pixel(),
            denoiser_method: self.denoiser_method,
        };

        self.scheduler.render_frame(resources, params)
    }

    #[inline]
    #[must_use]
    pub fn frames_recorded(&self) -> u64 {
        self.scheduler.frames_recorded()
    }
}

// ============================================================================
// VolumeOverlay
// ============================================================================

/// Any-thread handle to a [`VolumeRenderer`].
///
/// Every method enqueues one render command and returns immediately. Changes
/// apply to frames submitted afterwards; frames already queued are unaffected.
#[derive(Clone)]
pub struct VolumeOverlay {
    queue: RenderCommandQueue,
    tunables: Arc<Tunables>,
}

impl VolumeOverlay {
    #[must_use]
    pub fn new(queue: RenderCommandQueue, tunables: Arc<Tunables>) -> Self {
        Self { queue, tunables }
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &RenderCommandQueue {
        &self.queue
    }

    #[inline]
    #[must_use]
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    fn submit<F>(&self, name: &'static str, command: F)
    where
        F: FnOnce(&mut VolumeRenderer) + Send + 'static,
    {
        if let Err(err) = self.queue.enqueue(name, command) {
            log::warn!("{name} dropped: {err}");
        }
    }

    /// Registers the overlay callback with the host renderer.
    pub fn init(&self) {
        self.submit("InitVdbRendering", VolumeRenderer::init_rendering);
    }

    /// Unregisters the overlay callback. Ordered after every frame already queued.
    pub fn release(&self) {
        self.submit("ReleaseVdbRendering", VolumeRenderer::release_rendering);
    }

    pub fn add_proxy(&self, proxy: VolumeProxy) {
        self.submit("AddVdbProxy", move |r| r.add_proxy(proxy));
    }

    pub fn remove_proxy(&self, id: ProxyId) {
        self.submit("RemoveVdbProxy", move |r| r.remove_proxy(id));
    }

    pub fn update_transform(&self, id: ProxyId, local_to_world: glam::Mat4) {
        self.submit("UpdateVdbTransform", move |r| r.update_transform(id, local_to_world));
    }

    pub fn update_params(&self, id: ProxyId, params: VolumeParams) {
        self.submit("UpdateVdbParams", move |r| r.update_params(id, params));
    }

    pub fn set_samples_per_pixel(&self, samples: u32) {
        self.submit("SetVdbSamplesPerPixel", move |r| r.set_samples_per_pixel(samples));
    }

    pub fn set_max_ray_depth(&self, depth: u32) {
        self.submit("SetVdbMaxRayDepth", move |r| r.set_max_ray_depth(depth));
    }

    pub fn set_denoiser_method(&self, method: DenoiserMethod) {
        self.submit("SetVdbDenoiserMethod", move |r| r.set_denoiser_method(method));
    }

    /// Sets the accumulation budget override; `-1` defers to the view.
    pub fn set_max_samples_per_pixel(&self, value: i32) {
        self.tunables.set_max_samples_per_pixel(value);
    }
}
