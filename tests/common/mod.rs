//! Recording mock host shared by the integration tests.
//!
//! Every mock reports what it was asked to do on a `flume` channel so tests
//! can inspect calls even after the mocks were boxed into a renderer.

#![allow(dead_code)]

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, UVec2, Vec3};
use slotmap::{KeyData, SlotMap};

use vdb_overlay::host::{
    BufferDesc, BufferId, Compositor, Denoiser, GraphTexture, ModuleLookup, OverlayDelegateHandle,
    PostOpaqueParams, RenderDevice, RenderGraphBuilder, RenderMode, RenderTargetDesc,
    RendererModule, SceneView, TextureId, ViewId, ViewportRect,
};
use vdb_overlay::proxy::{BoxSphereBounds, IndexBounds, ProxyId, VolumeParams, VolumeProxy};
use vdb_overlay::scheduler::{FrameStats, VolumeRasterPass};
use vdb_overlay::settings::{DenoiserMethod, OverlaySettings};
use vdb_overlay::{ProxyRegistry, VolumeRenderer, VolumeRendererDesc};

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    BufferCreated(BufferId),
    TargetCreated(TextureId, UVec2),
    TargetReleased(TextureId),
    Denoised {
        input: TextureId,
        method: DenoiserMethod,
    },
    Composited {
        source: TextureId,
        target: TextureId,
    },
    DelegateRegistered(u64),
    DelegateRemoved(u64),
}

pub type Events = flume::Receiver<HostEvent>;

pub fn events() -> (flume::Sender<HostEvent>, Events) {
    flume::unbounded()
}

/// Routes `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything reported so far.
pub fn drain(events: &Events) -> Vec<HostEvent> {
    events.try_iter().collect()
}

// ============================================================================
// Device
// ============================================================================

pub struct MockDevice {
    buffers: SlotMap<BufferId, ()>,
    targets: SlotMap<TextureId, RenderTargetDesc>,
    events: flume::Sender<HostEvent>,
}

impl MockDevice {
    pub fn new(events: flume::Sender<HostEvent>) -> Self {
        Self {
            buffers: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            events,
        }
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn invalidate_buffers(&mut self) {
        self.buffers.clear();
    }
}

impl RenderDevice for MockDevice {
    fn create_buffer(&mut self, _desc: &BufferDesc<'_>) -> BufferId {
        let id = self.buffers.insert(());
        let _ = self.events.send(HostEvent::BufferCreated(id));
        id
    }

    fn is_buffer_valid(&self, id: BufferId) -> bool {
        self.buffers.contains_key(id)
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> TextureId {
        let id = self.targets.insert(*desc);
        let _ = self.events.send(HostEvent::TargetCreated(id, desc.extent));
        id
    }

    fn release_render_target(&mut self, id: TextureId) {
        if self.targets.remove(id).is_some() {
            let _ = self.events.send(HostEvent::TargetReleased(id));
        }
    }
}

// ============================================================================
// Graph & services
// ============================================================================

#[derive(Default)]
pub struct RecordingGraph {
    pub passes: Vec<VolumeRasterPass>,
}

impl RenderGraphBuilder for RecordingGraph {
    fn add_volume_pass(&mut self, pass: VolumeRasterPass) {
        self.passes.push(pass);
    }
}

pub struct MockDenoiser {
    pub events: flume::Sender<HostEvent>,
}

impl Denoiser for MockDenoiser {
    fn denoise(
        &mut self,
        _graph: &mut dyn RenderGraphBuilder,
        _device: &mut dyn RenderDevice,
        input: TextureId,
        _view: &SceneView,
        _viewport: ViewportRect,
        method: DenoiserMethod,
    ) -> TextureId {
        let _ = self.events.send(HostEvent::Denoised { input, method });
        input
    }
}

pub struct MockCompositor {
    pub events: flume::Sender<HostEvent>,
}

impl Compositor for MockCompositor {
    fn composite_fullscreen(
        &mut self,
        _graph: &mut dyn RenderGraphBuilder,
        source: TextureId,
        target: &GraphTexture,
        _view: &SceneView,
    ) {
        let _ = self.events.send(HostEvent::Composited {
            source,
            target: target.id,
        });
    }
}

// ============================================================================
// Modules
// ============================================================================

pub struct MockRendererModule {
    next: AtomicU64,
    events: flume::Sender<HostEvent>,
}

impl RendererModule for MockRendererModule {
    fn register_overlay_render_delegate(&self) -> OverlayDelegateHandle {
        let raw = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.events.send(HostEvent::DelegateRegistered(raw));
        OverlayDelegateHandle::new(NonZeroU64::new(raw).unwrap())
    }

    fn remove_overlay_render_delegate(&self, handle: OverlayDelegateHandle) {
        let _ = self.events.send(HostEvent::DelegateRemoved(handle.raw()));
    }
}

pub struct MockModules {
    renderer: Option<Arc<MockRendererModule>>,
}

impl MockModules {
    pub fn with_renderer(events: flume::Sender<HostEvent>) -> Self {
        Self {
            renderer: Some(Arc::new(MockRendererModule {
                next: AtomicU64::new(0),
                events,
            })),
        }
    }

    pub fn without_renderer() -> Self {
        Self { renderer: None }
    }
}

impl ModuleLookup for MockModules {
    fn renderer_module(&self) -> Option<Arc<dyn RendererModule>> {
        self.renderer
            .clone()
            .map(|m| m as Arc<dyn RendererModule>)
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn renderer(events: &flume::Sender<HostEvent>, modules: MockModules) -> VolumeRenderer {
    renderer_with_settings(events, modules, OverlaySettings::default())
}

pub fn renderer_with_settings(
    events: &flume::Sender<HostEvent>,
    modules: MockModules,
    settings: OverlaySettings,
) -> VolumeRenderer {
    VolumeRenderer::new(VolumeRendererDesc {
        device: Box::new(MockDevice::new(events.clone())),
        denoiser: Box::new(MockDenoiser {
            events: events.clone(),
        }),
        compositor: Box::new(MockCompositor {
            events: events.clone(),
        }),
        modules: Arc::new(modules),
        settings,
    })
}

static NEXT_GRID: AtomicU64 = AtomicU64::new(1);

/// A grid handle distinct from every other one handed out.
pub fn grid() -> BufferId {
    let n = NEXT_GRID.fetch_add(1, Ordering::Relaxed);
    // Odd version marks an occupied slot.
    KeyData::from_ffi((1 << 32) | n).into()
}

/// Unit volume centred on `center`, with or without a density grid.
pub fn proxy_at(center: Vec3, with_density: bool) -> VolumeProxy {
    let params = VolumeParams {
        density: with_density.then(grid),
        index_bounds: IndexBounds::new(Vec3::splat(-0.5), Vec3::ONE),
        ..Default::default()
    };
    VolumeProxy::new(ProxyId::next(), Mat4::from_translation(center), params).unwrap()
}

pub fn view(mode: RenderMode, counter: Option<u32>, budget: u32) -> SceneView {
    let mut view = SceneView::new(ViewId(0), Mat4::IDENTITY, Mat4::IDENTITY);
    view.render_mode = mode;
    view.path_tracing_spp = counter;
    view.post_process.path_tracing_samples_per_pixel = budget;
    view
}

pub fn color_texture(extent: UVec2) -> GraphTexture {
    let mut textures: SlotMap<TextureId, ()> = SlotMap::with_key();
    GraphTexture {
        id: textures.insert(()),
        extent,
        format: wgpu::TextureFormat::Rgba16Float,
    }
}

pub fn depth_texture(extent: UVec2) -> GraphTexture {
    GraphTexture {
        format: wgpu::TextureFormat::Depth32Float,
        ..color_texture(extent)
    }
}

/// Stands in for the host visibility pass: every proxy is visible in `view`.
pub fn mark_all_visible(registry: &mut ProxyRegistry, view: ViewId) {
    for proxy in registry.iter_mut() {
        let bounds: BoxSphereBounds = proxy.world_bounds();
        proxy.visibility_mut().mark_visible(view, bounds);
    }
}

/// Runs the overlay callback for `view` over a colour target of `extent`.
pub fn record_frame(
    renderer: &mut VolumeRenderer,
    view: &SceneView,
    extent: UVec2,
) -> (FrameStats, Vec<VolumeRasterPass>) {
    let mut graph = RecordingGraph::default();
    let stats = renderer.render_post_opaque(PostOpaqueParams {
        graph: &mut graph,
        view,
        viewport: ViewportRect::from_size(extent),
        color_texture: color_texture(extent),
        depth_texture: depth_texture(extent),
    });
    (stats, graph.passes)
}

/// One full host frame: reset visibility, mark everything visible, record.
pub fn visible_frame(
    renderer: &mut VolumeRenderer,
    view: &SceneView,
    extent: UVec2,
) -> (FrameStats, Vec<VolumeRasterPass>) {
    renderer.pre_render_view_family();
    mark_all_visible(renderer.registry_mut(), view.id);
    record_frame(renderer, view, extent)
}
