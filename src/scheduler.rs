//! Volume Pass Scheduler
//!
//! Records the overlay's GPU work for one view.
//!
//! # Frame Flow
//!
//! ```text
//! registry ─▶ visible in view? ─▶ sort far→near ─▶ for each proxy:
//!                                                   resolve ring targets
//!                                                   [raster pass → current]
//!                                                   [denoise (raster mode)]
//!                                                   composite → colour
//! ```
//!
//! Passes are only recorded. The host graph orders them by the textures they
//! read and write: a proxy's raster pass writes its current slot, its
//! composite reads it, and composites onto the shared colour target follow
//! the sort order exactly.

use crate::accumulation::AccumulationState;
use crate::geometry::{CUBE_INDEX_FORMAT, IndexedDraw};
use crate::host::{
    BufferId, Compositor, Denoiser, PostOpaqueParams, RenderDevice, RenderTargetDesc, TextureId,
    ViewId, ViewportRect,
};
use crate::params::ParameterBlock;
use crate::permutation::VolumePermutation;
use crate::proxy::ProxyId;
use crate::registry::ProxyRegistry;
use crate::settings::DenoiserMethod;

/// A recorded volume raster pass.
///
/// Draws the unit cube over the viewport, reading `prev_accumulation` and
/// `scene_depth` and writing `render_target`, which is cleared to transparent
/// first.
#[derive(Debug, Clone)]
pub struct VolumeRasterPass {
    pub label: &'static str,
    pub view: ViewId,
    pub proxy: ProxyId,
    pub permutation: VolumePermutation,
    pub parameters: ParameterBlock,
    pub num_accumulations: u32,
    pub display_bounds: bool,
    pub display_unfinished_paths: bool,

    // === Attachments & inputs ===
    pub render_target: TextureId,
    pub prev_accumulation: TextureId,
    pub scene_depth: TextureId,
    pub load_op: wgpu::LoadOp<wgpu::Color>,
    pub blend: wgpu::BlendState,
    pub depth_write: bool,

    // === Geometry ===
    pub viewport: ViewportRect,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_format: wgpu::IndexFormat,
    pub topology: wgpu::PrimitiveTopology,
    pub draw: IndexedDraw,
}

/// Counters for one recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Proxies visible in the view.
    pub visible: usize,
    /// Raster passes recorded.
    pub rendered: usize,
    /// Denoise requests issued.
    pub denoised: usize,
    /// Composites issued (always equals `visible`).
    pub composited: usize,
}

/// Render-thread state borrowed for one frame.
pub struct FrameResources<'a> {
    pub registry: &'a mut ProxyRegistry,
    pub device: &'a mut dyn RenderDevice,
    pub denoiser: &'a mut dyn Denoiser,
    pub compositor: &'a mut dyn Compositor,
    /// Unit cube vertex and index buffers.
    pub cube: (BufferId, BufferId),
    /// Samples-per-pixel override read from the tunables for this frame.
    pub max_spp_override: i32,
    pub denoiser_method: DenoiserMethod,
}

const OFFSCREEN_TARGET_LABEL: &str = "VdbOffscreenTarget";

#[derive(Debug, Default)]
pub struct PassScheduler {
    /// Reused per frame: (registry index, view depth).
    sorted: Vec<(usize, f32)>,
    frames_recorded: u64,
}

impl PassScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames that recorded at least one composite.
    #[inline]
    #[must_use]
    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded
    }

    /// Records every pass for `params.view`.
    pub fn render_frame(
        &mut self,
        res: FrameResources<'_>,
        params: PostOpaqueParams<'_>,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        if res.registry.is_empty() {
            return stats;
        }

        let view = params.view;

        // =====================================================================
        // 1. Visible proxies, far to near
        // =====================================================================
        self.sorted.clear();
        self.sorted.extend(
            res.registry
                .iter()
                .enumerate()
                .filter(|(_, p)| p.visibility().is_visible(view.id))
                .map(|(i, p)| (i, view.view_depth(p.visibility().bounds().sphere_center()))),
        );
        // Stable: ties keep registration order.
        self.sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        stats.visible = self.sorted.len();

        if self.sorted.is_empty() {
            return stats;
        }

        // =====================================================================
        // 2. Accumulation state, shared by the whole view
        // =====================================================================
        let accumulation = AccumulationState::compute(view, res.max_spp_override);
        let target_desc = RenderTargetDesc {
            label: OFFSCREEN_TARGET_LABEL,
            extent: params.color_texture.extent,
            format: params.color_texture.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        };

        log::trace!(
            "Volume overlay: view {:?}, {} visible, accumulation {}/{} (path tracing: {})",
            view.id,
            stats.visible,
            accumulation.num_accumulations,
            accumulation.max_spp,
            accumulation.path_tracing,
        );

        // =====================================================================
        // 3. Per-proxy passes
        // =====================================================================
        let (vertex_buffer, index_buffer) = res.cube;
        let proxies = res.registry.as_mut_slice();

        for &(index, _) in &self.sorted {
            let proxy = &mut proxies[index];

            // Reading and writing the same target is not allowed: write the
            // current slot, read the previous one.
            let targets =
                proxy
                    .targets
                    .resolve(res.device, &target_desc, accumulation.current_slot());
            let mut composite_source = targets.current;

            if accumulation.should_render(proxy) {
                if let Some(parameters) = ParameterBlock::build(proxy) {
                    let render = proxy.params().render;

                    params.graph.add_volume_pass(VolumeRasterPass {
                        label: "VdbVolumeRendering",
                        view: view.id,
                        proxy: proxy.id(),
                        permutation: VolumePermutation::select(
                            accumulation.path_tracing,
                            parameters.use_temperature,
                        ),
                        parameters,
                        num_accumulations: accumulation.num_accumulations,
                        display_bounds: render.display_bounds,
                        display_unfinished_paths: render.display_unfinished_paths,
                        render_target: targets.current,
                        prev_accumulation: targets.previous,
                        scene_depth: params.depth_texture.id,
                        load_op: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        blend: wgpu::BlendState::REPLACE,
                        depth_write: false,
                        viewport: params.viewport,
                        vertex_buffer,
                        index_buffer,
                        index_format: CUBE_INDEX_FORMAT,
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        draw: IndexedDraw::UNIT_CUBE,
                    });
                    stats.rendered += 1;

                    // The host path tracer converges on its own; only the
                    // raymarched result is filtered.
                    if !accumulation.path_tracing {
                        composite_source = res.denoiser.denoise(
                            &mut *params.graph,
                            &mut *res.device,
                            targets.current,
                            view,
                            params.viewport,
                            res.denoiser_method,
                        );
                        stats.denoised += 1;
                    }
                }
            } else if !proxy.has_density() {
                log::trace!("Volume proxy {:?} has no density grid, compositing stale target", proxy.id());
            }

            res.compositor.composite_fullscreen(
                &mut *params.graph,
                composite_source,
                &params.color_texture,
                view,
            );
            stats.composited += 1;
        }

        self.frames_recorded += 1;
        stats
    }
}
