//! Host Renderer Interface
//!
//! Everything the overlay consumes from the host engine, expressed as plain
//! data types and traits:
//!
//! - [`SceneView`]: camera matrices, render mode, sample budgets
//! - [`RenderDevice`]: buffer and render-target allocation
//! - [`RenderGraphBuilder`]: pass recording (passes are recorded, never run inline)
//! - [`Denoiser`] / [`Compositor`]: externally supplied fullscreen services
//! - [`RendererModule`] / [`ModuleLookup`]: overlay callback registration
//!
//! The overlay never talks to the GPU directly; ordering between recorded
//! passes follows the texture dependencies declared on them.

use std::num::NonZeroU64;
use std::sync::Arc;

use glam::{Mat4, UVec2, Vec3};
use slotmap::new_key_type;

use crate::scheduler::VolumeRasterPass;
use crate::settings::DenoiserMethod;

new_key_type! {
    /// Host texture handle (render targets, scene depth, colour).
    pub struct TextureId;
    /// Host buffer handle (vertex/index buffers, volume grids).
    pub struct BufferId;
}

/// Identifies one host view (player viewport, editor viewport, capture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

// ============================================================================
// View
// ============================================================================

/// How the host renders the view the overlay is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Regular rasterization; the overlay raymarches and may denoise.
    #[default]
    Rasterized,
    /// The host path tracer is active; the overlay accumulates in lockstep.
    PathTracing,
}

/// Subset of the view's resolved post-process settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessSettings {
    /// Samples per pixel the host path tracer converges to.
    pub path_tracing_samples_per_pixel: u32,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            path_tracing_samples_per_pixel: 16,
        }
    }
}

/// Per-frame view state handed to the overlay callback.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneView {
    pub id: ViewId,
    /// World to view space (right-handed, camera looks down -Z).
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub render_mode: RenderMode,
    pub post_process: PostProcessSettings,
    /// Host progressive sample counter. `None` when the view carries no
    /// persistent state (e.g. scene captures).
    pub path_tracing_spp: Option<u32>,
}

impl SceneView {
    #[must_use]
    pub fn new(id: ViewId, view_matrix: Mat4, projection_matrix: Mat4) -> Self {
        Self {
            id,
            view_matrix,
            projection_matrix,
            render_mode: RenderMode::Rasterized,
            post_process: PostProcessSettings::default(),
            path_tracing_spp: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_path_tracing(&self) -> bool {
        self.render_mode == RenderMode::PathTracing
    }

    /// Distance in front of the camera along the view axis.
    #[inline]
    #[must_use]
    pub fn view_depth(&self, world_position: Vec3) -> f32 {
        -self.view_matrix.transform_point3(world_position).z
    }
}

/// Pixel rectangle of the view inside its render targets. `max` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub min: UVec2,
    pub max: UVec2,
}

impl ViewportRect {
    #[must_use]
    pub fn from_size(size: UVec2) -> Self {
        Self {
            min: UVec2::ZERO,
            max: size,
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.max.saturating_sub(self.min)
    }
}

/// A texture already registered in the host graph for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphTexture {
    pub id: TextureId,
    pub extent: UVec2,
    pub format: wgpu::TextureFormat,
}

// ============================================================================
// Device
// ============================================================================

/// Static buffer creation request.
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'static str,
    pub contents: &'a [u8],
    pub usage: wgpu::BufferUsages,
}

/// Persistent 2D render target request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTargetDesc {
    pub label: &'static str,
    pub extent: UVec2,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

/// GPU resource allocation owned by the host.
///
/// Only called on the rendering thread.
pub trait RenderDevice: Send {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferId;

    /// Returns `false` for handles the device has since dropped (device loss,
    /// host teardown).
    fn is_buffer_valid(&self, id: BufferId) -> bool;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> TextureId;

    fn release_render_target(&mut self, id: TextureId);
}

// ============================================================================
// Graph & services
// ============================================================================

/// Records passes into the host's frame graph.
pub trait RenderGraphBuilder {
    fn add_volume_pass(&mut self, pass: VolumeRasterPass);
}

/// Fullscreen denoising service.
pub trait Denoiser: Send {
    /// Filters `input` and returns the texture holding the result, which may
    /// be `input` itself.
    fn denoise(
        &mut self,
        graph: &mut dyn RenderGraphBuilder,
        device: &mut dyn RenderDevice,
        input: TextureId,
        view: &SceneView,
        viewport: ViewportRect,
        method: DenoiserMethod,
    ) -> TextureId;
}

/// Alpha-over fullscreen composite service.
pub trait Compositor: Send {
    fn composite_fullscreen(
        &mut self,
        graph: &mut dyn RenderGraphBuilder,
        source: TextureId,
        target: &GraphTexture,
        view: &SceneView,
    );
}

// ============================================================================
// Overlay registration
// ============================================================================

/// Opaque handle returned by overlay registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayDelegateHandle(NonZeroU64);

impl OverlayDelegateHandle {
    #[must_use]
    pub fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// The host renderer module's overlay extension point.
pub trait RendererModule: Send + Sync {
    fn register_overlay_render_delegate(&self) -> OverlayDelegateHandle;
    fn remove_overlay_render_delegate(&self, handle: OverlayDelegateHandle);
}

/// Looks up optional host modules by name.
pub trait ModuleLookup: Send + Sync {
    /// The module named `"Renderer"`, when loaded.
    fn renderer_module(&self) -> Option<Arc<dyn RendererModule>>;
}

/// Arguments of the post-opaque overlay callback.
pub struct PostOpaqueParams<'a> {
    pub graph: &'a mut dyn RenderGraphBuilder,
    pub view: &'a SceneView,
    pub viewport: ViewportRect,
    pub color_texture: GraphTexture,
    pub depth_texture: GraphTexture,
}
