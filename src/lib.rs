#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Progressive sparse-volume overlay for a host render graph.
//!
//! Volumes are registered as [`VolumeProxy`]s through the any-thread
//! [`VolumeOverlay`] facade. Once per frame the host calls
//! [`VolumeRenderer::render_post_opaque`] on its rendering thread; the
//! overlay then records, for every visible proxy from far to near, a
//! raymarch/path-trace pass into the proxy's ping-pong targets, an optional
//! denoise, and an alpha-over composite onto the scene colour.

pub mod accumulation;
pub mod errors;
pub mod geometry;
pub mod gpu;
pub mod host;
pub mod library;
pub mod overlay;
pub mod params;
pub mod permutation;
pub mod proxy;
pub mod registry;
pub mod render_thread;
pub mod scheduler;
pub mod settings;

pub use accumulation::AccumulationState;
pub use errors::{OverlayError, Result};
pub use host::{
    Compositor, Denoiser, GraphTexture, ModuleLookup, PostOpaqueParams, RenderDevice,
    RenderGraphBuilder, RenderMode, RendererModule, SceneView, ViewId, ViewportRect,
};
pub use library::VolumeLibrary;
pub use overlay::{HookState, VolumeOverlay, VolumeRenderer, VolumeRendererDesc};
pub use params::ParameterBlock;
pub use permutation::VolumePermutation;
pub use proxy::{ProxyId, VolumeParams, VolumeProxy};
pub use registry::ProxyRegistry;
pub use render_thread::{
    RenderCommandQueue, RenderCommandReceiver, RenderThread, RenderingThreadScope,
    render_command_queue,
};
pub use scheduler::{FrameStats, PassScheduler, VolumeRasterPass};
pub use settings::{DenoiserMethod, OverlaySettings, Tunables};
