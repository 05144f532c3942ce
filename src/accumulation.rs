//! Progressive Accumulation
//!
//! Per-frame accumulation state, derived from the view and the
//! samples-per-pixel override.
//!
//! # Lockstep with the host path tracer
//!
//! The host path tracer owns the progressive counter and resets it whenever
//! the camera or scene changes. The overlay reads it one frame behind:
//!
//! ```text
//! host counter:        0   1   2   3   4   5
//! num_accumulations:   0   0   1   2   3   4
//! current slot:        0   0   1   0   1   0
//! ```
//!
//! Lagging by one keeps the previous frame's target readable as history while
//! the other slot is written. Outside path tracing every frame starts from
//! zero; the ring is still used so denoising never aliases its input.

use crate::host::SceneView;
use crate::proxy::VolumeProxy;

/// Accumulation decisions shared by every proxy in one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationState {
    /// Samples already accumulated for the current static scene.
    pub num_accumulations: u32,
    /// Budget after which proxies stop rendering and reuse their result.
    pub max_spp: u32,
    pub path_tracing: bool,
}

impl AccumulationState {
    /// Derives this frame's state.
    ///
    /// `max_spp_override` wins when non-negative; otherwise the view's
    /// post-process budget is used. The budget never drops below 1.
    #[must_use]
    pub fn compute(view: &SceneView, max_spp_override: i32) -> Self {
        let path_tracing = view.is_path_tracing();

        let num_accumulations = if path_tracing {
            accumulation_index(view.path_tracing_spp.unwrap_or(0))
        } else {
            0
        };

        let max_spp = u32::try_from(max_spp_override)
            .unwrap_or(view.post_process.path_tracing_samples_per_pixel)
            .max(1);

        Self {
            num_accumulations,
            max_spp,
            path_tracing,
        }
    }

    /// Ring slot written this frame.
    #[inline]
    #[must_use]
    pub fn current_slot(&self) -> usize {
        (self.num_accumulations % 2) as usize
    }

    /// Ring slot read as history this frame.
    #[inline]
    #[must_use]
    pub fn previous_slot(&self) -> usize {
        1 - self.current_slot()
    }

    /// Whether the budget still allows another sample.
    #[inline]
    #[must_use]
    pub fn needs_samples(&self) -> bool {
        self.num_accumulations < self.max_spp
    }

    /// Whether `proxy` records a raster pass this frame. Converged proxies and
    /// proxies without density reuse their current target as is.
    #[inline]
    #[must_use]
    pub fn should_render(&self, proxy: &VolumeProxy) -> bool {
        self.needs_samples() && proxy.has_density()
    }
}

/// `max(host_counter - 1, 0)`.
#[inline]
#[must_use]
pub fn accumulation_index(host_counter: u32) -> u32 {
    host_counter.saturating_sub(1)
}
