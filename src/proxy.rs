//! Volume Proxies
//!
//! Render-side representation of one volumetric instance. A proxy is created
//! by the owning scene component, moved into the render thread's
//! [`ProxyRegistry`](crate::registry::ProxyRegistry) and identified from then
//! on by its [`ProxyId`].
//!
//! A proxy carries:
//! - transforms (local ↔ world, index → local) and index-space bounds
//! - grid handles (density, optional temperature)
//! - material and per-proxy render configuration
//! - per-frame visibility written by the host ([`FrameVisibility`])
//! - its two offscreen accumulation targets ([`TargetRing`])

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::errors::{OverlayError, Result};
use crate::host::{BufferId, RenderDevice, RenderTargetDesc, TextureId, ViewId};

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a volume proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u64);

impl ProxyId {
    /// Allocates a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Colors & material
// ============================================================================

/// Linear-space RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl LinearColor {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Decodes an 8-bit sRGB color. Alpha is kept linear.
    #[must_use]
    pub fn from_srgb8(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn decode(c: u8) -> f32 {
            let c = f32::from(c) / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self::new(decode(r), decode(g), decode(b), f32::from(a) / 255.0)
    }

    /// RGB channels; alpha is not carried to the GPU.
    #[inline]
    #[must_use]
    pub fn rgb(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }
}

impl Default for LinearColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Participating-media parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMaterial {
    pub color: LinearColor,
    pub density_mult: f32,
    pub albedo: f32,
    /// Henyey-Greenstein g, in [-1, 1].
    pub anisotropy: f32,
    pub emission_color: LinearColor,
    pub emission_strength: f32,
    pub blackbody_tint: LinearColor,
    pub blackbody_intensity: f32,
    /// Blackbody temperature in Kelvin.
    pub temperature: f32,
}

impl Default for VolumeMaterial {
    fn default() -> Self {
        Self {
            color: LinearColor::WHITE,
            density_mult: 1.0,
            albedo: 0.8,
            anisotropy: 0.0,
            emission_color: LinearColor::BLACK,
            emission_strength: 0.0,
            blackbody_tint: LinearColor::WHITE,
            blackbody_intensity: 1.0,
            temperature: 1500.0,
        }
    }
}

/// Per-proxy sampling budget and debug switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub samples_per_pixel: u32,
    pub max_ray_depth: u32,
    pub display_bounds: bool,
    pub display_unfinished_paths: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1,
            max_ray_depth: 1,
            display_bounds: false,
            display_unfinished_paths: false,
        }
    }
}

/// Active voxel box in index space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexBounds {
    pub min: Vec3,
    pub size: Vec3,
}

impl IndexBounds {
    #[must_use]
    pub fn new(min: Vec3, size: Vec3) -> Self {
        Self { min, size }
    }

    #[inline]
    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.min + self.size
    }

    /// The eight corners, min corner first.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max());
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

/// Everything the parameter block is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeParams {
    pub density: Option<BufferId>,
    pub temperature: Option<BufferId>,
    pub index_bounds: IndexBounds,
    pub index_to_local: Mat4,
    pub material: VolumeMaterial,
    pub render: RenderConfig,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            density: None,
            temperature: None,
            index_bounds: IndexBounds::default(),
            index_to_local: Mat4::IDENTITY,
            material: VolumeMaterial::default(),
            render: RenderConfig::default(),
        }
    }
}

// ============================================================================
// Bounds & visibility
// ============================================================================

/// Axis-aligned box with its bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSphereBounds {
    pub origin: Vec3,
    pub extent: Vec3,
    pub radius: f32,
}

impl BoxSphereBounds {
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let extent = (max - min) * 0.5;
        Self {
            origin: min + extent,
            extent,
            radius: extent.length(),
        }
    }

    /// Sphere of the given radius around `center`.
    #[must_use]
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            origin: center,
            extent: Vec3::splat(radius),
            radius,
        }
    }

    #[inline]
    #[must_use]
    pub fn sphere_center(&self) -> Vec3 {
        self.origin
    }
}

/// Visibility written by the host each frame.
///
/// Cleared by [`reset`](Self::reset) before the host's visibility pass, then
/// filled per view. The overlay reads it; it never computes it.
#[derive(Debug, Clone, Default)]
pub struct FrameVisibility {
    visible_views: SmallVec<[ViewId; 2]>,
    bounds: BoxSphereBounds,
}

impl FrameVisibility {
    pub fn reset(&mut self) {
        self.visible_views.clear();
        self.bounds = BoxSphereBounds::default();
    }

    pub fn mark_visible(&mut self, view: ViewId, bounds: BoxSphereBounds) {
        if !self.visible_views.contains(&view) {
            self.visible_views.push(view);
        }
        self.bounds = bounds;
    }

    pub fn mark_hidden(&mut self, view: ViewId) {
        self.visible_views.retain(|v| *v != view);
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self, view: ViewId) -> bool {
        self.visible_views.contains(&view)
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &BoxSphereBounds {
        &self.bounds
    }
}

// ============================================================================
// Offscreen targets
// ============================================================================

/// Write/read pair resolved for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPair {
    /// Written by this frame's raster pass.
    pub current: TextureId,
    /// Last frame's result, read as accumulation history.
    pub previous: TextureId,
}

/// Two-slot ring of offscreen accumulation targets.
///
/// Slot `n % 2` is written on accumulation index `n`; the other slot is read.
/// Both slots share one descriptor. A descriptor change (viewport resize,
/// format change) releases both slots, dropping this proxy's history.
#[derive(Debug, Default)]
pub struct TargetRing {
    slots: [Option<TextureId>; 2],
    desc: Option<RenderTargetDesc>,
}

impl TargetRing {
    /// Returns the pair for `current_slot`, allocating lazily.
    pub fn resolve(
        &mut self,
        device: &mut dyn RenderDevice,
        desc: &RenderTargetDesc,
        current_slot: usize,
    ) -> TargetPair {
        debug_assert!(current_slot < 2);

        if self.desc.as_ref() != Some(desc) {
            if let Some(old) = self.desc {
                log::debug!(
                    "Reallocating volume targets {}x{} -> {}x{}, accumulation history discarded",
                    old.extent.x,
                    old.extent.y,
                    desc.extent.x,
                    desc.extent.y,
                );
            }
            self.release(device);
            self.desc = Some(*desc);
        }

        let current = *self.slots[current_slot]
            .get_or_insert_with(|| device.create_render_target(desc));
        let previous = *self.slots[1 - current_slot]
            .get_or_insert_with(|| device.create_render_target(desc));

        TargetPair { current, previous }
    }

    /// Returns both slots to the device.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        for slot in &mut self.slots {
            if let Some(id) = slot.take() {
                device.release_render_target(id);
            }
        }
        self.desc = None;
    }

    #[inline]
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<TextureId> {
        self.slots.get(index).copied().flatten()
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> Option<&RenderTargetDesc> {
        self.desc.as_ref()
    }
}

// ============================================================================
// VolumeProxy
// ============================================================================

/// One registered volume instance.
#[derive(Debug)]
pub struct VolumeProxy {
    id: ProxyId,
    local_to_world: Mat4,
    world_to_local: Mat4,
    params: VolumeParams,
    pub(crate) visibility: FrameVisibility,
    pub(crate) targets: TargetRing,
}

fn checked_inverse(matrix: &Mat4, context: &'static str) -> Result<Mat4> {
    let determinant = matrix.determinant();
    if !determinant.is_finite() || determinant.abs() <= f32::EPSILON {
        return Err(OverlayError::DegenerateTransform { context, determinant });
    }
    Ok(matrix.inverse())
}

impl VolumeProxy {
    /// Creates a proxy. Fails when either transform is not invertible.
    pub fn new(id: ProxyId, local_to_world: Mat4, params: VolumeParams) -> Result<Self> {
        let world_to_local = checked_inverse(&local_to_world, "local_to_world")?;
        checked_inverse(&params.index_to_local, "index_to_local")?;

        Ok(Self {
            id,
            local_to_world,
            world_to_local,
            params,
            visibility: FrameVisibility::default(),
            targets: TargetRing::default(),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ProxyId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn local_to_world(&self) -> &Mat4 {
        &self.local_to_world
    }

    #[inline]
    #[must_use]
    pub fn world_to_local(&self) -> &Mat4 {
        &self.world_to_local
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &VolumeParams {
        &self.params
    }

    #[inline]
    #[must_use]
    pub fn has_density(&self) -> bool {
        self.params.density.is_some()
    }

    #[inline]
    #[must_use]
    pub fn visibility(&self) -> &FrameVisibility {
        &self.visibility
    }

    /// Host write access for the visibility pass.
    #[inline]
    pub fn visibility_mut(&mut self) -> &mut FrameVisibility {
        &mut self.visibility
    }

    #[inline]
    #[must_use]
    pub fn targets(&self) -> &TargetRing {
        &self.targets
    }

    pub fn set_local_to_world(&mut self, local_to_world: Mat4) -> Result<()> {
        self.world_to_local = checked_inverse(&local_to_world, "local_to_world")?;
        self.local_to_world = local_to_world;
        Ok(())
    }

    pub fn set_params(&mut self, params: VolumeParams) -> Result<()> {
        checked_inverse(&params.index_to_local, "index_to_local")?;
        self.params = params;
        Ok(())
    }

    pub(crate) fn render_config_mut(&mut self) -> &mut RenderConfig {
        &mut self.params.render
    }

    /// World-space bounds of the active index box.
    #[must_use]
    pub fn world_bounds(&self) -> BoxSphereBounds {
        let index_to_world = self.local_to_world * self.params.index_to_local;
        let corners = self
            .params
            .index_bounds
            .corners()
            .map(|c| index_to_world.transform_point3(c));
        BoxSphereBounds::from_points(&corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_scale() {
        let result = VolumeProxy::new(
            ProxyId::next(),
            Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)),
            VolumeParams::default(),
        );
        assert!(matches!(result, Err(OverlayError::DegenerateTransform { .. })));
    }

    #[test]
    fn caches_inverse_transform() {
        let l2w = Mat4::from_translation(Vec3::new(3.0, 0.0, -2.0));
        let proxy = VolumeProxy::new(ProxyId::next(), l2w, VolumeParams::default()).unwrap();
        let p = proxy.world_to_local().transform_point3(Vec3::new(3.0, 0.0, -2.0));
        assert!(p.length() < 1e-5);
    }

    #[test]
    fn world_bounds_follow_transforms() {
        let params = VolumeParams {
            index_bounds: IndexBounds::new(Vec3::ZERO, Vec3::splat(10.0)),
            index_to_local: Mat4::from_scale(Vec3::splat(0.1)),
            ..Default::default()
        };
        let proxy = VolumeProxy::new(
            ProxyId::next(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            params,
        )
        .unwrap();

        let bounds = proxy.world_bounds();
        assert!((bounds.origin - Vec3::new(0.5, 0.5, -4.5)).length() < 1e-5);
        assert!((bounds.extent - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn visibility_reset_clears_views_and_center() {
        let mut vis = FrameVisibility::default();
        vis.mark_visible(ViewId(1), BoxSphereBounds::from_sphere(Vec3::ONE, 2.0));
        assert!(vis.is_visible(ViewId(1)));
        assert!(!vis.is_visible(ViewId(2)));

        vis.reset();
        assert!(!vis.is_visible(ViewId(1)));
        assert_eq!(vis.bounds().sphere_center(), Vec3::ZERO);
    }

    #[test]
    fn srgb_decoding_is_linear_at_extremes() {
        let c = LinearColor::from_srgb8(255, 0, 128, 255);
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!(c.g.abs() < 1e-6);
        assert!(c.b > 0.2 && c.b < 0.23);
        assert_eq!(c.rgb(), Vec3::new(c.r, c.g, c.b));
    }
}
