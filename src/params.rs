//! Volume Parameter Block
//!
//! Per-proxy, per-frame shader inputs. [`ParameterBlock::build`] is a pure
//! function of the proxy and may be called any number of times.
//!
//! The uniform part is laid out for a WGSL/std140 uniform buffer: every
//! `vec3` is followed by a scalar so no implicit padding is needed.

use bytemuck::{Pod, Zeroable};

use crate::host::BufferId;
use crate::proxy::VolumeProxy;

/// Uniform data of the volume pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VolumeUniforms {
    pub volume_to_local: [[f32; 4]; 4],
    pub local_to_world: [[f32; 4]; 4],
    pub world_to_local: [[f32; 4]; 4],

    pub volume_scale: [f32; 3],
    pub samples_per_pixel: u32,
    pub volume_translation: [f32; 3],
    pub max_ray_depth: u32,

    pub color: [f32; 3],
    pub density_mult: f32,
    pub emission_color: [f32; 3],
    pub emission_strength: f32,
    pub blackbody_tint: [f32; 3],
    pub blackbody_intensity: f32,

    pub albedo: f32,
    pub anisotropy: f32,
    pub temperature: f32,
    pub _pad: f32,
}

/// Grid buffers bound to the volume pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeBindings {
    pub density: BufferId,
    /// Equals `density` when the proxy has no temperature grid; the shader
    /// relies on the `USE_TEMPERATURE` permutation, never on this handle.
    pub temperature: BufferId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBlock {
    pub bindings: VolumeBindings,
    pub use_temperature: bool,
    pub uniforms: VolumeUniforms,
}

impl ParameterBlock {
    /// Builds the block for `proxy`. Returns `None` without a density grid.
    #[must_use]
    pub fn build(proxy: &VolumeProxy) -> Option<Self> {
        let params = proxy.params();
        let density = params.density?;
        let material = &params.material;

        let uniforms = VolumeUniforms {
            volume_to_local: params.index_to_local.to_cols_array_2d(),
            local_to_world: proxy.local_to_world().to_cols_array_2d(),
            world_to_local: proxy.world_to_local().to_cols_array_2d(),

            volume_scale: params.index_bounds.size.to_array(),
            samples_per_pixel: params.render.samples_per_pixel,
            volume_translation: params.index_bounds.min.to_array(),
            max_ray_depth: params.render.max_ray_depth,

            color: material.color.rgb().to_array(),
            density_mult: material.density_mult,
            emission_color: material.emission_color.rgb().to_array(),
            emission_strength: material.emission_strength,
            blackbody_tint: material.blackbody_tint.rgb().to_array(),
            blackbody_intensity: material.blackbody_intensity,

            albedo: material.albedo,
            anisotropy: material.anisotropy,
            temperature: material.temperature,
            _pad: 0.0,
        };

        Some(Self {
            bindings: VolumeBindings {
                density,
                temperature: params.temperature.unwrap_or(density),
            },
            use_temperature: params.temperature.is_some(),
            uniforms,
        })
    }

    /// Raw bytes for upload into a uniform buffer.
    #[inline]
    #[must_use]
    pub fn uniform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use slotmap::SlotMap;

    use super::*;
    use crate::proxy::{IndexBounds, LinearColor, ProxyId, VolumeParams};

    #[test]
    fn uniform_size_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<VolumeUniforms>() % 16, 0);
    }

    #[test]
    fn temperature_falls_back_to_density() {
        let mut buffers: SlotMap<BufferId, ()> = SlotMap::with_key();
        let density = buffers.insert(());
        let params = VolumeParams {
            density: Some(density),
            ..Default::default()
        };
        let proxy = VolumeProxy::new(ProxyId::next(), Mat4::IDENTITY, params).unwrap();

        let block = ParameterBlock::build(&proxy).unwrap();
        assert_eq!(block.bindings.temperature, density);
        assert!(!block.use_temperature);
    }

    #[test]
    fn colors_drop_alpha_and_bounds_map_to_scale() {
        let mut buffers: SlotMap<BufferId, ()> = SlotMap::with_key();
        let params = VolumeParams {
            density: Some(buffers.insert(())),
            temperature: Some(buffers.insert(())),
            index_bounds: IndexBounds::new(Vec3::new(-4.0, 0.0, 2.0), Vec3::new(8.0, 16.0, 32.0)),
            ..Default::default()
        };
        let mut proxy = VolumeProxy::new(ProxyId::next(), Mat4::IDENTITY, params).unwrap();
        let mut updated = proxy.params().clone();
        updated.material.emission_color = LinearColor::new(0.25, 0.5, 0.75, 0.1);
        proxy.set_params(updated).unwrap();

        let block = ParameterBlock::build(&proxy).unwrap();
        assert!(block.use_temperature);
        assert_eq!(block.uniforms.emission_color, [0.25, 0.5, 0.75]);
        assert_eq!(block.uniforms.volume_scale, [8.0, 16.0, 32.0]);
        assert_eq!(block.uniforms.volume_translation, [-4.0, 0.0, 2.0]);
        assert_eq!(block.uniform_bytes().len(), std::mem::size_of::<VolumeUniforms>());
    }

    #[test]
    fn build_is_repeatable() {
        let mut buffers: SlotMap<BufferId, ()> = SlotMap::with_key();
        let params = VolumeParams {
            density: Some(buffers.insert(())),
            ..Default::default()
        };
        let proxy = VolumeProxy::new(ProxyId::next(), Mat4::IDENTITY, params).unwrap();
        assert_eq!(ParameterBlock::build(&proxy), ParameterBlock::build(&proxy));
    }
}
