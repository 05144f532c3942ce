//! Scripting Facade
//!
//! Entry points for a scripting or editor layer. Arguments arrive as script
//! integers and strings; they are clamped or parsed here and forwarded to
//! the [`VolumeOverlay`].

use crate::errors::Result;
use crate::overlay::VolumeOverlay;
use crate::settings::DenoiserMethod;

#[derive(Clone)]
pub struct VolumeLibrary {
    overlay: VolumeOverlay,
}

impl VolumeLibrary {
    #[must_use]
    pub fn new(overlay: VolumeOverlay) -> Self {
        Self { overlay }
    }

    /// Samples per pixel for every volume. Values below 1 clamp to 1.
    pub fn set_raymarching_sample_count(&self, sample_count: i32) {
        self.overlay.set_samples_per_pixel(clamp_count(sample_count));
    }

    /// Maximum bounces per ray for every volume. Values below 1 clamp to 1.
    pub fn set_maximum_ray_depth(&self, depth: i32) {
        self.overlay.set_max_ray_depth(clamp_count(depth));
    }

    pub fn set_denoiser_method(&self, method: DenoiserMethod) {
        self.overlay.set_denoiser_method(method);
    }

    /// Like [`set_denoiser_method`](Self::set_denoiser_method), by name.
    pub fn set_denoiser_method_by_name(&self, name: &str) -> Result<()> {
        self.overlay.set_denoiser_method(name.parse()?);
        Ok(())
    }

    /// Forwards a console command such as `r.VdbOverlay.MaxSamplesPerPixel 32`.
    pub fn execute_console_command(&self, command: &str) -> Result<()> {
        self.overlay.tunables().apply_console_command(command)
    }
}

fn clamp_count(value: i32) -> u32 {
    value.max(1).unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::clamp_count;

    #[test]
    fn counts_clamp_to_one() {
        assert_eq!(clamp_count(-3), 1);
        assert_eq!(clamp_count(0), 1);
        assert_eq!(clamp_count(7), 7);
    }
}
