//! Overlay Settings & Runtime Tunables
//!
//! Two layers of configuration:
//!
//! - [`OverlaySettings`]: consumed once when the renderer is created. Can be
//!   deserialized from JSON or built from [`Default`].
//! - [`Tunables`]: values that may change while frames are in flight. They
//!   are written from any thread and read on the rendering thread once per
//!   frame, mirroring a render-thread-safe console variable.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vdb_overlay::settings::{OverlaySettings, Tunables};
//!
//! let settings = OverlaySettings::from_json_str(r#"{ "max_samples_per_pixel": 64 }"#)?;
//! let tunables = Tunables::from_settings(&settings);
//!
//! // Later, from a console or editor thread:
//! tunables.apply_console_command("r.VdbOverlay.MaxSamplesPerPixel 128")?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::{OverlayError, Result};

/// Console variable controlling the maximum samples per pixel before the
/// accumulation stops. `-1` defers to the view's post-process budget.
pub const MAX_SAMPLES_PER_PIXEL_CVAR: &str = "r.VdbOverlay.MaxSamplesPerPixel";

// ---------------------------------------------------------------------------
// DenoiserMethod
// ---------------------------------------------------------------------------

/// Spatial filter applied to the raymarched result outside path tracing.
///
/// The filter itself is implemented by the host's [`Denoiser`](crate::host::Denoiser);
/// the overlay only forwards the selected method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiserMethod {
    /// Pass the input through untouched.
    #[default]
    None,
    /// Separable box filter.
    BoxBlur,
    /// Separable gaussian filter.
    GaussianBlur,
}

impl DenoiserMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 3] = [Self::None, Self::BoxBlur, Self::GaussianBlur];

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BoxBlur => "box_blur",
            Self::GaussianBlur => "gaussian_blur",
        }
    }
}

impl fmt::Display for DenoiserMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DenoiserMethod {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == normalized || m.name().replace('_', "") == normalized)
            .ok_or_else(|| OverlayError::UnknownDenoiserMethod(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// OverlaySettings
// ---------------------------------------------------------------------------

/// Configuration for renderer creation.
///
/// | Field                       | Description                                   | Default |
/// |-----------------------------|-----------------------------------------------|---------|
/// | `max_samples_per_pixel`     | Accumulation budget override (`-1` = view)    | `-1`    |
/// | `denoiser_method`           | Filter used outside path tracing              | `None`  |
/// | `samples_per_pixel`         | Raymarch samples forced on every proxy        | unset   |
/// | `max_ray_depth`             | Bounce limit forced on every proxy            | unset   |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub max_samples_per_pixel: i32,
    pub denoiser_method: DenoiserMethod,
    /// When set, replaces every proxy's own samples-per-pixel.
    pub samples_per_pixel: Option<u32>,
    /// When set, replaces every proxy's own ray depth.
    pub max_ray_depth: Option<u32>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            max_samples_per_pixel: -1,
            denoiser_method: DenoiserMethod::None,
            samples_per_pixel: None,
            max_ray_depth: None,
        }
    }
}

impl OverlaySettings {
    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the renderer cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.max_samples_per_pixel < -1 {
            return Err(OverlayError::InvalidSetting {
                name: "max_samples_per_pixel".into(),
                reason: format!("expected -1 or a non-negative count, got {}", self.max_samples_per_pixel),
            });
        }
        if self.samples_per_pixel == Some(0) {
            return Err(OverlayError::InvalidSetting {
                name: "samples_per_pixel".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_ray_depth == Some(0) {
            return Err(OverlayError::InvalidSetting {
                name: "max_ray_depth".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tunables
// ---------------------------------------------------------------------------

/// Runtime values shared between the control threads and the render thread.
///
/// Writes become visible to the next frame that reads them; in-flight work is
/// never affected.
#[derive(Debug)]
pub struct Tunables {
    max_samples_per_pixel: AtomicI32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::from_settings(&OverlaySettings::default())
    }
}

impl Tunables {
    #[must_use]
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        Self {
            max_samples_per_pixel: AtomicI32::new(settings.max_samples_per_pixel),
        }
    }

    /// Sets the samples-per-pixel override. Negative values defer to the view.
    #[inline]
    pub fn set_max_samples_per_pixel(&self, value: i32) {
        self.max_samples_per_pixel.store(value.max(-1), Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn max_samples_per_pixel(&self) -> i32 {
        self.max_samples_per_pixel.load(Ordering::Relaxed)
    }

    /// Applies a `<name> <value>` console command.
    pub fn apply_console_command(&self, command: &str) -> Result<()> {
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();

        if !name.eq_ignore_ascii_case(MAX_SAMPLES_PER_PIXEL_CVAR) {
            return Err(OverlayError::InvalidSetting {
                name: name.to_string(),
                reason: "unknown console variable".into(),
            });
        }

        let raw = parts.next().ok_or_else(|| OverlayError::InvalidSetting {
            name: name.to_string(),
            reason: "missing value".into(),
        })?;
        let value: i32 = raw.parse().map_err(|_| OverlayError::InvalidSetting {
            name: name.to_string(),
            reason: format!("'{raw}' is not an integer"),
        })?;

        log::debug!("{MAX_SAMPLES_PER_PIXEL_CVAR} = {value}");
        self.set_max_samples_per_pixel(value);
        Ok(())
    }
}
