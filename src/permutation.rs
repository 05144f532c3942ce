//! Volume Shader Permutations
//!
//! The volume pixel shader is compiled once per combination of two feature
//! switches. The overlay only selects the variant; the host maps each variant
//! to its precompiled program.
//!
//! | Variant                 | `PATH_TRACING` | `USE_TEMPERATURE` |
//! |-------------------------|----------------|-------------------|
//! | `Raymarch`              | 0              | 0                 |
//! | `RaymarchTemperature`   | 0              | 1                 |
//! | `PathTrace`             | 1              | 0                 |
//! | `PathTraceTemperature`  | 1              | 1                 |

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum VolumePermutation {
    Raymarch = 0,
    RaymarchTemperature = 1,
    PathTrace = 2,
    PathTraceTemperature = 3,
}

impl VolumePermutation {
    pub const ALL: [Self; 4] = [
        Self::Raymarch,
        Self::RaymarchTemperature,
        Self::PathTrace,
        Self::PathTraceTemperature,
    ];

    #[inline]
    #[must_use]
    pub const fn select(path_tracing: bool, use_temperature: bool) -> Self {
        match (path_tracing, use_temperature) {
            (false, false) => Self::Raymarch,
            (false, true) => Self::RaymarchTemperature,
            (true, false) => Self::PathTrace,
            (true, true) => Self::PathTraceTemperature,
        }
    }

    #[inline]
    #[must_use]
    pub const fn path_tracing(self) -> bool {
        matches!(self, Self::PathTrace | Self::PathTraceTemperature)
    }

    #[inline]
    #[must_use]
    pub const fn use_temperature(self) -> bool {
        matches!(self, Self::RaymarchTemperature | Self::PathTraceTemperature)
    }

    /// Dense index into a per-variant table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Shader defines for this variant.
    #[must_use]
    pub fn defines(self) -> [(&'static str, &'static str); 2] {
        let flag = |on: bool| if on { "1" } else { "0" };
        [
            ("PATH_TRACING", flag(self.path_tracing())),
            ("USE_TEMPERATURE", flag(self.use_temperature())),
        ]
    }
}
