//! Error Types
//!
//! This module defines the error types used by the overlay.
//!
//! # Overview
//!
//! The per-frame path never returns errors: missing data, resizes and absent
//! host modules are handled where they are detected. [`OverlayError`] only
//! surfaces at construction and configuration boundaries:
//! - Proxy registration contract violations
//! - Invalid proxy transforms
//! - Settings and console-variable parsing
//! - Render thread startup and shutdown
//!
//! # Usage
//!
//! ```rust,ignore
//! use vdb_overlay::errors::Result;
//!
//! fn load_settings(json: &str) -> Result<OverlaySettings> {
//!     OverlaySettings::from_json_str(json)
//! }
//! ```

use thiserror::Error;

use crate::proxy::ProxyId;

/// The main error type for the overlay.
#[derive(Error, Debug)]
pub enum OverlayError {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// A proxy with the same id is already registered.
    #[error("Volume proxy {0:?} is already registered")]
    DuplicateProxy(ProxyId),

    // ========================================================================
    // Proxy Data Errors
    // ========================================================================
    /// A transform matrix could not be inverted (zero or near-zero scale).
    #[error("Degenerate transform for {context}: determinant {determinant}")]
    DegenerateTransform {
        /// Which transform was rejected
        context: &'static str,
        /// Determinant of the rejected matrix
        determinant: f32,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A setting or console variable had an unusable value.
    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// Setting or console variable name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The denoiser method name is not recognised.
    #[error("Unknown denoiser method: {0}")]
    UnknownDenoiserMethod(String),

    /// JSON settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Config(#[from] serde_json::Error),

    // ========================================================================
    // Threading Errors
    // ========================================================================
    /// The render thread is gone; the command could not be delivered.
    #[error("Render thread disconnected")]
    RenderThreadDisconnected,

    /// The render thread could not be started.
    #[error("Failed to spawn render thread: {0}")]
    RenderThreadSpawn(#[from] std::io::Error),
}

/// Alias for `Result<T, OverlayError>`.
pub type Result<T> = std::result::Result<T, OverlayError>;
