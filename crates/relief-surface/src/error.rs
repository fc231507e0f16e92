//! Error types for surface derivation.

use thiserror::Error;

/// Errors that can occur when deriving a surface texture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// A zero-sized texture was requested.
    #[error("Target resolution must be at least 1")]
    ZeroResolution,

    /// The RGBA buffer size does not fit in memory addressing.
    #[error("Texture of {width}x{height} texels is too large")]
    TextureTooLarge { width: usize, height: usize },
}
