//! Error types for the grid crate.

use thiserror::Error;

/// Errors raised when an [`ElevationGrid`](crate::ElevationGrid) would violate its invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    /// Width or height is zero.
    #[error("Grid dimensions must be positive, got {width}x{height}")]
    EmptyDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// The elevation buffer does not hold exactly `width * height` values.
    #[error("Elevation buffer has {actual} values, expected {expected}")]
    LengthMismatch {
        /// `width * height`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// A pixel size component is zero or not finite.
    #[error("Pixel size must be finite and nonzero, got ({x}, {y})")]
    ZeroPixelSize {
        /// Horizontal step.
        x: f64,
        /// Vertical step.
        y: f64,
    },

    /// A cell holds NaN or infinity and is not the no-data sentinel.
    #[error("Non-finite elevation at index {index}")]
    NonFiniteValue {
        /// Flat index of the offending cell.
        index: usize,
    },

    /// The no-data sentinel itself is not a finite number.
    #[error("No-data sentinel must be finite")]
    NonFiniteSentinel,
}
