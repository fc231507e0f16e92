//! # relief-grid
//!
//! The canonical elevation grid every relief decoder produces.
//!
//! An [`ElevationGrid`] is a row-major raster of `f32` heights with an
//! optional no-data sentinel, a signed pixel size and an upper-left origin.
//! It is validated once on construction and immutable afterwards, so it can
//! be handed to any number of consumers without copying or locking.
//!
//! ```
//! use relief_grid::ElevationGrid;
//!
//! let grid = ElevationGrid::builder(2, 2, vec![10.0, 20.0, 30.0, 40.0])
//!     .pixel_size(30.0, -30.0)
//!     .origin(500_000.0, 4_200_000.0)
//!     .build()?;
//! assert_eq!(grid.get(1, 0), Some(20.0));
//! # Ok::<(), relief_grid::GridError>(())
//! ```

mod error;
mod grid;

pub use error::GridError;
pub use grid::{CrsHint, ElevationGrid, GridBuilder, GridOrigin, GridStats, PixelSize, SampleKind};

/// Result type for grid construction.
pub type Result<T> = std::result::Result<T, GridError>;

/// Canonical no-data sentinel used by the fixed-layout terrain formats.
pub const NO_DATA_SENTINEL: f32 = -32767.0;

/// A scattered 3D sample, alive only while a point source is being gridded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    /// Easting or longitude.
    pub x: f64,
    /// Northing or latitude.
    pub y: f64,
    /// Elevation.
    pub z: f64,
}

impl PointRecord {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
