//! # relief-surface
//!
//! Slope and aspect textures for an [`ElevationGrid`](relief_grid::ElevationGrid).
//!
//! [`derive_surface`] resamples the grid to a target resolution and shades
//! every texel from the Horn gradient of the nearest source cell:
//!
//! - **Slope** is grayscale, black when flat and white at
//!   [`SurfaceOptions::max_slope_degrees`] and beyond.
//! - **Aspect** is a hue wheel at fixed saturation and lightness. Cells
//!   flatter than [`SurfaceOptions::flat_threshold`] are neutral gray.
//!
//! No-data cells render fully transparent. The source grid is never
//! modified.
//!
//! ```
//! use relief_grid::ElevationGrid;
//! use relief_surface::{derive_surface, SurfaceMode};
//!
//! let grid = ElevationGrid::builder(3, 3, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]).build()?;
//! let texture = derive_surface(&grid, 64, SurfaceMode::Slope)?;
//! assert_eq!((texture.width, texture.height), (64, 64));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod color;
mod derive;
mod error;
mod options;

pub use color::{hsl, slope_gray, Rgba, NEUTRAL, TRANSPARENT};
pub use derive::{derive_surface, derive_surface_with, sample_at, texture_dimensions, SurfaceSample, SurfaceTexture};
pub use error::SurfaceError;
pub use options::{SurfaceMode, SurfaceOptions};

/// Result type for surface derivation.
pub type Result<T> = std::result::Result<T, SurfaceError>;
