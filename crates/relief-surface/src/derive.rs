//! Slope and aspect from a 3x3 neighbourhood using Horn's method.
//!
//! Neighbourhood labels, row-major with north up:
//!
//! ```text
//! z1 z2 z3
//! z4 z5 z6
//! z7 z8 z9
//! ```
//!
//! `dz/dx = ((z3 + 2z6 + z9) - (z1 + 2z4 + z7)) / 8`
//! `dz/dy = ((z7 + 2z8 + z9) - (z1 + 2z2 + z3)) / 8`
//!
//! Gradients are in elevation units per source cell.

use crate::color::{hsl, slope_gray, Rgba, NEUTRAL, TRANSPARENT};
use crate::{Result, SurfaceError, SurfaceMode, SurfaceOptions};
use rayon::prelude::*;
use relief_grid::ElevationGrid;
use std::f64::consts::PI;
use tracing::debug;

/// Surface properties of one source cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Steepness, `atan(|gradient|)`.
    pub slope_radians: f64,
    /// Downslope direction, degrees clockwise from north in `[0, 360)`.
    pub aspect_degrees: f64,
}

impl SurfaceSample {
    /// Whether the slope is too small for the aspect to mean anything.
    pub fn is_flat(&self, threshold: f64) -> bool {
        self.slope_radians < threshold
    }
}

/// An RGBA8 texture in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceTexture {
    pub width: usize,
    pub height: usize,
    /// `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

impl SurfaceTexture {
    /// Texel at `(x, y)`, `None` outside the texture.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }
}

/// Horn slope and aspect at `(col, row)`.
///
/// Neighbours beyond the grid edge are clamped to the nearest edge cell;
/// no-data neighbours take the centre value. `None` when the cell is
/// outside the grid or is itself no-data.
pub fn sample_at(grid: &ElevationGrid, col: usize, row: usize) -> Option<SurfaceSample> {
    let centre = grid.value_at(col, row)?;
    let (c, r) = (col as isize, row as isize);

    let z = |dc: isize, dr: isize| -> f64 {
        let v = grid.get_clamped(c + dc, r + dr);
        if grid.is_no_data(v) {
            centre as f64
        } else {
            v as f64
        }
    };

    let (z1, z2, z3) = (z(-1, -1), z(0, -1), z(1, -1));
    let (z4, z6) = (z(-1, 0), z(1, 0));
    let (z7, z8, z9) = (z(-1, 1), z(0, 1), z(1, 1));

    let dz_dx = ((z3 + 2.0 * z6 + z9) - (z1 + 2.0 * z4 + z7)) / 8.0;
    let dz_dy = ((z7 + 2.0 * z8 + z9) - (z1 + 2.0 * z2 + z3)) / 8.0;

    let slope_radians = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();
    let aspect_degrees = ((-dz_dy).atan2(dz_dx) * 180.0 / PI + 360.0) % 360.0;

    Some(SurfaceSample {
        slope_radians,
        aspect_degrees,
    })
}

/// Texture dimensions: the longer grid side maps to `target`.
pub fn texture_dimensions(grid: &ElevationGrid, target: usize) -> (usize, usize) {
    let (w, h) = (grid.width(), grid.height());
    if w >= h {
        let short = ((target as f64 * h as f64 / w as f64).round() as usize).max(1);
        (target, short)
    } else {
        let short = ((target as f64 * w as f64 / h as f64).round() as usize).max(1);
        (short, target)
    }
}

/// Nearest source index for texel `t` of `out` texels over `len` cells,
/// aligning texel centres with cell centres.
fn source_index(t: usize, out: usize, len: usize) -> usize {
    let pos = (t as f64 + 0.5) * len as f64 / out as f64;
    (pos.floor() as usize).min(len - 1)
}

fn texel(sample: Option<SurfaceSample>, mode: SurfaceMode, options: &SurfaceOptions) -> Rgba {
    let Some(sample) = sample else {
        return TRANSPARENT;
    };
    match mode {
        SurfaceMode::Slope => slope_gray(sample.slope_radians, options.max_slope_degrees),
        SurfaceMode::Aspect if sample.is_flat(options.flat_threshold) => NEUTRAL,
        SurfaceMode::Aspect => hsl(
            sample.aspect_degrees,
            options.aspect_saturation,
            options.aspect_lightness,
        ),
    }
}

/// Render a slope or aspect texture with default colour options.
///
/// The grid is only read. Identical inputs always give byte-identical
/// output, whatever the thread count.
pub fn derive_surface(grid: &ElevationGrid, target_resolution: usize, mode: SurfaceMode) -> Result<SurfaceTexture> {
    derive_surface_with(grid, target_resolution, mode, &SurfaceOptions::default())
}

/// Render a texture with explicit colour options.
pub fn derive_surface_with(
    grid: &ElevationGrid,
    target_resolution: usize,
    mode: SurfaceMode,
    options: &SurfaceOptions,
) -> Result<SurfaceTexture> {
    if target_resolution == 0 {
        return Err(SurfaceError::ZeroResolution);
    }

    let (width, height) = texture_dimensions(grid, target_resolution);
    debug!(
        "Deriving {} texture {}x{} from {}x{} grid",
        mode,
        width,
        height,
        grid.width(),
        grid.height()
    );

    let len = width
        .checked_mul(height)
        .and_then(|texels| texels.checked_mul(4))
        .ok_or(SurfaceError::TextureTooLarge { width, height })?;

    let mut rgba = vec![0u8; len];
    rgba.par_chunks_mut(width * 4).enumerate().for_each(|(y, line)| {
        let row = source_index(y, height, grid.height());
        for (x, out) in line.chunks_exact_mut(4).enumerate() {
            let col = source_index(x, width, grid.width());
            out.copy_from_slice(&texel(sample_at(grid, col, row), mode, options));
        }
    });

    Ok(SurfaceTexture { width, height, rgba })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use relief_grid::NO_DATA_SENTINEL;

    fn grid(width: usize, height: usize, values: Vec<f32>) -> ElevationGrid {
        ElevationGrid::builder(width, height, values)
            .no_data(NO_DATA_SENTINEL)
            .build()
            .unwrap()
    }

    #[test]
    fn test_flat_is_neutral() {
        let flat = grid(3, 3, vec![100.0; 9]);
        let sample = sample_at(&flat, 1, 1).unwrap();
        assert_relative_eq!(sample.slope_radians, 0.0);
        assert!(sample.is_flat(0.01));

        let texture = derive_surface(&flat, 3, SurfaceMode::Aspect).unwrap();
        assert!(texture.rgba.chunks(4).all(|px| px == NEUTRAL));
    }

    #[test]
    fn test_east_rising_plane() {
        // z = 8 * col, so dz/dx is 8 per cell.
        let plane = grid(3, 3, (0..9).map(|i| (i % 3) as f32 * 8.0).collect());
        let sample = sample_at(&plane, 1, 1).unwrap();
        assert_relative_eq!(sample.slope_radians, 8f64.atan(), epsilon = 1e-12);
        // atan2(-0, 8) = 0: the formula's zero direction for a +x gradient.
        assert_relative_eq!(sample.aspect_degrees, 0.0);
    }

    #[test]
    fn test_south_rising_plane() {
        // Rows increase southward, so z grows with row.
        let plane = grid(3, 3, (0..9).map(|i| (i / 3) as f32).collect());
        let sample = sample_at(&plane, 1, 1).unwrap();
        assert_relative_eq!(sample.aspect_degrees, 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_edges_are_clamped() {
        let plane = grid(3, 3, (0..9).map(|i| (i % 3) as f32).collect());
        let corner = sample_at(&plane, 0, 0).unwrap();
        // Clamped left column repeats column 0: dz/dx = (4*1 - 4*0) / 8.
        assert_relative_eq!(corner.slope_radians, 0.5f64.atan(), epsilon = 1e-12);
    }

    #[test]
    fn test_no_data_centre_is_transparent() {
        let holes = grid(2, 1, vec![NO_DATA_SENTINEL, 5.0]);
        assert!(sample_at(&holes, 0, 0).is_none());
        let texture = derive_surface(&holes, 2, SurfaceMode::Slope).unwrap();
        assert_eq!(texture.pixel(0, 0), Some(TRANSPARENT));
        assert_eq!(texture.pixel(1, 0).map(|p| p[3]), Some(255));
    }

    #[test]
    fn test_no_data_neighbour_uses_centre() {
        let mut values = vec![10.0; 9];
        values[0] = NO_DATA_SENTINEL;
        let sample = sample_at(&grid(3, 3, values), 1, 1).unwrap();
        assert_relative_eq!(sample.slope_radians, 0.0);
    }

    #[test]
    fn test_dimensions_keep_aspect() {
        let wide = grid(200, 100, vec![0.0; 20_000]);
        assert_eq!(texture_dimensions(&wide, 64), (64, 32));
        let tall = grid(1, 50, vec![0.0; 50]);
        assert_eq!(texture_dimensions(&tall, 10), (1, 10));
    }

    #[test]
    fn test_zero_resolution() {
        let g = grid(2, 2, vec![0.0; 4]);
        assert_eq!(
            derive_surface(&g, 0, SurfaceMode::Slope),
            Err(SurfaceError::ZeroResolution)
        );
    }

    #[test]
    fn test_oversized_texture_is_rejected() {
        let g = grid(2, 2, vec![0.0; 4]);
        assert_eq!(
            derive_surface(&g, usize::MAX, SurfaceMode::Slope),
            Err(SurfaceError::TextureTooLarge {
                width: usize::MAX,
                height: usize::MAX
            })
        );
    }

    #[test]
    fn test_source_index_centres() {
        assert_eq!(source_index(0, 4, 2), 0);
        assert_eq!(source_index(3, 4, 2), 1);
        assert_eq!(source_index(1, 2, 4), 3);
        assert_eq!(source_index(0, 1, 5), 2);
    }
}
