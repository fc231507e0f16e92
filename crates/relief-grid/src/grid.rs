//! The canonical elevation grid.

use crate::{GridError, Result};
use serde::Serialize;

/// Tolerance used when comparing a cell against the no-data sentinel.
const NO_DATA_TOLERANCE: f32 = 0.001;

/// Signed size of one cell in ground units.
///
/// `y` is the row step: north-up grids carry a negative value, the same
/// convention world files and GeoTIFF geotransforms use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelSize {
    /// Column step.
    pub x: f64,
    /// Row step.
    pub y: f64,
}

/// Ground coordinate of the upper-left corner of the upper-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridOrigin {
    /// Easting or longitude.
    pub x: f64,
    /// Northing or latitude.
    pub y: f64,
}

/// Best-effort guess at the coordinate reference system of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrsHint {
    /// Longitude/latitude in decimal degrees.
    Geographic,
    /// A UTM-like projected system, zone when the source declares one.
    Utm {
        /// UTM zone number.
        zone: Option<u8>,
    },
}

/// What the cell values actually measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Elevations read from a genuine elevation product.
    #[default]
    Measured,
    /// Image luminance standing in for elevation. Only an approximation of
    /// terrain shape; values are not heights.
    LuminanceSurrogate,
}

/// A regularly spaced elevation raster in row-major order (north to south,
/// west to east).
///
/// Grids are built once through [`GridBuilder`] and never mutated afterwards.
/// Every cell is either finite or equal to the no-data sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevationGrid {
    width: usize,
    height: usize,
    elevations: Vec<f32>,
    no_data_value: Option<f32>,
    pixel_size: PixelSize,
    origin: GridOrigin,
    crs_hint: Option<CrsHint>,
    kind: SampleKind,
}

/// Summary statistics over the valid (non-sentinel) cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridStats {
    /// Lowest valid elevation.
    pub min: f32,
    /// Highest valid elevation.
    pub max: f32,
    /// Mean of the valid elevations.
    pub mean: f64,
    /// Number of valid cells.
    pub valid_count: usize,
}

impl ElevationGrid {
    /// Start building a grid from its dimensions and row-major values.
    pub fn builder(width: usize, height: usize, elevations: Vec<f32>) -> GridBuilder {
        GridBuilder {
            width,
            height,
            elevations,
            no_data_value: None,
            pixel_size: PixelSize { x: 1.0, y: -1.0 },
            origin: GridOrigin { x: 0.0, y: 0.0 },
            crs_hint: None,
            kind: SampleKind::Measured,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major cell values.
    pub fn elevations(&self) -> &[f32] {
        &self.elevations
    }

    /// The no-data sentinel, if the source declares one.
    pub fn no_data_value(&self) -> Option<f32> {
        self.no_data_value
    }

    /// Signed cell size.
    pub fn pixel_size(&self) -> PixelSize {
        self.pixel_size
    }

    /// Upper-left corner.
    pub fn origin(&self) -> GridOrigin {
        self.origin
    }

    /// Coordinate system guess.
    pub fn crs_hint(&self) -> Option<CrsHint> {
        self.crs_hint
    }

    /// What the values measure.
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// True when the values are an image-luminance approximation.
    pub fn is_surrogate(&self) -> bool {
        self.kind == SampleKind::LuminanceSurrogate
    }

    /// Whether `value` matches the no-data sentinel.
    pub fn is_no_data(&self, value: f32) -> bool {
        match self.no_data_value {
            Some(nodata) => (value - nodata).abs() < NO_DATA_TOLERANCE,
            None => false,
        }
    }

    /// Raw cell value, including sentinels. `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.elevations[row * self.width + col])
    }

    /// Cell value with no-data cells reported as `None`.
    pub fn value_at(&self, col: usize, row: usize) -> Option<f32> {
        self.get(col, row).filter(|v| !self.is_no_data(*v))
    }

    /// Cell value with coordinates clamped to the grid edges.
    pub fn get_clamped(&self, col: isize, row: isize) -> f32 {
        let col = col.clamp(0, self.width as isize - 1) as usize;
        let row = row.clamp(0, self.height as isize - 1) as usize;
        self.elevations[row * self.width + col]
    }

    /// Min/max/mean over the valid cells, `None` when every cell is no-data.
    pub fn stats(&self) -> Option<GridStats> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid_count = 0usize;

        for &v in self.elevations.iter().filter(|v| !self.is_no_data(**v)) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid_count += 1;
        }

        if valid_count == 0 {
            return None;
        }

        Some(GridStats {
            min,
            max,
            mean: sum / valid_count as f64,
            valid_count,
        })
    }

    /// Ground extent as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let x0 = self.origin.x;
        let y0 = self.origin.y;
        let x1 = x0 + self.pixel_size.x * self.width as f64;
        let y1 = y0 + self.pixel_size.y * self.height as f64;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Validating constructor for [`ElevationGrid`].
#[derive(Debug, Clone)]
pub struct GridBuilder {
    width: usize,
    height: usize,
    elevations: Vec<f32>,
    no_data_value: Option<f32>,
    pixel_size: PixelSize,
    origin: GridOrigin,
    crs_hint: Option<CrsHint>,
    kind: SampleKind,
}

impl GridBuilder {
    /// Declare the no-data sentinel.
    pub fn no_data(mut self, value: f32) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Set the signed cell size.
    pub fn pixel_size(mut self, x: f64, y: f64) -> Self {
        self.pixel_size = PixelSize { x, y };
        self
    }

    /// Set the upper-left corner.
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = GridOrigin { x, y };
        self
    }

    /// Attach a CRS guess.
    pub fn crs(mut self, hint: Option<CrsHint>) -> Self {
        self.crs_hint = hint;
        self
    }

    /// Mark what the values measure.
    pub fn kind(mut self, kind: SampleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Validate and produce the grid.
    pub fn build(self) -> Result<ElevationGrid> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::EmptyDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let expected = self.width * self.height;
        if self.elevations.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                actual: self.elevations.len(),
            });
        }

        let PixelSize { x, y } = self.pixel_size;
        if x == 0.0 || y == 0.0 || !x.is_finite() || !y.is_finite() {
            return Err(GridError::ZeroPixelSize { x, y });
        }

        if let Some(nodata) = self.no_data_value {
            if !nodata.is_finite() {
                return Err(GridError::NonFiniteSentinel);
            }
        }

        if let Some(index) = self.elevations.iter().position(|v| !v.is_finite()) {
            return Err(GridError::NonFiniteValue { index });
        }

        Ok(ElevationGrid {
            width: self.width,
            height: self.height,
            elevations: self.elevations,
            no_data_value: self.no_data_value,
            pixel_size: self.pixel_size,
            origin: self.origin,
            crs_hint: self.crs_hint,
            kind: self.kind,
        })
    }
}
