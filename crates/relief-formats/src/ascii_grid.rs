//! ESRI ASCII grid (`.asc`).
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    500000
//! yllcorner    4200000
//! cellsize     30
//! NODATA_value -9999
//! 12 13 14 15
//! ...
//! ```
//!
//! Header keys are case-insensitive and may come in any order. Values
//! follow in row-major order, north row first.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::{elevation, numeric_tokens, parse_real};
use crate::registry::FormatId;
use crate::{DecodeError, DecodeOptions, DecodeWarning, Result};
use relief_grid::{ElevationGrid, NO_DATA_SENTINEL};
use tracing::{debug, warn};

const FORMAT: &str = FormatId::EsriAsciiGrid.as_str();

const MAX_CELLS: usize = 1 << 28;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    x_corner: Option<f64>,
    y_corner: Option<f64>,
    x_center: Option<f64>,
    y_center: Option<f64>,
    cell_size: Option<f64>,
    no_data: Option<f64>,
}

impl Header {
    fn set(&mut self, key: &str, value: f64) -> bool {
        let count = || (value >= 1.0 && value.fract() == 0.0).then_some(value as usize);
        match key.to_ascii_lowercase().as_str() {
            "ncols" => self.ncols = count(),
            "nrows" => self.nrows = count(),
            "xllcorner" => self.x_corner = Some(value),
            "yllcorner" => self.y_corner = Some(value),
            "xllcenter" => self.x_center = Some(value),
            "yllcenter" => self.y_center = Some(value),
            "cellsize" => self.cell_size = Some(value),
            "nodata_value" => self.no_data = Some(value),
            _ => return false,
        }
        true
    }
}

/// Split the text into header and the byte offset where values begin.
fn parse_header(text: &str) -> (Header, usize) {
    let mut header = Header::default();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            if line.trim().is_empty() {
                offset += line.len();
                continue;
            }
            break;
        };
        if key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            match parse_real(value) {
                Some(value) if header.set(key, value) => {
                    offset += line.len();
                    continue;
                }
                _ => {}
            }
        }
        break;
    }
    (header, offset)
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let text = String::from_utf8_lossy(input.buffer);
    let (header, data_offset) = parse_header(&text);

    let (width, height) = match (header.ncols, header.nrows) {
        (Some(w), Some(h)) if w.saturating_mul(h) <= MAX_CELLS => (w, h),
        (Some(w), Some(h)) => {
            return Err(DecodeError::structural(
                FORMAT,
                format!("{}x{} exceeds the cell limit", w, h),
            ))
        }
        _ => return Err(DecodeError::structural(FORMAT, "missing ncols/nrows")),
    };
    let cell = header.cell_size.filter(|c| *c > 0.0).unwrap_or(1.0);
    let no_data = header.no_data.and_then(elevation).unwrap_or(NO_DATA_SENTINEL);

    let mut elevations: Vec<f32> = numeric_tokens(&text[data_offset..])
        .take(width * height)
        .map(|v| elevation(v).unwrap_or(no_data))
        .collect();
    if elevations.is_empty() {
        return Err(DecodeError::EmptyDataset { format: FORMAT });
    }

    let mut warnings = Vec::new();
    let read = elevations.len();
    if read < width * height {
        warn!("ESRI grid: {} of {} values present, padding with no-data", read, width * height);
        elevations.resize(width * height, no_data);
        warnings.push(DecodeWarning::TruncatedData {
            read,
            expected: width * height,
        });
    }

    let x_left = match (header.x_corner, header.x_center) {
        (Some(x), _) => x,
        (None, Some(x)) => x - cell / 2.0,
        (None, None) => 0.0,
    };
    let y_bottom = match (header.y_corner, header.y_center) {
        (Some(y), _) => y,
        (None, Some(y)) => y - cell / 2.0,
        (None, None) => 0.0,
    };

    debug!(
        "ESRI grid: {}x{}, cell {}, lower-left ({}, {})",
        width, height, cell, x_left, y_bottom
    );

    let grid = ElevationGrid::builder(width, height, elevations)
        .no_data(no_data)
        .pixel_size(cell, -cell)
        .origin(x_left, y_bottom + cell * height as f64)
        .build()?;

    Ok(Decoded { grid, warnings })
}
