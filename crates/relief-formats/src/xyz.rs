//! ASCII XYZ point-list decoder.
//!
//! One `X Y Z` triple per line, separated by whitespace, commas or
//! semicolons. Lines starting with `#` or `/` are comments.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::{elevation, parse_real};
use crate::registry::FormatId;
use crate::resample::{grid_points, CellAccumulator, PointBounds};
use crate::usgs_dem::near_square;
use crate::{DecodeError, DecodeOptions, DecodeWarning, Result};
use relief_grid::{ElevationGrid, PointRecord};
use std::collections::HashSet;
use tracing::{debug, warn};

const FORMAT: &str = FormatId::AsciiXyz.as_str();

/// Largest lattice allocated directly; beyond it the points are resampled.
const MAX_CELLS: usize = 1 << 28;

/// Parse every valid triple. Lines with fewer than three numbers, or with
/// an elevation outside the `f32` range, are skipped.
pub fn parse_points(text: &str) -> Vec<PointRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('/'))
        .filter_map(|line| {
            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|t| !t.is_empty())
                .map(parse_real);
            let x = fields.next()??;
            let y = fields.next()??;
            let z = fields.next()??;
            elevation(z)?;
            Some(PointRecord::new(x, y, z))
        })
        .collect()
}

fn distinct(values: impl Iterator<Item = f64>) -> usize {
    values.map(f64::to_bits).collect::<HashSet<_>>().len()
}

pub(crate) fn decode(input: &DecodeInput<'_>, options: &DecodeOptions) -> Result<Decoded> {
    let text = String::from_utf8_lossy(input.buffer);
    let points = parse_points(&text);
    let bounds = PointBounds::of(&points).ok_or(DecodeError::EmptyDataset { format: FORMAT })?;

    let columns = distinct(points.iter().map(|p| p.x));
    let rows = distinct(points.iter().map(|p| p.y));
    debug!(
        "XYZ: {} points, {} distinct X, {} distinct Y",
        points.len(),
        columns,
        rows
    );

    if columns > 1 && rows > 1 {
        if columns.saturating_mul(rows) > MAX_CELLS {
            warn!(
                "XYZ: {}x{} lattice exceeds the cell limit, resampling {} points",
                columns,
                rows,
                points.len()
            );
            return Ok(Decoded::clean(grid_points(FORMAT, &points, options)?));
        }
        regular(&points, &bounds, columns, rows, options)
    } else {
        reshaped(&points)
    }
}

/// Place each point in its nearest cell of a `columns x rows` lattice.
fn regular(
    points: &[PointRecord],
    bounds: &PointBounds,
    width: usize,
    height: usize,
    options: &DecodeOptions,
) -> Result<Decoded> {
    let span_x = bounds.width();
    let span_y = bounds.height();

    let mut cells = CellAccumulator::new(width, height);
    for p in points {
        let col = ((p.x - bounds.min_x) / span_x * (width - 1) as f64).round() as usize;
        let row = ((bounds.max_y - p.y) / span_y * (height - 1) as f64).round() as usize;
        cells.add(col, row, p.z);
    }
    let elevations = cells.finish(options.fill_passes);

    let grid = ElevationGrid::builder(width, height, elevations)
        .pixel_size(span_x / (width - 1) as f64, -span_y / (height - 1) as f64)
        .origin(bounds.min_x, bounds.max_y)
        .build()?;

    Ok(Decoded::clean(grid))
}

/// Not a lattice: lay the elevations out in file order on a near-square grid.
fn reshaped(points: &[PointRecord]) -> Result<Decoded> {
    let (width, height) = near_square(points.len());
    warn!(
        "XYZ: points do not form a lattice, reshaping {} values into {}x{}",
        points.len(),
        width,
        height
    );

    let mut elevations = vec![0.0f32; width * height];
    for (cell, p) in elevations.iter_mut().zip(points) {
        *cell = p.z as f32;
    }

    let grid = ElevationGrid::builder(width, height, elevations).build()?;
    Ok(Decoded {
        grid,
        warnings: vec![DecodeWarning::DimensionFallback {
            values: points.len(),
            width,
            height,
        }],
    })
}
