//! USGS ASCII DEM decoder.
//!
//! ## Record A layout (first 1024 bytes)
//!
//! | Offset  | Width | Field                                         |
//! |---------|-------|-----------------------------------------------|
//! | 0       | 40    | File name                                     |
//! | 144     | 6     | DEM level code                                |
//! | 150     | 6     | Elevation pattern code                        |
//! | 156     | 6     | Planimetric reference (0 geo, 1 UTM, 2 state) |
//! | 162     | 6     | Zone                                          |
//! | 528     | 6     | Ground unit (0 rad, 1 ft, 2 m, 3 arc-sec)     |
//! | 534     | 6     | Elevation unit (1 ft, 2 m)                    |
//! | 546     | 192   | Four corner pairs SW, NW, NE, SE (D24.15)     |
//! | 816     | 36    | Resolution x, y, z (E12.6)                    |
//! | 852     | 12    | Rows, columns (I6)                            |
//!
//! Elevations follow as whitespace-separated numbers and are consumed
//! sequentially in row-major order.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::{elevation, numeric_tokens, parse_real, ByteView, Field};
use crate::registry::FormatId;
use crate::sexagesimal::{has_hemisphere, parse_dms};
use crate::{DecodeError, DecodeOptions, DecodeWarning, Result};
use relief_grid::{CrsHint, ElevationGrid, NO_DATA_SENTINEL};
use tracing::{debug, warn};

const FORMAT: &str = FormatId::UsgsDem.as_str();

/// Size of the fixed header record.
pub const HEADER_LEN: usize = 1024;

/// Largest grid a header may declare before it is treated as corrupt.
const MAX_DECLARED_CELLS: usize = 1 << 28;

const FEET_TO_METERS: f64 = 0.3048;

const FILE_NAME: Field = Field::new("file name", 0, 40);
const DEM_LEVEL: Field = Field::new("DEM level", 144, 6);
const PATTERN: Field = Field::new("elevation pattern", 150, 6);
const PLANIMETRIC: Field = Field::new("planimetric reference", 156, 6);
const ZONE: Field = Field::new("zone", 162, 6);
const GROUND_UNIT: Field = Field::new("ground unit", 528, 6);
const ELEVATION_UNIT: Field = Field::new("elevation unit", 534, 6);
const SW_X: Field = Field::new("south-west x", 546, 24);
const SW_Y: Field = Field::new("south-west y", 570, 24);
const NE_X: Field = Field::new("north-east x", 642, 24);
const NE_Y: Field = Field::new("north-east y", 666, 24);
const RES_X: Field = Field::new("x resolution", 816, 12);
const RES_Y: Field = Field::new("y resolution", 828, 12);
const RES_Z: Field = Field::new("z resolution", 840, 12);
const ROWS: Field = Field::new("rows", 852, 6);
const COLUMNS: Field = Field::new("columns", 858, 6);

const GROUND_UNIT_ARC_SECONDS: i64 = 3;
const ELEVATION_UNIT_FEET: i64 = 1;

/// Header fields the decoder cares about.
#[derive(Debug, Clone, PartialEq)]
struct DemHeader {
    name: String,
    level: Option<i64>,
    pattern: Option<i64>,
    planimetric: Option<i64>,
    zone: Option<i64>,
    ground_unit: Option<i64>,
    elevation_unit: Option<i64>,
    south_west: (Option<f64>, Option<f64>),
    north_east: (Option<f64>, Option<f64>),
    resolution: (Option<f64>, Option<f64>, Option<f64>),
    rows: Option<i64>,
    columns: Option<i64>,
}

impl DemHeader {
    fn parse(view: &ByteView<'_>) -> Result<Self> {
        if view.len() < HEADER_LEN {
            return Err(DecodeError::structural(
                FORMAT,
                format!("header is {} bytes, expected {}", view.len(), HEADER_LEN),
            ));
        }

        let name = view.text(FILE_NAME).unwrap_or_default();
        if name.is_empty() {
            return Err(DecodeError::structural(FORMAT, "file name field is blank"));
        }

        Ok(DemHeader {
            name: name.to_string(),
            level: view.int(DEM_LEVEL),
            pattern: view.int(PATTERN),
            planimetric: view.int(PLANIMETRIC),
            zone: view.int(ZONE),
            ground_unit: view.int(GROUND_UNIT),
            elevation_unit: view.int(ELEVATION_UNIT),
            south_west: (coordinate(view, SW_X), coordinate(view, SW_Y)),
            north_east: (coordinate(view, NE_X), coordinate(view, NE_Y)),
            resolution: (view.real(RES_X), view.real(RES_Y), view.real(RES_Z)),
            rows: view.int(ROWS),
            columns: view.int(COLUMNS),
        })
    }

    /// Declared `(width, height)` when both counts are usable.
    fn dimensions(&self) -> Option<(usize, usize)> {
        let rows = usize::try_from(self.rows?).ok().filter(|r| *r > 0)?;
        let cols = usize::try_from(self.columns?).ok().filter(|c| *c > 0)?;
        let cells = rows.checked_mul(cols)?;
        (cells <= MAX_DECLARED_CELLS).then_some((cols, rows))
    }

    /// Ground coordinates are arc-seconds and need converting to degrees.
    fn in_arc_seconds(&self) -> bool {
        self.planimetric == Some(0) && self.ground_unit == Some(GROUND_UNIT_ARC_SECONDS)
    }

    fn crs_hint(&self) -> Option<CrsHint> {
        match self.planimetric {
            Some(0) => Some(CrsHint::Geographic),
            Some(1) => Some(CrsHint::Utm {
                zone: self.zone.and_then(|z| u8::try_from(z.unsigned_abs()).ok()),
            }),
            _ => None,
        }
    }

    /// Multiplier from stored integers to metres.
    fn vertical_scale(&self) -> f64 {
        let mut scale = match self.resolution.2 {
            Some(z) if z > 0.0 => z,
            _ => 1.0,
        };
        if self.elevation_unit == Some(ELEVATION_UNIT_FEET) {
            scale *= FEET_TO_METERS;
        }
        scale
    }
}

/// Parse a corner coordinate stored either as packed DMS with a hemisphere
/// letter or as a (possibly Fortran-formatted) decimal.
fn coordinate(view: &ByteView<'_>, field: Field) -> Option<f64> {
    let text = view.text(field)?;
    if has_hemisphere(text) {
        parse_dms(text)
    } else {
        parse_real(text)
    }
}

/// Near-square `(width, height)` for `n` values.
pub(crate) fn near_square(n: usize) -> (usize, usize) {
    let width = ((n as f64).sqrt().ceil() as usize).max(1);
    let height = n.div_ceil(width).max(1);
    (width, height)
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let view = ByteView::new(input.buffer);
    let header = DemHeader::parse(&view)?;

    debug!(
        "USGS DEM '{}': level {:?}, pattern {:?}, planimetric {:?}, {:?} rows x {:?} columns",
        header.name, header.level, header.pattern, header.planimetric, header.rows, header.columns
    );

    let body = String::from_utf8_lossy(&input.buffer[HEADER_LEN..]);
    let mut warnings = Vec::new();

    let (width, height, mut elevations) = match header.dimensions() {
        Some((width, height)) => {
            let mut elevations = vec![0.0f32; width * height];
            for (cell, value) in elevations.iter_mut().zip(numeric_tokens(&body)) {
                *cell = elevation(value).unwrap_or(NO_DATA_SENTINEL);
            }
            (width, height, elevations)
        }
        None => {
            let values: Vec<f32> = numeric_tokens(&body)
                .map(|v| elevation(v).unwrap_or(NO_DATA_SENTINEL))
                .collect();
            if values.is_empty() {
                return Err(DecodeError::EmptyDataset { format: FORMAT });
            }
            let (width, height) = near_square(values.len());
            warn!(
                "USGS DEM '{}': row/column counts unusable, reshaping {} values into {}x{}",
                header.name,
                values.len(),
                width,
                height
            );
            warnings.push(DecodeWarning::DimensionFallback {
                values: values.len(),
                width,
                height,
            });
            let mut elevations = values;
            elevations.resize(width * height, 0.0);
            (width, height, elevations)
        }
    };

    let scale = header.vertical_scale();
    if scale != 1.0 {
        for value in elevations.iter_mut().filter(|v| **v != NO_DATA_SENTINEL) {
            *value = elevation(*value as f64 * scale).unwrap_or(NO_DATA_SENTINEL);
        }
    }

    let degree_factor = if header.in_arc_seconds() { 1.0 / 3600.0 } else { 1.0 };
    let pixel_x = match header.resolution.0 {
        Some(x) if x > 0.0 => x * degree_factor,
        _ => 1.0,
    };
    let pixel_y = match header.resolution.1 {
        Some(y) if y > 0.0 => -y * degree_factor,
        _ => -1.0,
    };
    let origin_x = header.south_west.0.map_or(0.0, |x| x * degree_factor);
    let origin_y = header.north_east.1.map_or(0.0, |y| y * degree_factor);

    let grid = ElevationGrid::builder(width, height, elevations)
        .no_data(NO_DATA_SENTINEL)
        .pixel_size(pixel_x, pixel_y)
        .origin(origin_x, origin_y)
        .crs(header.crs_hint())
        .build()?;

    Ok(Decoded { grid, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Build a 1024-byte Record A with right-aligned fields.
    fn header(name: &str, fields: &[(Field, &str)]) -> Vec<u8> {
        let mut buf = vec![b' '; HEADER_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        for (field, value) in fields {
            let start = field.end() - value.len();
            buf[start..field.end()].copy_from_slice(value.as_bytes());
        }
        buf
    }

    fn run(buffer: &[u8]) -> Result<Decoded> {
        let input = DecodeInput {
            filename: "test.dem",
            buffer,
            companion: None,
        };
        decode(&input, &DecodeOptions::default())
    }

    #[test]
    fn test_blank_name_is_structural() {
        let mut buf = header("", &[(ROWS, "2"), (COLUMNS, "2")]);
        buf.extend_from_slice(b" 1 2 3 4");
        let err = run(&buf).unwrap_err();
        assert!(err.is_structural(), "{:?}", err);
    }

    #[test]
    fn test_short_header_is_structural() {
        assert!(run(b"SHORT").unwrap_err().is_structural());
    }

    #[test]
    fn test_row_major_fill() {
        let mut buf = header(
            "TEST QUAD",
            &[(PLANIMETRIC, "1"), (ZONE, "10"), (ROWS, "2"), (COLUMNS, "3")],
        );
        buf.extend_from_slice(b"  10 20 30\n 40 50 60 70 80");
        let decoded = run(&buf).unwrap();
        let grid = decoded.grid;
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.elevations(), &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(grid.no_data_value(), Some(NO_DATA_SENTINEL));
        assert_eq!(grid.crs_hint(), Some(CrsHint::Utm { zone: Some(10) }));
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn test_missing_tokens_stay_zero() {
        let mut buf = header("SPARSE", &[(ROWS, "2"), (COLUMNS, "2")]);
        buf.extend_from_slice(b"5 6");
        let grid = run(&buf).unwrap().grid;
        assert_eq!(grid.elevations(), &[5.0, 6.0, 0.0, 0.0]);
        assert_eq!(grid.crs_hint(), None);
    }

    #[test]
    fn test_missing_counts_fall_back_to_near_square() {
        let mut buf = header("NO COUNTS", &[(ROWS, "abc")]);
        buf.extend_from_slice(b"1 2 3 4 5");
        let decoded = run(&buf).unwrap();
        let grid = &decoded.grid;
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.elevations().len(), 6);
        assert_eq!(grid.elevations(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        assert!(matches!(
            decoded.warnings[0],
            DecodeWarning::DimensionFallback { values: 5, width: 3, height: 2 }
        ));
    }

    #[test]
    fn test_fallback_with_no_values_is_empty() {
        let buf = header("EMPTY", &[]);
        assert!(matches!(run(&buf), Err(DecodeError::EmptyDataset { .. })));
    }

    #[test]
    fn test_geographic_arc_seconds() {
        let mut buf = header(
            "GEO",
            &[
                (PLANIMETRIC, "0"),
                (GROUND_UNIT, "3"),
                (SW_X, "-0.441000000000000D+06"),
                (NE_Y, "0.172800000000000D+06"),
                (RES_X, "0.300000E+01"),
                (RES_Y, "0.300000E+01"),
                (ROWS, "1"),
                (COLUMNS, "2"),
            ],
        );
        buf.extend_from_slice(b"100 -32767");
        let grid = run(&buf).unwrap().grid;
        assert_eq!(grid.crs_hint(), Some(CrsHint::Geographic));
        assert_relative_eq!(grid.origin().x, -122.5);
        assert_relative_eq!(grid.origin().y, 48.0);
        assert_relative_eq!(grid.pixel_size().x, 3.0 / 3600.0);
        assert_relative_eq!(grid.pixel_size().y, -3.0 / 3600.0);
        assert_eq!(grid.value_at(1, 0), None);
    }

    #[test]
    fn test_packed_dms_corner() {
        let mut buf = header(
            "DMS",
            &[(SW_X, "1223000.00W"), (NE_Y, "0480000.00N"), (ROWS, "1"), (COLUMNS, "1")],
        );
        buf.extend_from_slice(b"7");
        let grid = run(&buf).unwrap().grid;
        assert_relative_eq!(grid.origin().x, -122.5);
        assert_relative_eq!(grid.origin().y, 48.0);
    }

    #[test]
    fn test_feet_and_vertical_scale() {
        let mut buf = header(
            "FEET",
            &[(ELEVATION_UNIT, "1"), (RES_Z, "0.100000E+01"), (ROWS, "1"), (COLUMNS, "2")],
        );
        buf.extend_from_slice(b"100 -32767");
        let grid = run(&buf).unwrap().grid;
        assert_relative_eq!(grid.elevations()[0], 30.48, epsilon = 1e-4);
        assert_eq!(grid.elevations()[1], NO_DATA_SENTINEL);
    }

    #[test]
    fn test_out_of_range_values_are_no_data() {
        let mut buf = header("HUGE", &[(ROWS, "1"), (COLUMNS, "3")]);
        buf.extend_from_slice(b"5 1e39 -1.0D+40");
        let grid = run(&buf).unwrap().grid;
        assert_eq!(grid.elevations(), &[5.0, NO_DATA_SENTINEL, NO_DATA_SENTINEL]);
        assert_eq!(grid.value_at(1, 0), None);
    }

    #[test]
    fn test_near_square() {
        assert_eq!(near_square(1), (1, 1));
        assert_eq!(near_square(4), (2, 2));
        assert_eq!(near_square(5), (3, 2));
        assert_eq!(near_square(10), (4, 3));
    }
}
