//! DTED (Digital Terrain Elevation Data) decoder.
//!
//! ## File layout
//!
//! | Offset | Size | Region                                    |
//! |--------|------|-------------------------------------------|
//! | 0      | 80   | UHL: user header label                    |
//! | 80     | 648  | DSI: data set identification              |
//! | 728    | 2700 | ACC: accuracy description                 |
//! | 3428   | ...  | One data record per longitude line        |
//!
//! Each data record is `0xAA` + block count(3) + longitude count(2) +
//! latitude count(2), then one big-endian sign-magnitude 16-bit elevation
//! per latitude point from south to north, then a 4-byte checksum.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::{ByteView, Field};
use crate::registry::FormatId;
use crate::sexagesimal::parse_dms;
use crate::{DecodeError, DecodeOptions, DecodeWarning, Result};
use relief_grid::{CrsHint, ElevationGrid, NO_DATA_SENTINEL};
use tracing::{debug, warn};

const FORMAT: &str = FormatId::Dted.as_str();

const UHL_LEN: usize = 80;
const DSI_LEN: usize = 648;
const ACC_LEN: usize = 2700;

/// Offset of the first data record.
pub const DATA_OFFSET: usize = UHL_LEN + DSI_LEN + ACC_LEN;

const RECORD_HEADER_LEN: usize = 8;
const RECORD_CHECKSUM_LEN: usize = 4;
const RECORD_SENTINEL: u8 = 0xAA;

/// Largest number of lines or points a header may declare.
const MAX_COUNT: i64 = 10_000;

const UHL_SIGNATURE: Field = Field::new("UHL signature", 0, 3);
const LON_ORIGIN: Field = Field::new("longitude of origin", 4, 8);
const LAT_ORIGIN: Field = Field::new("latitude of origin", 12, 8);
const LON_INTERVAL: Field = Field::new("longitude interval", 20, 4);
const LAT_INTERVAL: Field = Field::new("latitude interval", 24, 4);
const LON_COUNT: Field = Field::new("longitude lines", 47, 4);
const LAT_COUNT: Field = Field::new("latitude points", 51, 4);
const DSI_SIGNATURE: Field = Field::new("DSI signature", UHL_LEN, 3);
const ACC_SIGNATURE: Field = Field::new("ACC signature", UHL_LEN + DSI_LEN, 3);

#[derive(Debug, Clone, Copy, PartialEq)]
struct UserHeader {
    origin_lon: Option<f64>,
    origin_lat: Option<f64>,
    /// Tenths of an arc-second.
    lon_interval: Option<i64>,
    lat_interval: Option<i64>,
    lon_lines: usize,
    lat_points: usize,
}

impl UserHeader {
    fn parse(view: &ByteView<'_>) -> Result<Self> {
        if !view.matches(UHL_SIGNATURE, b"UHL") {
            return Err(DecodeError::structural(FORMAT, "missing UHL signature"));
        }

        Ok(UserHeader {
            origin_lon: view.text(LON_ORIGIN).and_then(parse_dms),
            origin_lat: view.text(LAT_ORIGIN).and_then(parse_dms),
            lon_interval: view.int(LON_INTERVAL).filter(|v| *v > 0),
            lat_interval: view.int(LAT_INTERVAL).filter(|v| *v > 0),
            lon_lines: count(view, LON_COUNT)?,
            lat_points: count(view, LAT_COUNT)?,
        })
    }

    fn record_len(&self) -> usize {
        RECORD_HEADER_LEN + 2 * self.lat_points + RECORD_CHECKSUM_LEN
    }

    /// Step between posts in degrees, falling back to a one-degree cell.
    fn step(interval: Option<i64>, count: usize) -> f64 {
        match interval {
            Some(tenths) => tenths as f64 / 36_000.0,
            None => 1.0 / count.saturating_sub(1).max(1) as f64,
        }
    }
}

fn count(view: &ByteView<'_>, field: Field) -> Result<usize> {
    match view.int(field) {
        Some(n) if n > 0 && n <= MAX_COUNT => Ok(n as usize),
        Some(n) => Err(DecodeError::structural(
            FORMAT,
            format!("{} must be in 1..={}, got {}", field.name, MAX_COUNT, n),
        )),
        None => Err(DecodeError::structural(
            FORMAT,
            format!("{} is not a number", field.name),
        )),
    }
}

/// Record a marker mismatch without stopping the decode.
fn check_marker(view: &ByteView<'_>, field: Field, expected: &'static str, warnings: &mut Vec<DecodeWarning>) {
    if !view.matches(field, expected.as_bytes()) {
        warn!("DTED: expected {} at byte {}, decoding on fixed layout", expected, field.offset);
        warnings.push(DecodeWarning::LayoutMismatch {
            offset: field.offset,
            expected,
        });
    }
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let view = ByteView::new(input.buffer);
    let header = UserHeader::parse(&view)?;
    let mut warnings = Vec::new();

    debug!(
        "DTED: {} longitude lines x {} latitude points, origin ({:?}, {:?})",
        header.lon_lines, header.lat_points, header.origin_lon, header.origin_lat
    );

    check_marker(&view, DSI_SIGNATURE, "DSI", &mut warnings);
    check_marker(&view, ACC_SIGNATURE, "ACC", &mut warnings);
    if view.len() > DATA_OFFSET && view.u8_at(DATA_OFFSET) != Some(RECORD_SENTINEL) {
        warn!("DTED: first data record lacks the 0xAA sentinel");
        warnings.push(DecodeWarning::LayoutMismatch {
            offset: DATA_OFFSET,
            expected: "0xAA record sentinel",
        });
    }

    let (origin_lon, origin_lat) = match (header.origin_lon, header.origin_lat) {
        (Some(lon), Some(lat)) => (lon, lat),
        _ => {
            warn!("DTED: origin is not packed DMS, placing grid at 0,0");
            warnings.push(DecodeWarning::LayoutMismatch {
                offset: LON_ORIGIN.offset,
                expected: "packed DMS origin",
            });
            (0.0, 0.0)
        }
    };

    let width = header.lon_lines;
    let height = header.lat_points;
    let record_len = header.record_len();
    let mut elevations = vec![NO_DATA_SENTINEL; width * height];
    let mut complete_columns = 0;

    for col in 0..width {
        let values_offset = DATA_OFFSET + col * record_len + RECORD_HEADER_LEN;
        if view.slice(values_offset, 2 * height).is_none() {
            break;
        }
        for i in 0..height {
            // Stored south to north; canonical rows run north to south.
            let row = height - 1 - i;
            if let Some(value) = view.sign_magnitude_be(values_offset + 2 * i) {
                elevations[row * width + col] = value as f32;
            }
        }
        complete_columns += 1;
    }

    if complete_columns == 0 {
        return Err(DecodeError::EmptyDataset { format: FORMAT });
    }
    if complete_columns < width {
        warn!(
            "DTED: buffer holds {} of {} longitude lines, rest left as no-data",
            complete_columns, width
        );
        warnings.push(DecodeWarning::TruncatedData {
            read: complete_columns * height,
            expected: width * height,
        });
    }

    let lon_step = UserHeader::step(header.lon_interval, width);
    let lat_step = UserHeader::step(header.lat_interval, height);

    let grid = ElevationGrid::builder(width, height, elevations)
        .no_data(NO_DATA_SENTINEL)
        .pixel_size(lon_step, -lat_step)
        .origin(origin_lon, origin_lat + (height - 1) as f64 * lat_step)
        .crs(Some(CrsHint::Geographic))
        .build()?;

    Ok(Decoded { grid, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn put(buf: &mut [u8], field: Field, value: &str) {
        buf[field.offset..field.offset + value.len()].copy_from_slice(value.as_bytes());
    }

    fn sign_magnitude(value: i16) -> [u8; 2] {
        let magnitude = value.unsigned_abs() & 0x7FFF;
        let mut bytes = magnitude.to_be_bytes();
        if value < 0 {
            bytes[0] |= 0x80;
        }
        bytes
    }

    /// Build a DTED buffer; `columns[c][i]` is the i-th value from the south.
    fn build(columns: &[Vec<i16>]) -> Vec<u8> {
        let lat_points = columns[0].len();
        let mut buf = vec![b' '; DATA_OFFSET];
        put(&mut buf, UHL_SIGNATURE, "UHL");
        put(&mut buf, LON_ORIGIN, "1230000W");
        put(&mut buf, LAT_ORIGIN, "0470000N");
        put(&mut buf, LON_INTERVAL, "0300");
        put(&mut buf, LAT_INTERVAL, "0300");
        put(&mut buf, LON_COUNT, &format!("{:04}", columns.len()));
        put(&mut buf, LAT_COUNT, &format!("{:04}", lat_points));
        put(&mut buf, DSI_SIGNATURE, "DSI");
        put(&mut buf, ACC_SIGNATURE, "ACC");

        for (col, values) in columns.iter().enumerate() {
            buf.push(RECORD_SENTINEL);
            buf.extend_from_slice(&[0, 0, col as u8]);
            buf.extend_from_slice(&(col as u16).to_be_bytes());
            buf.extend_from_slice(&[0, 0]);
            for value in values {
                buf.extend_from_slice(&sign_magnitude(*value));
            }
            buf.extend_from_slice(&[0, 0, 0, 0]);
        }
        buf
    }

    fn run(buffer: &[u8]) -> Result<Decoded> {
        let input = DecodeInput {
            filename: "n47w123.dt1",
            buffer,
            companion: None,
        };
        decode(&input, &DecodeOptions::default())
    }

    #[test]
    fn test_missing_signature_is_structural() {
        let mut buf = build(&[vec![1, 2], vec![3, 4]]);
        buf[0] = b'X';
        assert!(run(&buf).unwrap_err().is_structural());
        assert!(run(b"").unwrap_err().is_structural());
    }

    #[test]
    fn test_bad_counts_are_structural() {
        let mut buf = build(&[vec![1, 2], vec![3, 4]]);
        put(&mut buf, LON_COUNT, "0000");
        assert!(run(&buf).unwrap_err().is_structural());

        let mut buf = build(&[vec![1, 2], vec![3, 4]]);
        put(&mut buf, LAT_COUNT, "ab12");
        assert!(run(&buf).unwrap_err().is_structural());
    }

    #[test]
    fn test_sign_bit_negates() {
        let decoded = run(&build(&[vec![-100, 100]])).unwrap();
        let grid = decoded.grid;
        // South value is -100, it lands on the bottom row.
        assert_eq!(grid.get(0, 1), Some(-100.0));
        assert_eq!(grid.get(0, 0), Some(100.0));
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn test_rows_are_flipped() {
        let grid = run(&build(&[vec![1, 2, 3], vec![4, 5, 6]])).unwrap().grid;
        assert_eq!((grid.width(), grid.height()), (2, 3));
        assert_eq!(grid.elevations(), &[3.0, 6.0, 2.0, 5.0, 1.0, 4.0]);
    }

    #[test]
    fn test_georeferencing() {
        let grid = run(&build(&[vec![0; 3], vec![0; 3]])).unwrap().grid;
        assert_eq!(grid.crs_hint(), Some(CrsHint::Geographic));
        assert_eq!(grid.no_data_value(), Some(NO_DATA_SENTINEL));
        let step = 30.0 / 3600.0;
        assert_relative_eq!(grid.pixel_size().x, step);
        assert_relative_eq!(grid.pixel_size().y, -step);
        assert_relative_eq!(grid.origin().x, -123.0);
        assert_relative_eq!(grid.origin().y, 47.0 + 2.0 * step);
    }

    #[test]
    fn test_truncated_columns_are_no_data() {
        let mut buf = build(&[vec![7, 8], vec![9, 10]]);
        buf.truncate(buf.len() - 6);
        let decoded = run(&buf).unwrap();
        assert_eq!(decoded.grid.value_at(1, 0), None);
        assert_eq!(decoded.grid.value_at(0, 0), Some(8.0));
        assert!(matches!(
            decoded.warnings.as_slice(),
            [DecodeWarning::TruncatedData { read: 2, expected: 4 }]
        ));
    }

    #[test]
    fn test_missing_markers_warn() {
        let mut buf = build(&[vec![1, 2]]);
        put(&mut buf, DSI_SIGNATURE, "XXX");
        let decoded = run(&buf).unwrap();
        assert_eq!(
            decoded.warnings,
            vec![DecodeWarning::LayoutMismatch {
                offset: UHL_LEN,
                expected: "DSI"
            }]
        );
    }
}
