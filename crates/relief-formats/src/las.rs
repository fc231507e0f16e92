//! ASPRS LAS point clouds, raw or LASzip-compressed.
//!
//! The public header and the VLR list are read directly from the buffer.
//! A LASzip VLR switches the point reader to the `laz` decompressor; the
//! uncompressed path reads records in place. Both paths keep the same
//! stride-sampled subset before the points are gridded.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::{ByteView, Field};
use crate::registry::FormatId;
use crate::resample::grid_points;
use crate::{DecodeError, DecodeOptions, DecodeWarning, Result};
use laz::{LasZipDecompressor, LazVlr};
use relief_grid::PointRecord;
use std::io::Cursor;
use tracing::{debug, trace, warn};

const FORMAT: &str = FormatId::LasLaz.as_str();

const SIGNATURE: Field = Field::new("signature", 0, 4);
const VERSION_MAJOR: usize = 24;
const VERSION_MINOR: usize = 25;
const OFFSET_TO_POINTS: usize = 96;
const VLR_COUNT: usize = 100;
const POINT_FORMAT: usize = 104;
const RECORD_LEN: usize = 105;
const LEGACY_POINT_COUNT: usize = 107;
const SCALE: [usize; 3] = [131, 139, 147];
const OFFSET: [usize; 3] = [155, 163, 171];
const POINT_COUNT_64: usize = 247;

const VLR_HEADER_LEN: usize = 54;
const VLR_USER_ID: Field = Field::new("VLR user id", 2, 16);
const VLR_RECORD_ID: usize = 18;
const VLR_PAYLOAD_LEN: usize = 20;

const LASZIP_USER_ID: &str = "laszip encoded";
const LASZIP_RECORD_ID: u16 = 22204;

/// Bytes of X, Y and Z at the start of every point record format.
const XYZ_LEN: usize = 12;

/// Public header block fields needed to locate and scale points.
#[derive(Debug, Clone, PartialEq)]
pub struct LasHeader {
    pub version: (u8, u8),
    pub offset_to_points: usize,
    pub vlr_count: u32,
    pub point_format: u8,
    pub record_len: usize,
    pub point_count: u64,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl LasHeader {
    pub fn parse(view: &ByteView<'_>) -> Result<Self> {
        if !view.matches(SIGNATURE, b"LASF") {
            return Err(DecodeError::structural(FORMAT, "missing LASF signature"));
        }

        let major = view.u8_at(VERSION_MAJOR).unwrap_or(0);
        let minor = view.u8_at(VERSION_MINOR).unwrap_or(u8::MAX);
        if major != 1 || minor > 4 {
            return Err(DecodeError::structural(
                FORMAT,
                format!("unsupported LAS version {}.{}", major, minor),
            ));
        }

        let missing = |name: &str| DecodeError::structural(FORMAT, format!("header truncated at {}", name));
        let f64_at = |offset: usize, name: &str| view.f64_le(offset).ok_or_else(|| missing(name));

        let legacy_count = view
            .u32_le(LEGACY_POINT_COUNT)
            .ok_or_else(|| missing("point count"))? as u64;
        let point_count = if minor >= 4 {
            match view.u64_le(POINT_COUNT_64) {
                Some(count) if count > 0 => count,
                _ => legacy_count,
            }
        } else {
            legacy_count
        };

        let header = LasHeader {
            version: (major, minor),
            offset_to_points: view
                .u32_le(OFFSET_TO_POINTS)
                .ok_or_else(|| missing("offset to point data"))? as usize,
            vlr_count: view.u32_le(VLR_COUNT).ok_or_else(|| missing("VLR count"))?,
            point_format: view.u8_at(POINT_FORMAT).ok_or_else(|| missing("point format"))?,
            record_len: view.u16_le(RECORD_LEN).ok_or_else(|| missing("record length"))? as usize,
            point_count,
            scale: [
                f64_at(SCALE[0], "x scale")?,
                f64_at(SCALE[1], "y scale")?,
                f64_at(SCALE[2], "z scale")?,
            ],
            offset: [
                f64_at(OFFSET[0], "x offset")?,
                f64_at(OFFSET[1], "y offset")?,
                f64_at(OFFSET[2], "z offset")?,
            ],
        };

        if header.record_len < XYZ_LEN {
            return Err(DecodeError::structural(
                FORMAT,
                format!("point record length {} is too short", header.record_len),
            ));
        }

        Ok(header)
    }

    /// Where the VLR list begins for this minor version.
    pub fn vlr_start(&self) -> usize {
        match self.version.1 {
            0..=2 => 227,
            3 => 235,
            _ => 375,
        }
    }

    fn point(&self, raw: [i32; 3]) -> PointRecord {
        PointRecord::new(
            raw[0] as f64 * self.scale[0] + self.offset[0],
            raw[1] as f64 * self.scale[1] + self.offset[1],
            raw[2] as f64 * self.scale[2] + self.offset[2],
        )
    }
}

/// Payload of the LASzip VLR, if the file has one.
fn find_laszip_vlr<'a>(view: &ByteView<'a>, header: &LasHeader) -> Option<&'a [u8]> {
    let mut offset = header.vlr_start();
    for index in 0..header.vlr_count {
        let vlr = ByteView::new(view.slice(offset, VLR_HEADER_LEN)?);
        let user_id = vlr.text(VLR_USER_ID).unwrap_or_default();
        let record_id = vlr.u16_le(VLR_RECORD_ID)?;
        let payload_len = vlr.u16_le(VLR_PAYLOAD_LEN)? as usize;
        trace!("VLR {}: user id {:?}, record id {}", index, user_id, record_id);

        if user_id == LASZIP_USER_ID || record_id == LASZIP_RECORD_ID {
            return view.slice(offset + VLR_HEADER_LEN, payload_len);
        }
        offset += VLR_HEADER_LEN + payload_len;
    }
    None
}

fn xyz(record: &[u8]) -> Option<[i32; 3]> {
    let view = ByteView::new(record);
    Some([view.i32_le(0)?, view.i32_le(4)?, view.i32_le(8)?])
}

/// Read the stride-sampled point subset.
pub fn read_points(buffer: &[u8], options: &DecodeOptions) -> Result<(Vec<PointRecord>, Vec<DecodeWarning>)> {
    let view = ByteView::new(buffer);
    let header = LasHeader::parse(&view)?;
    let mut warnings = Vec::new();

    debug!(
        "LAS {}.{}: {} points, format {}, record length {}",
        header.version.0, header.version.1, header.point_count, header.point_format, header.record_len
    );

    if header.point_count == 0 {
        return Err(DecodeError::EmptyDataset { format: FORMAT });
    }

    let stride = options.point_stride(header.point_count);
    if stride > 1 {
        warn!(
            "LAS: {} points exceed cap of {}, keeping every {}th",
            header.point_count, options.max_points, stride
        );
        warnings.push(DecodeWarning::PointsSubsampled {
            total: header.point_count,
            stride,
        });
    }

    let points = match find_laszip_vlr(&view, &header) {
        Some(vlr) => {
            debug!("LAS: LASzip VLR found, decompressing");
            read_compressed(buffer, &header, vlr, stride, &mut warnings)?
        }
        None => read_raw(&view, &header, stride, &mut warnings),
    };

    if points.is_empty() {
        return Err(DecodeError::EmptyDataset { format: FORMAT });
    }
    Ok((points, warnings))
}

fn read_raw(view: &ByteView<'_>, header: &LasHeader, stride: u64, warnings: &mut Vec<DecodeWarning>) -> Vec<PointRecord> {
    let available = (view.len().saturating_sub(header.offset_to_points) / header.record_len) as u64;
    let total = header.point_count.min(available);
    if total < header.point_count {
        warn!(
            "LAS: header declares {} points but buffer holds {}",
            header.point_count, available
        );
        warnings.push(DecodeWarning::TruncatedData {
            read: total as usize,
            expected: header.point_count as usize,
        });
    }

    (0..total)
        .step_by(stride as usize)
        .filter_map(|i| {
            let start = header.offset_to_points + i as usize * header.record_len;
            view.slice(start, XYZ_LEN).and_then(xyz)
        })
        .map(|raw| header.point(raw))
        .collect()
}

fn read_compressed(
    buffer: &[u8],
    header: &LasHeader,
    vlr: &[u8],
    stride: u64,
    warnings: &mut Vec<DecodeWarning>,
) -> Result<Vec<PointRecord>> {
    let laz_vlr = LazVlr::from_buffer(vlr).map_err(|e| DecodeError::Laz(e.to_string()))?;
    let mut record = vec![0u8; laz_vlr.items_size() as usize];
    if record.len() < XYZ_LEN {
        return Err(DecodeError::structural(FORMAT, "LASzip items hold no coordinates"));
    }

    let mut source = Cursor::new(buffer);
    source.set_position(header.offset_to_points as u64);
    let mut decompressor =
        LasZipDecompressor::new(source, laz_vlr).map_err(|e| DecodeError::Laz(e.to_string()))?;

    let mut points = Vec::with_capacity((header.point_count / stride) as usize + 1);
    for i in 0..header.point_count {
        if let Err(e) = decompressor.decompress_one(&mut record) {
            if i == 0 {
                return Err(e.into());
            }
            warn!(
                "LAS: decompression stopped after {} of {} points: {}",
                i, header.point_count, e
            );
            warnings.push(DecodeWarning::TruncatedData {
                read: i as usize,
                expected: header.point_count as usize,
            });
            break;
        }
        if i % stride == 0 {
            if let Some(raw) = xyz(&record) {
                points.push(header.point(raw));
            }
        }
    }
    Ok(points)
}

pub(crate) fn decode(input: &DecodeInput<'_>, options: &DecodeOptions) -> Result<Decoded> {
    let (points, warnings) = read_points(input.buffer, options)?;
    let grid = grid_points(FORMAT, &points, options)?;
    Ok(Decoded { grid, warnings })
}
