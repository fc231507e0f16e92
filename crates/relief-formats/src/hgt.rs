//! SRTM `.hgt` height tiles.
//!
//! A tile is a bare square of big-endian i16 posts, north row first, with
//! no header. The side length follows from the buffer size (1201 for
//! 3 arc-second tiles, 3601 for 1 arc-second). The file stem names the
//! south-west corner of the one-degree cell.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::ByteView;
use crate::registry::FormatId;
use crate::tile_name::parse_tile_name;
use crate::{DecodeError, DecodeOptions, Result};
use relief_grid::{CrsHint, ElevationGrid, NO_DATA_SENTINEL};
use tracing::debug;

const FORMAT: &str = FormatId::SrtmHgt.as_str();

/// Void marker used by SRTM.
const SRTM_VOID: i16 = -32768;

fn side_length(len: usize) -> Option<usize> {
    if len == 0 || len % 2 != 0 {
        return None;
    }
    let posts = len / 2;
    let side = (posts as f64).sqrt().round() as usize;
    (side >= 2 && side * side == posts).then_some(side)
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let side = side_length(input.buffer.len()).ok_or_else(|| {
        DecodeError::structural(
            FORMAT,
            format!("{} bytes is not a square grid of 16-bit posts", input.buffer.len()),
        )
    })?;

    let view = ByteView::new(input.buffer);
    let elevations: Vec<f32> = (0..side * side)
        .map(|i| match view.i16_be(2 * i) {
            Some(SRTM_VOID) | None => NO_DATA_SENTINEL,
            Some(v) => v as f32,
        })
        .collect();

    // Posts sit on whole-degree lines, so the step spans side - 1 intervals.
    let step = 1.0 / (side - 1) as f64;
    let mut builder = ElevationGrid::builder(side, side, elevations)
        .no_data(NO_DATA_SENTINEL)
        .pixel_size(step, -step);

    match parse_tile_name(input.filename) {
        Some(corner) => {
            debug!("HGT: {}x{} tile at {:?}", side, side, corner);
            builder = builder
                .origin(corner.lon, corner.lat + 1.0)
                .crs(Some(CrsHint::Geographic));
        }
        None => debug!("HGT: {}x{} tile, no corner in file name", side, side),
    }

    Ok(Decoded::clean(builder.build()?))
}
