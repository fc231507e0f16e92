//! GeoTIFF rasters.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::parse_real;
use crate::registry::FormatId;
use crate::tile_name::parse_tile_name;
use crate::{DecodeError, DecodeOptions, Result};
use relief_grid::{CrsHint, ElevationGrid, NO_DATA_SENTINEL};
use std::io::{Cursor, Read, Seek};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

const FORMAT: &str = FormatId::GeoTiff.as_str();

const MODEL_PIXEL_SCALE: Tag = Tag::Unknown(33550);
const MODEL_TIEPOINT: Tag = Tag::Unknown(33922);
const GDAL_NODATA: Tag = Tag::Unknown(42113);

/// Pixel size and upper-left corner of the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Geotransform {
    pixel_x: f64,
    pixel_y: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Geotransform {
    /// Grid in pixel units, used when the file carries no georeferencing.
    const PIXELS: Geotransform = Geotransform {
        pixel_x: 1.0,
        pixel_y: -1.0,
        origin_x: 0.0,
        origin_y: 0.0,
    };

    fn looks_geographic(&self, width: usize, height: usize) -> bool {
        let max_x = self.origin_x + self.pixel_x * width as f64;
        let min_y = self.origin_y + self.pixel_y * height as f64;
        self.origin_x >= -180.0 && max_x <= 180.0 && min_y >= -90.0 && self.origin_y <= 90.0
    }
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Geotransform> {
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 || scale[0] == 0.0 || scale[1] == 0.0 {
        return None;
    }

    // Tiepoint is [i, j, k, x, y, z]: raster (i, j) sits at model (x, y).
    let (i, j) = (tiepoint[0], tiepoint[1]);
    Some(Geotransform {
        pixel_x: scale[0],
        pixel_y: -scale[1],
        origin_x: tiepoint[3] - i * scale[0],
        origin_y: tiepoint[4] + j * scale[1],
    })
}

/// One-degree USGS tile named by its north-west corner.
fn geotransform_from_name(filename: &str, width: usize, height: usize) -> Option<Geotransform> {
    let corner = parse_tile_name(filename)?;
    Some(Geotransform {
        pixel_x: 1.0 / width as f64,
        pixel_y: -1.0 / height as f64,
        origin_x: corner.lon,
        origin_y: corner.lat,
    })
}

fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    parse_real(text.trim_end_matches('\0')).map(|v| v as f32)
}

/// Widen any sample type to f32.
fn widen(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let mut decoder = Decoder::new(Cursor::new(input.buffer))?;

    // Single-tile 1/3 arc-second rasters exceed the default buffer limits.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let geotransform = read_geotransform(&mut decoder);
    let no_data = read_nodata_value(&mut decoder);
    let samples = widen(decoder.read_image()?);

    let pixels = width * height;
    if pixels == 0 || samples.len() < pixels {
        return Err(DecodeError::structural(
            FORMAT,
            format!("{} samples for a {}x{} raster", samples.len(), width, height),
        ));
    }

    // Interleaved bands: keep the first.
    let bands = samples.len() / pixels;
    let mut elevations: Vec<f32> = if bands > 1 {
        debug!("GeoTIFF: {} bands, using band 0", bands);
        samples.into_iter().step_by(bands).take(pixels).collect()
    } else {
        samples
    };

    let mut no_data = no_data;
    let fill = no_data.unwrap_or(NO_DATA_SENTINEL);
    let mut non_finite = 0usize;
    for v in elevations.iter_mut().filter(|v| !v.is_finite()) {
        *v = fill;
        non_finite += 1;
    }
    if non_finite > 0 {
        debug!("GeoTIFF: {} non-finite cells marked no-data", non_finite);
        no_data = Some(fill);
    }

    let (transform, crs) = match geotransform {
        Some(t) => (t, t.looks_geographic(width, height).then_some(CrsHint::Geographic)),
        None => match geotransform_from_name(input.filename, width, height) {
            Some(t) => (t, Some(CrsHint::Geographic)),
            None => {
                debug!("GeoTIFF: no georeferencing, using pixel coordinates");
                (Geotransform::PIXELS, None)
            }
        },
    };

    debug!(
        "GeoTIFF: {}x{}, pixel {}x{}, origin ({}, {}), no-data {:?}",
        width, height, transform.pixel_x, transform.pixel_y, transform.origin_x, transform.origin_y, no_data
    );

    let mut builder = ElevationGrid::builder(width, height, elevations)
        .pixel_size(transform.pixel_x, transform.pixel_y)
        .origin(transform.origin_x, transform.origin_y)
        .crs(crs);
    if let Some(value) = no_data {
        builder = builder.no_data(value);
    }

    Ok(Decoded::clean(builder.build()?))
}
