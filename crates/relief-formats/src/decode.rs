//! Decode entry points and the format dispatch table.

use crate::registry::{self, FormatId};
use crate::{
    ascii_grid, dted, geotiff, hgt, las, usgs_dem, world_image, xyz, DecodeError, DecodeOptions,
    DecodeWarning, Result,
};
use relief_grid::ElevationGrid;
use tracing::debug;

/// Borrowed inputs of one decode call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeInput<'a> {
    /// File name, used for dispatch and for name-encoded metadata.
    pub filename: &'a str,
    /// File contents.
    pub buffer: &'a [u8],
    /// Optional companion text, e.g. a world file.
    pub companion: Option<&'a str>,
}

/// What a single decoder returns.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub grid: ElevationGrid,
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    pub fn clean(grid: ElevationGrid) -> Self {
        Self {
            grid,
            warnings: Vec::new(),
        }
    }
}

/// A decoded grid together with the recoveries applied to produce it.
#[derive(Debug)]
pub struct DecodeReport {
    /// The decoded grid.
    pub grid: ElevationGrid,
    /// Format the buffer was decoded as.
    pub format: FormatId,
    /// Non-fatal recoveries, in the order they happened.
    pub warnings: Vec<DecodeWarning>,
}

/// An owned decode request, suitable for moving onto a worker thread.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// File name.
    pub filename: String,
    /// File contents.
    pub buffer: Vec<u8>,
    /// Optional companion text.
    pub companion: Option<String>,
}

type DecodeFn = fn(&DecodeInput<'_>, &DecodeOptions) -> Result<Decoded>;

/// Format id to decoder. Adding a format is one entry here plus one function.
static DECODERS: &[(FormatId, DecodeFn)] = &[
    (FormatId::UsgsDem, usgs_dem::decode),
    (FormatId::Dted, dted::decode),
    (FormatId::AsciiXyz, xyz::decode),
    (FormatId::LasLaz, las::decode),
    (FormatId::ImageWorldFile, world_image::decode),
    (FormatId::GeoTiff, geotiff::decode),
    (FormatId::SrtmHgt, hgt::decode),
    (FormatId::EsriAsciiGrid, ascii_grid::decode),
];

fn decoder_for(id: FormatId) -> Option<DecodeFn> {
    DECODERS
        .iter()
        .find(|(format, _)| *format == id)
        .map(|(_, decode)| *decode)
}

/// Decode a buffer into an elevation grid using default options.
///
/// The file name selects the decoder. Fails with a structured error on
/// malformed input; never returns a partial grid.
pub fn decode(filename: &str, buffer: &[u8], companion: Option<&str>) -> Result<ElevationGrid> {
    decode_with(filename, buffer, companion, &DecodeOptions::default()).map(|report| report.grid)
}

/// Decode with explicit options, returning the grid and any recoveries.
pub fn decode_with(
    filename: &str,
    buffer: &[u8],
    companion: Option<&str>,
    options: &DecodeOptions,
) -> Result<DecodeReport> {
    let descriptor =
        registry::classify(filename).ok_or_else(|| DecodeError::UnknownFormat(filename.to_string()))?;

    if !descriptor.supported {
        return Err(DecodeError::UnsupportedFormat {
            name: descriptor.display_name,
            guidance: descriptor.guidance,
        });
    }

    let decoder = decoder_for(descriptor.id).ok_or(DecodeError::UnsupportedFormat {
        name: descriptor.display_name,
        guidance: descriptor.guidance,
    })?;

    debug!(
        "Decoding {} ({} bytes) as {}",
        filename,
        buffer.len(),
        descriptor.id
    );

    let input = DecodeInput {
        filename,
        buffer,
        companion,
    };
    let decoded = decoder(&input, options)?;

    debug!(
        "Decoded {} into {}x{} grid with {} recoveries",
        filename,
        decoded.grid.width(),
        decoded.grid.height(),
        decoded.warnings.len()
    );

    Ok(DecodeReport {
        grid: decoded.grid,
        format: descriptor.id,
        warnings: decoded.warnings,
    })
}

/// Decode an owned request. The buffer is dropped as soon as decoding ends.
pub fn decode_owned(request: DecodeRequest, options: &DecodeOptions) -> Result<DecodeReport> {
    let DecodeRequest {
        filename,
        buffer,
        companion,
    } = request;
    decode_with(&filename, &buffer, companion.as_deref(), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_format_has_decoder() {
        for descriptor in registry::descriptors() {
            assert_eq!(
                decoder_for(descriptor.id).is_some(),
                descriptor.supported,
                "{}",
                descriptor.id
            );
        }
    }

    #[test]
    fn test_unsupported_never_routed() {
        for name in ["x.ecw", "x.sid", "x.hdf", "x.jp2", "x.gpkg"] {
            match decode(name, b"anything", None) {
                Err(DecodeError::UnsupportedFormat { guidance, .. }) => {
                    assert!(!guidance.is_empty())
                }
                other => panic!("{} gave {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            decode("readme.md", b"", None),
            Err(DecodeError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_decode_owned_moves_across_threads() {
        let request = DecodeRequest {
            filename: "grid.xyz".to_string(),
            buffer: b"0 0 1\n1 0 2\n0 1 3\n1 1 4\n".to_vec(),
            companion: None,
        };
        let handle =
            std::thread::spawn(move || decode_owned(request, &DecodeOptions::default()));
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.format, FormatId::AsciiXyz);
        assert_eq!(report.grid.width(), 2);
        assert_eq!(report.grid.height(), 2);
    }
}
