//! Error and warning types for decoding.

use relief_grid::GridError;
use std::fmt;
use thiserror::Error;

/// Fatal decode failures. A decode that returns one of these produced no grid.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bad signature, header or layout; nothing in the buffer is decodable.
    #[error("Malformed {format} data: {message}")]
    Structural {
        /// Format id the buffer was decoded as.
        format: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The extension is recognized but deliberately not decoded.
    #[error("{name} files are not supported: {guidance}")]
    UnsupportedFormat {
        /// Display name of the format.
        name: &'static str,
        /// How to convert the file into something decodable.
        guidance: &'static str,
    },

    /// The extension is not in the format registry at all.
    #[error("Unrecognized file type: {0}")]
    UnknownFormat(String),

    /// The buffer parsed but contained no usable samples.
    #[error("No elevation samples found in {format} data")]
    EmptyDataset {
        /// Format id the buffer was decoded as.
        format: &'static str,
    },

    /// Raster image decoding error.
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// LASzip decompression error.
    #[error("LAZ decompression error: {0}")]
    Laz(String),

    /// The decoded values could not form a valid grid.
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    /// I/O error while reading from an in-memory cursor.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Create a structural error for `format`.
    pub fn structural(format: &'static str, message: impl Into<String>) -> Self {
        DecodeError::Structural {
            format,
            message: message.into(),
        }
    }

    /// Whether this is a structural (bad header/signature) failure.
    pub fn is_structural(&self) -> bool {
        matches!(self, DecodeError::Structural { .. })
    }
}

/// Non-fatal recoveries applied during a decode.
///
/// Decoding continues past every one of these; they are reported next to
/// the grid so the caller can log or surface them.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// Dimensions were missing or unusable, values were reshaped into a
    /// near-square grid instead.
    DimensionFallback {
        /// Number of values that were reshaped.
        values: usize,
        /// Chosen width.
        width: usize,
        /// Chosen height.
        height: usize,
    },

    /// A fixed-layout marker was not where the layout expects it.
    LayoutMismatch {
        /// Byte offset that was checked.
        offset: usize,
        /// What should have been there.
        expected: &'static str,
    },

    /// The buffer ended before all cells were read; the rest are no-data.
    TruncatedData {
        /// Cells that were read.
        read: usize,
        /// Cells the header promised.
        expected: usize,
    },

    /// The point source was thinned with a uniform stride.
    PointsSubsampled {
        /// Points declared in the header.
        total: u64,
        /// Stride between kept points.
        stride: u64,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::DimensionFallback {
                values,
                width,
                height,
            } => write!(
                f,
                "dimensions unavailable, reshaped {} values into {}x{}",
                values, width, height
            ),
            DecodeWarning::LayoutMismatch { offset, expected } => {
                write!(f, "expected {} at byte {}", expected, offset)
            }
            DecodeWarning::TruncatedData { read, expected } => {
                write!(f, "data truncated: read {} of {} cells", read, expected)
            }
            DecodeWarning::PointsSubsampled { total, stride } => {
                write!(f, "kept every {} of {} points", stride, total)
            }
        }
    }
}
