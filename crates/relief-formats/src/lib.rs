//! # relief-formats
//!
//! Decoders that turn terrain files into an [`ElevationGrid`].
//!
//! ## Supported formats
//!
//! | Format              | Extensions                        | Notes                                   |
//! |---------------------|-----------------------------------|-----------------------------------------|
//! | USGS ASCII DEM      | `.dem`                            | Fixed 1024-byte header, Fortran reals   |
//! | DTED levels 0-2     | `.dt0` `.dt1` `.dt2`              | Sign-magnitude posts, south to north    |
//! | ASCII XYZ           | `.xyz` `.csv` `.txt` `.pts`       | Lattice detection, gap fill             |
//! | LAS / LAZ           | `.las` `.laz` `.copc.laz`         | Stride-capped, resampled to a grid      |
//! | Image + world file  | `.png` `.jpg` `.bmp` `.gif` ...   | Luminance surrogate unless 16-bit gray  |
//! | GeoTIFF             | `.tif` `.tiff`                    | ModelTiepoint / ModelPixelScale         |
//! | SRTM                | `.hgt`                            | Corner from `N47W123` style names       |
//! | ESRI ASCII grid     | `.asc`                            |                                         |
//!
//! JPEG 2000, GeoPackage, ECW, MrSID and HDF are recognized but not
//! decoded; [`decode`] returns [`DecodeError::UnsupportedFormat`] with
//! conversion guidance for them.
//!
//! ## Example
//!
//! ```
//! use relief_formats::{decode_with, DecodeOptions};
//!
//! let text = "0 0 1\n1 0 2\n0 1 3\n1 1 4\n";
//! let report = decode_with("survey.xyz", text.as_bytes(), None, &DecodeOptions::default())?;
//! assert_eq!(report.grid.width(), 2);
//! assert!(report.warnings.is_empty());
//! # Ok::<(), relief_formats::DecodeError>(())
//! ```
//!
//! Decoding is synchronous and touches no shared state. To keep a large
//! point cloud off the calling thread, move a [`DecodeRequest`] into a
//! worker and call [`decode_owned`].

mod ascii_grid;
mod decode;
mod dted;
mod error;
pub mod fields;
mod geotiff;
mod hgt;
mod las;
mod options;
pub mod registry;
pub mod resample;
pub mod sexagesimal;
mod tile_name;
mod usgs_dem;
mod world_image;
mod xyz;

pub use decode::{decode, decode_owned, decode_with, DecodeReport, DecodeRequest};
pub use error::{DecodeError, DecodeWarning};
pub use las::{read_points as read_las_points, LasHeader};
pub use options::{DecodeOptions, DEFAULT_FILL_PASSES, DEFAULT_MAX_POINTS, DEFAULT_MAX_RESOLUTION};
pub use registry::{FormatDescriptor, FormatId};
pub use relief_grid::{ElevationGrid, PointRecord};
pub use world_image::WorldFile;
pub use xyz::parse_points as parse_xyz_points;

/// Result type for decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;
