//! Format registry: maps a file name to a format descriptor.
//!
//! Classification is a longest-suffix match, case-insensitive, over a fixed
//! table. Extensions of formats that are recognized but not decoded carry
//! conversion guidance instead of a decoder.

use serde::Serialize;

/// Identifier of every format the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatId {
    /// USGS ASCII DEM.
    UsgsDem,
    /// Digital Terrain Elevation Data, levels 0-2.
    Dted,
    /// Plain-text X Y Z coordinate list.
    AsciiXyz,
    /// ASPRS LAS / LASzip point cloud.
    LasLaz,
    /// Raster image with an optional world-file sidecar.
    ImageWorldFile,
    /// GeoTIFF raster.
    GeoTiff,
    /// SRTM height tile.
    SrtmHgt,
    /// ESRI ASCII grid.
    EsriAsciiGrid,
    /// JPEG 2000.
    Jpeg2000,
    /// OGC GeoPackage.
    GeoPackage,
    /// ER Mapper Compressed Wavelet.
    Ecw,
    /// LizardTech MrSID.
    MrSid,
    /// Hierarchical Data Format.
    Hdf,
}

impl FormatId {
    /// Stable short name used in errors and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FormatId::UsgsDem => "usgs-dem",
            FormatId::Dted => "dted",
            FormatId::AsciiXyz => "xyz",
            FormatId::LasLaz => "las",
            FormatId::ImageWorldFile => "image",
            FormatId::GeoTiff => "geotiff",
            FormatId::SrtmHgt => "hgt",
            FormatId::EsriAsciiGrid => "esri-ascii",
            FormatId::Jpeg2000 => "jpeg2000",
            FormatId::GeoPackage => "geopackage",
            FormatId::Ecw => "ecw",
            FormatId::MrSid => "mrsid",
            FormatId::Hdf => "hdf",
        }
    }
}

impl std::fmt::Display for FormatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    /// Format identifier.
    pub id: FormatId,
    /// Human readable name.
    pub display_name: &'static str,
    /// Lowercase suffixes, including the leading dot.
    pub extensions: &'static [&'static str],
    /// Whether a decoder exists.
    pub supported: bool,
    /// Conversion advice for unsupported formats; empty otherwise.
    pub guidance: &'static str,
}

const GDAL_TO_GEOTIFF: &str =
    "Convert to GeoTIFF first, e.g. `gdal_translate -of GTiff input output.tif`.";

static FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        id: FormatId::UsgsDem,
        display_name: "USGS DEM",
        extensions: &[".dem"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::Dted,
        display_name: "DTED",
        extensions: &[".dt0", ".dt1", ".dt2"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::AsciiXyz,
        display_name: "ASCII XYZ",
        extensions: &[".xyz", ".csv", ".txt", ".pts"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::LasLaz,
        display_name: "LAS/LAZ point cloud",
        extensions: &[".las", ".laz", ".copc.laz"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::ImageWorldFile,
        display_name: "Image + world file",
        extensions: &[".png", ".jpg", ".jpeg", ".bmp", ".gif", ".webp"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::GeoTiff,
        display_name: "GeoTIFF",
        extensions: &[".tif", ".tiff", ".gtiff"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::SrtmHgt,
        display_name: "SRTM HGT",
        extensions: &[".hgt"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::EsriAsciiGrid,
        display_name: "ESRI ASCII Grid",
        extensions: &[".asc"],
        supported: true,
        guidance: "",
    },
    FormatDescriptor {
        id: FormatId::Jpeg2000,
        display_name: "JPEG 2000",
        extensions: &[".jp2", ".j2k", ".jpx"],
        supported: false,
        guidance: GDAL_TO_GEOTIFF,
    },
    FormatDescriptor {
        id: FormatId::GeoPackage,
        display_name: "GeoPackage",
        extensions: &[".gpkg"],
        supported: false,
        guidance: "Export the elevation tile layer to GeoTIFF, e.g. `gdal_translate -of GTiff input.gpkg output.tif`.",
    },
    FormatDescriptor {
        id: FormatId::Ecw,
        display_name: "ECW",
        extensions: &[".ecw"],
        supported: false,
        guidance: "ECW is a proprietary codec. Convert with a licensed GDAL build or ERDAS tooling to GeoTIFF.",
    },
    FormatDescriptor {
        id: FormatId::MrSid,
        display_name: "MrSID",
        extensions: &[".sid"],
        supported: false,
        guidance: "MrSID is a proprietary codec. Convert with the MrSID decode tool or a licensed GDAL build to GeoTIFF.",
    },
    FormatDescriptor {
        id: FormatId::Hdf,
        display_name: "HDF",
        extensions: &[".hdf", ".h4", ".hdf4", ".h5", ".hdf5", ".he5"],
        supported: false,
        guidance: "Extract the elevation subdataset to GeoTIFF, e.g. `gdal_translate HDF5:\"input.h5\"://elevation output.tif`.",
    },
];

/// Every registered format, supported or not.
pub fn descriptors() -> &'static [FormatDescriptor] {
    FORMATS
}

/// Look up a descriptor by id.
pub fn descriptor(id: FormatId) -> Option<&'static FormatDescriptor> {
    FORMATS.iter().find(|d| d.id == id)
}

/// Classify a file name by its longest matching suffix.
///
/// Returns `None` for extensions the registry has never heard of.
pub fn classify(filename: &str) -> Option<&'static FormatDescriptor> {
    let name = filename.to_ascii_lowercase();
    let mut best: Option<(&'static FormatDescriptor, usize)> = None;

    for descriptor in FORMATS {
        for ext in descriptor.extensions {
            if name.ends_with(ext) && best.map_or(true, |(_, len)| ext.len() > len) {
                best = Some((descriptor, ext.len()));
            }
        }
    }

    best.map(|(descriptor, _)| descriptor)
}

/// World-file suffixes that may accompany an image of the given extension,
/// most specific first.
pub fn world_file_extensions(image_name: &str) -> Vec<String> {
    let lower = image_name.to_ascii_lowercase();
    let mut candidates = Vec::new();

    if let Some(dot) = lower.rfind('.') {
        let ext = &lower[dot + 1..];
        let mut chars = ext.chars();
        if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
            // `.png` -> `.pgw`, `.jpg` -> `.jgw`, plus `.pngw`
            candidates.push(format!(".{}{}w", first, last));
            candidates.push(format!(".{}w", ext));
        }
    }
    candidates.push(".wld".to_string());
    candidates
}
