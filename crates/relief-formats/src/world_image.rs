//! Raster image plus optional world-file sidecar.
//!
//! Ordinary 8-bit imagery carries no elevation, so pixels are converted to
//! luminance and the grid is marked [`SampleKind::LuminanceSurrogate`].
//! Consumers must treat such grids as a visual approximation, not a DEM.
//! Single-channel 16-bit images are the usual way heightmaps are exported
//! and are kept as raw measured values.

use crate::decode::{DecodeInput, Decoded};
use crate::fields::parse_real;
use crate::{DecodeOptions, DecodeWarning, Result};
use image::DynamicImage;
use relief_grid::{ElevationGrid, SampleKind};
use tracing::{debug, warn};

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// The six affine terms of a world file.
///
/// `(c, f)` locate the centre of the upper-left pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub a: f64,
    pub d: f64,
    pub b: f64,
    pub e: f64,
    pub c: f64,
    pub f: f64,
}

impl WorldFile {
    /// Parse the first six numeric lines. `None` if fewer are present.
    pub fn parse(text: &str) -> Option<Self> {
        let mut values = text.lines().filter(|l| !l.trim().is_empty()).map(parse_real);
        let mut next = || values.next().flatten();
        Some(WorldFile {
            a: next()?,
            d: next()?,
            b: next()?,
            e: next()?,
            c: next()?,
            f: next()?,
        })
    }

    /// Upper-left corner of the upper-left pixel.
    pub fn corner(&self) -> (f64, f64) {
        (self.c - self.a / 2.0, self.f - self.e / 2.0)
    }

    fn is_rotated(&self) -> bool {
        self.b != 0.0 || self.d != 0.0
    }
}

fn luminance(image: &DynamicImage) -> Vec<f32> {
    image
        .to_rgb8()
        .pixels()
        .map(|p| LUMA[0] * p[0] as f32 + LUMA[1] * p[1] as f32 + LUMA[2] * p[2] as f32)
        .collect()
}

pub(crate) fn decode(input: &DecodeInput<'_>, _options: &DecodeOptions) -> Result<Decoded> {
    let image = image::load_from_memory(input.buffer)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut warnings = Vec::new();

    let (elevations, kind) = match &image {
        DynamicImage::ImageLuma16(buffer) => {
            debug!("Image: 16-bit grayscale {}x{}, reading as heightmap", width, height);
            (buffer.pixels().map(|p| p[0] as f32).collect(), SampleKind::Measured)
        }
        other => {
            debug!("Image: {:?} {}x{}, using luminance surrogate", other.color(), width, height);
            (luminance(other), SampleKind::LuminanceSurrogate)
        }
    };

    let mut builder = ElevationGrid::builder(width, height, elevations).kind(kind);

    match input.companion.map(WorldFile::parse) {
        Some(Some(world)) if world.a != 0.0 && world.e != 0.0 => {
            if world.is_rotated() {
                debug!("Image: world file rotation terms ignored");
            }
            let (x, y) = world.corner();
            builder = builder.pixel_size(world.a, world.e).origin(x, y);
        }
        Some(_) => {
            warn!("Image: world file unreadable, using pixel coordinates");
            warnings.push(DecodeWarning::LayoutMismatch {
                offset: 0,
                expected: "six-term world file",
            });
        }
        None => {}
    }

    Ok(Decoded {
        grid: builder.build()?,
        warnings,
    })
}
