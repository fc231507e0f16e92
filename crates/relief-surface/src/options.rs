//! Rendering mode and tunables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which surface property a texture shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    /// Grayscale steepness.
    Slope,
    /// Hue by downslope compass direction.
    Aspect,
}

impl fmt::Display for SurfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceMode::Slope => write!(f, "slope"),
            SurfaceMode::Aspect => write!(f, "aspect"),
        }
    }
}

impl FromStr for SurfaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slope" => Ok(SurfaceMode::Slope),
            "aspect" => Ok(SurfaceMode::Aspect),
            other => Err(format!("unknown surface mode '{}', expected slope or aspect", other)),
        }
    }
}

/// Colour-mapping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceOptions {
    /// Slope in radians below which a cell counts as flat.
    pub flat_threshold: f64,
    /// Slope in degrees that maps to full white; steeper slopes clip.
    pub max_slope_degrees: f64,
    /// HSL saturation of the aspect hue wheel.
    pub aspect_saturation: f64,
    /// HSL lightness of the aspect hue wheel.
    pub aspect_lightness: f64,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            flat_threshold: 0.01,
            max_slope_degrees: 60.0,
            aspect_saturation: 0.65,
            aspect_lightness: 0.5,
        }
    }
}
