//! YAML configuration for the `relief` binary.

use anyhow::{Context, Result};
use relief_formats::DecodeOptions;
use relief_surface::SurfaceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file. Every key is optional.
///
/// ```yaml
/// decode:
///   max_points: 2000000
///   max_resolution: 1024
/// surface:
///   max_slope_degrees: 45.0
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefConfig {
    pub decode: DecodeOptions,
    pub surface: SurfaceOptions,
}

impl ReliefConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty file is valid and means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Invalid relief configuration")
    }

    /// Load from a file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_yaml(&text).with_context(|| format!("In {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(ReliefConfig::from_yaml("").unwrap(), ReliefConfig::default());
        assert_eq!(ReliefConfig::load(None).unwrap(), ReliefConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ReliefConfig::from_yaml("decode:\n  max_points: 1000\nsurface:\n  aspect_lightness: 0.4\n").unwrap();
        assert_eq!(config.decode.max_points, 1000);
        assert_eq!(config.decode.max_resolution, relief_formats::DEFAULT_MAX_RESOLUTION);
        assert_eq!(config.surface.aspect_lightness, 0.4);
        assert_eq!(config.surface.max_slope_degrees, 60.0);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(ReliefConfig::from_yaml("decode:\n  max_points: many\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ReliefConfig::load(Some(Path::new("/nonexistent/relief.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
