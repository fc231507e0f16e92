//! Tunable decode parameters.

use serde::{Deserialize, Serialize};

/// Default cap on retained point-cloud samples.
pub const DEFAULT_MAX_POINTS: u64 = 10_000_000;

/// Default upper bound on the longer side of a resampled point grid.
pub const DEFAULT_MAX_RESOLUTION: usize = 512;

/// Default number of neighbour-averaging passes before the global-mean fill.
pub const DEFAULT_FILL_PASSES: usize = 3;

/// Parameters threaded through every decode call.
///
/// Loadable from YAML; missing keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Maximum number of points kept from a point cloud.
    pub max_points: u64,
    /// Longest side of a grid resampled from scattered points.
    pub max_resolution: usize,
    /// Neighbour-averaging passes run over empty resampled cells.
    pub fill_passes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            max_resolution: DEFAULT_MAX_RESOLUTION,
            fill_passes: DEFAULT_FILL_PASSES,
        }
    }
}

impl DecodeOptions {
    /// Options with a custom point cap.
    pub fn with_max_points(mut self, max_points: u64) -> Self {
        self.max_points = max_points.max(1);
        self
    }

    /// Options with a custom resolution cap.
    pub fn with_max_resolution(mut self, max_resolution: usize) -> Self {
        self.max_resolution = max_resolution.max(1);
        self
    }

    /// Stride that keeps at most `max_points` out of `total`, spread over
    /// the whole source.
    pub fn point_stride(&self, total: u64) -> u64 {
        let cap = self.max_points.max(1);
        if total <= cap {
            1
        } else {
            total.div_ceil(cap)
        }
    }
}
