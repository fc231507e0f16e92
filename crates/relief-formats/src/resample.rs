//! Scatter-to-grid resampling shared by the point decoders.
//!
//! Points are binned into a regular grid by averaging every sample that
//! lands in a cell. Cells no point reached are then filled by
//! [`fill_gaps`], so a resampled grid never carries holes.

use crate::fields::elevation;
use crate::{DecodeError, DecodeOptions, Result};
use relief_grid::{CrsHint, ElevationGrid, PointRecord};
use tracing::{debug, trace};

/// Per-cell running sum and count.
#[derive(Debug, Clone)]
pub(crate) struct CellAccumulator {
    width: usize,
    height: usize,
    sum: Vec<f64>,
    count: Vec<u32>,
}

impl CellAccumulator {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            sum: vec![0.0; width * height],
            count: vec![0; width * height],
        }
    }

    pub fn add(&mut self, col: usize, row: usize, z: f64) {
        let idx = row.min(self.height - 1) * self.width + col.min(self.width - 1);
        self.sum[idx] += z;
        self.count[idx] += 1;
    }

    /// Average every cell and fill the empty ones.
    pub fn finish(self, fill_passes: usize) -> Vec<f32> {
        let mut values = vec![0.0f32; self.width * self.height];
        let mut filled = vec![false; self.width * self.height];
        for (idx, (&sum, &count)) in self.sum.iter().zip(&self.count).enumerate() {
            if count > 0 {
                values[idx] = (sum / count as f64) as f32;
                filled[idx] = true;
            }
        }
        fill_gaps(&mut values, &mut filled, self.width, self.height, fill_passes);
        values
    }
}

/// Fill unfilled cells in place.
///
/// Runs `passes` rounds of 3x3 neighbour averaging, each reading from a
/// snapshot of the previous round so the result does not depend on scan
/// order. Anything still empty afterwards gets the mean of all filled
/// cells. On return every entry of `filled` is `true`.
pub fn fill_gaps(values: &mut [f32], filled: &mut [bool], width: usize, height: usize, passes: usize) {
    debug_assert_eq!(values.len(), width * height);
    debug_assert_eq!(filled.len(), width * height);

    for pass in 0..passes {
        if filled.iter().all(|f| *f) {
            return;
        }

        let snapshot_values = values.to_vec();
        let snapshot_filled = filled.to_vec();
        let mut newly_filled = 0usize;

        for row in 0..height {
            for col in 0..width {
                let idx = row * width + col;
                if snapshot_filled[idx] {
                    continue;
                }

                let mut sum = 0.0f64;
                let mut n = 0u32;
                for nr in row.saturating_sub(1)..=(row + 1).min(height - 1) {
                    for nc in col.saturating_sub(1)..=(col + 1).min(width - 1) {
                        let nidx = nr * width + nc;
                        if snapshot_filled[nidx] {
                            sum += snapshot_values[nidx] as f64;
                            n += 1;
                        }
                    }
                }

                if n > 0 {
                    values[idx] = (sum / n as f64) as f32;
                    filled[idx] = true;
                    newly_filled += 1;
                }
            }
        }

        trace!("Gap fill pass {} filled {} cells", pass + 1, newly_filled);
    }

    let (sum, n) = values
        .iter()
        .zip(filled.iter())
        .filter(|(_, f)| **f)
        .fold((0.0f64, 0usize), |(s, n), (v, _)| (s + *v as f64, n + 1));
    let mean = if n > 0 { (sum / n as f64) as f32 } else { 0.0 };

    let mut remaining = 0usize;
    for (v, f) in values.iter_mut().zip(filled.iter_mut()) {
        if !*f {
            *v = mean;
            *f = true;
            remaining += 1;
        }
    }
    if remaining > 0 {
        debug!("Gap fill assigned global mean {} to {} cells", mean, remaining);
    }
}

/// Bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl PointBounds {
    /// Bounds of `points`, `None` when empty.
    pub fn of(points: &[PointRecord]) -> Option<Self> {
        let first = points.first()?;
        let init = PointBounds {
            min_x: first.x,
            min_y: first.y,
            min_z: first.z,
            max_x: first.x,
            max_y: first.y,
            max_z: first.z,
        };
        Some(points.iter().fold(init, |b, p| PointBounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            min_z: b.min_z.min(p.z),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
            max_z: b.max_z.max(p.z),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the box fits inside longitude/latitude degree ranges.
    pub fn looks_geographic(&self) -> bool {
        self.min_x >= -180.0 && self.max_x <= 180.0 && self.min_y >= -90.0 && self.max_y <= 90.0
    }
}

/// Grid dimensions for `point_count` points spread over `bounds`.
///
/// The longer side is `min(max_resolution, ceil(sqrt(point_count)))`; the
/// shorter follows the aspect ratio. Degenerate extents collapse to one
/// cell along that axis.
pub fn grid_dimensions(bounds: &PointBounds, point_count: usize, max_resolution: usize) -> (usize, usize) {
    let density = (point_count as f64).sqrt().ceil() as usize;
    let target = density.min(max_resolution).max(1);
    let (ex, ey) = (bounds.width(), bounds.height());

    match (ex > 0.0, ey > 0.0) {
        (false, false) => (1, 1),
        (true, false) => (target, 1),
        (false, true) => (1, target),
        (true, true) if ex >= ey => (target, ((target as f64 * ey / ex).round() as usize).max(1)),
        (true, true) => (((target as f64 * ex / ey).round() as usize).max(1), target),
    }
}

fn usable(p: &PointRecord) -> bool {
    p.x.is_finite() && p.y.is_finite() && elevation(p.z).is_some()
}

/// Bin scattered points into a gap-free elevation grid.
///
/// Non-finite points, and points whose elevation overflows `f32`, are ignored. Fails with `EmptyDataset` when no
/// finite point remains.
pub fn grid_points(
    format: &'static str,
    points: &[PointRecord],
    options: &DecodeOptions,
) -> Result<ElevationGrid> {
    let finite: Vec<PointRecord>;
    let points: &[PointRecord] = if points.iter().all(usable) {
        points
    } else {
        finite = points
            .iter()
            .copied()
            .filter(usable)
            .collect();
        &finite
    };

    let bounds = PointBounds::of(points).ok_or(DecodeError::EmptyDataset { format })?;
    let (width, height) = grid_dimensions(&bounds, points.len(), options.max_resolution);

    let pixel_x = if bounds.width() > 0.0 { bounds.width() / width as f64 } else { 1.0 };
    let pixel_y = if bounds.height() > 0.0 { bounds.height() / height as f64 } else { 1.0 };

    debug!(
        "Resampling {} points into {}x{} grid, cell {}x{}",
        points.len(),
        width,
        height,
        pixel_x,
        pixel_y
    );

    let mut cells = CellAccumulator::new(width, height);
    for p in points {
        let col = ((p.x - bounds.min_x) / pixel_x).floor() as usize;
        let row = ((bounds.max_y - p.y) / pixel_y).floor() as usize;
        cells.add(col, row, p.z);
    }
    let elevations = cells.finish(options.fill_passes);

    let crs = bounds.looks_geographic().then_some(CrsHint::Geographic);

    Ok(ElevationGrid::builder(width, height, elevations)
        .pixel_size(pixel_x, -pixel_y)
        .origin(bounds.min_x, bounds.max_y)
        .crs(crs)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn bounds(w: f64, h: f64) -> PointBounds {
        PointBounds {
            min_x: 0.0,
            min_y: 0.0,
            min_z: 0.0,
            max_x: w,
            max_y: h,
            max_z: 0.0,
        }
    }

    #[test]
    fn test_dimensions_follow_aspect() {
        assert_eq!(grid_dimensions(&bounds(200.0, 100.0), 10_000, 512), (100, 50));
        assert_eq!(grid_dimensions(&bounds(100.0, 200.0), 10_000, 512), (50, 100));
        assert_eq!(grid_dimensions(&bounds(1.0, 1.0), 10_000_000, 512), (512, 512));
        assert_eq!(grid_dimensions(&bounds(1000.0, 1.0), 100, 512), (10, 1));
    }

    #[test]
    fn test_degenerate_extents() {
        assert_eq!(grid_dimensions(&bounds(0.0, 0.0), 50, 512), (1, 1));
        assert_eq!(grid_dimensions(&bounds(10.0, 0.0), 16, 512), (4, 1));
        assert_eq!(grid_dimensions(&bounds(0.0, 10.0), 16, 512), (1, 4));
    }

    #[test]
    fn test_fill_gaps_neighbour_average() {
        // Centre cell empty, ring filled with 1..=8.
        let mut values = vec![1.0, 2.0, 3.0, 4.0, 0.0, 5.0, 6.0, 7.0, 8.0];
        let mut filled = vec![true, true, true, true, false, true, true, true, true];
        fill_gaps(&mut values, &mut filled, 3, 3, 3);
        assert_relative_eq!(values[4], 4.5);
        assert!(filled.iter().all(|f| *f));
    }

    #[test]
    fn test_fill_gaps_uses_snapshot() {
        // 1x4 strip: only the first cell is filled. One pass may reach the
        // second cell but not the third.
        let mut values = vec![10.0, 0.0, 0.0, 0.0];
        let mut filled = vec![true, false, false, false];
        fill_gaps(&mut values, &mut filled, 4, 1, 1);
        assert_eq!(values[1], 10.0);
        // The rest fall back to the global mean of the filled cells.
        assert_eq!(values[2], 10.0);
        assert_eq!(values[3], 10.0);
    }

    #[test]
    fn test_fill_gaps_global_mean_after_passes() {
        let mut values = vec![0.0; 25];
        let mut filled = vec![false; 25];
        values[0] = 2.0;
        filled[0] = true;
        fill_gaps(&mut values, &mut filled, 5, 5, 0);
        assert!(values.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_grid_points_empty() {
        let err = grid_points("las", &[], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyDataset { format: "las" }));

        let nan = [PointRecord::new(f64::NAN, 0.0, 1.0)];
        assert!(grid_points("las", &nan, &DecodeOptions::default()).is_err());
    }

    #[test]
    fn test_overflowing_elevations_are_dropped() {
        let points = [
            PointRecord::new(0.0, 0.0, 1.0),
            PointRecord::new(1.0, 1.0, 1e39),
            PointRecord::new(1.0, 0.0, 3.0),
        ];
        let grid = grid_points("las", &points, &DecodeOptions::default()).unwrap();
        assert!(grid.elevations().iter().all(|v| v.is_finite()));
        assert_eq!(grid.height(), 1);
    }

    #[test]
    fn test_grid_points_places_corners() {
        let points = [
            PointRecord::new(0.0, 0.0, 1.0),
            PointRecord::new(10.0, 0.0, 2.0),
            PointRecord::new(0.0, 10.0, 3.0),
            PointRecord::new(10.0, 10.0, 4.0),
        ];
        let grid = grid_points("las", &points, &DecodeOptions::default()).unwrap();
        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(grid.elevations(), &[3.0, 4.0, 1.0, 2.0]);
        assert_relative_eq!(grid.pixel_size().x, 5.0);
        assert_relative_eq!(grid.pixel_size().y, -5.0);
        assert_relative_eq!(grid.origin().y, 10.0);
        assert_eq!(grid.crs_hint(), Some(CrsHint::Geographic));
    }

    #[test]
    fn test_projected_bounds_have_no_crs() {
        let points = [
            PointRecord::new(500_000.0, 5_200_000.0, 1.0),
            PointRecord::new(500_100.0, 5_200_100.0, 2.0),
        ];
        let grid = grid_points("xyz", &points, &DecodeOptions::default()).unwrap();
        assert_eq!(grid.crs_hint(), None);
    }

    #[test]
    fn test_random_clouds_have_no_holes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let n = rng.gen_range(1..2_000);
            let points: Vec<PointRecord> = (0..n)
                .map(|_| {
                    // Clustered along one edge so most cells start empty.
                    let x = rng.gen_range(0.0..1000.0);
                    let y = rng.gen_range(0.0..1000.0f64).powi(4) / 1e9;
                    PointRecord::new(x, y, rng.gen_range(-50.0..3000.0))
                })
                .collect();
            let grid = grid_points("las", &points, &DecodeOptions::default()).unwrap();
            assert_eq!(grid.elevations().len(), grid.width() * grid.height());
            assert!(grid.elevations().iter().all(|v| v.is_finite()));
        }
    }
}
