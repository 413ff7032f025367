use crate::types::{CcorrError, CcorrResult, RasterGrid};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters for synthetic terrain generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Grid edge length in pixels
    pub size: usize,
    /// Horizontal pixel spacing, same units as elevation
    pub cell_size: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            size: 20,       // 20x20 grid, four ridges
            cell_size: 1.0, // unit-spaced raster
        }
    }
}

/// Elevation with derived slope and aspect grids
#[derive(Debug, Clone)]
pub struct TerrainFields {
    pub elevation: RasterGrid,
    /// Slope in degrees
    pub slope: RasterGrid,
    /// Aspect in compass degrees of the downslope direction, [0, 360)
    pub aspect: RasterGrid,
}

/// Synthetic terrain generator
pub struct TerrainGenerator {
    params: TerrainParams,
}

impl TerrainGenerator {
    /// Create a new terrain generator
    pub fn new(params: TerrainParams) -> Self {
        Self { params }
    }

    /// Create a generator for a unit-spaced grid of the given size
    pub fn with_size(size: usize) -> Self {
        Self::new(TerrainParams {
            size,
            ..TerrainParams::default()
        })
    }

    pub fn validate(&self) -> CcorrResult<()> {
        if self.params.size == 0 {
            return Err(CcorrError::InvalidConfiguration(
                "Grid size must be positive".to_string(),
            ));
        }
        if !(self.params.cell_size.is_finite() && self.params.cell_size > 0.0) {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Cell size must be positive and finite, got {}",
                self.params.cell_size
            )));
        }
        Ok(())
    }

    /// Generate elevation, slope and aspect for a square grid
    pub fn generate(&self) -> CcorrResult<TerrainFields> {
        self.validate()?;
        let size = self.params.size;

        log::debug!("Generating {}x{} synthetic terrain", size, size);

        let elevation = Self::ridge_elevation(size);
        let (slope, aspect) = compute_slope_aspect(&elevation, self.params.cell_size)?;

        Ok(TerrainFields {
            elevation,
            slope,
            aspect,
        })
    }

    /// Separable sin² ridge pattern: two full periods along each axis
    fn ridge_elevation(size: usize) -> RasterGrid {
        if size < 2 {
            return Array2::zeros((size, size));
        }

        let span = (size - 1) as f64;
        let profile: Array1<f64> = Array1::from_shape_fn(size, |k| {
            let s = (2.0 * PI * k as f64 / span).sin();
            s * s
        });

        Array2::from_shape_fn((size, size), |(i, j)| profile[i] * profile[j])
    }
}

/// Compute slope and aspect (both in degrees) with Horn's 3x3 method
///
/// Neighbours outside the grid are clamped to the nearest edge cell, so every
/// cell, including those of a 2x2 grid, uses the same stencil.
pub fn compute_slope_aspect(
    dem: &RasterGrid,
    cell_size: f64,
) -> CcorrResult<(RasterGrid, RasterGrid)> {
    let (rows, cols) = dem.dim();
    if rows == 0 || cols == 0 {
        return Err(CcorrError::InvalidConfiguration(
            "Elevation grid is empty".to_string(),
        ));
    }

    let mut slope = Array2::<f64>::zeros((rows, cols));
    let mut aspect = Array2::<f64>::zeros((rows, cols));

    let at = |i: isize, j: isize| -> f64 {
        let r = i.clamp(0, rows as isize - 1) as usize;
        let c = j.clamp(0, cols as isize - 1) as usize;
        dem[[r, c]]
    };

    for i in 0..rows as isize {
        for j in 0..cols as isize {
            // a b c
            // d e f
            // g h i   (rows increase southward)
            let a = at(i - 1, j - 1);
            let b = at(i - 1, j);
            let c = at(i - 1, j + 1);
            let d = at(i, j - 1);
            let f = at(i, j + 1);
            let g = at(i + 1, j - 1);
            let h = at(i + 1, j);
            let k = at(i + 1, j + 1);

            let dz_dx = ((c + 2.0 * f + k) - (a + 2.0 * d + g)) / (8.0 * cell_size);
            let dz_dy = ((g + 2.0 * h + k) - (a + 2.0 * b + c)) / (8.0 * cell_size);

            let (r, cc) = (i as usize, j as usize);
            slope[[r, cc]] = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan().to_degrees();
            aspect[[r, cc]] = downslope_azimuth(dz_dx, dz_dy);
        }
    }

    Ok((slope, aspect))
}

/// Compass bearing (degrees, clockwise from north) of steepest descent
fn downslope_azimuth(dz_dx: f64, dz_dy: f64) -> f64 {
    if dz_dx == 0.0 && dz_dy == 0.0 {
        return 0.0;
    }
    let bearing = (90.0 - dz_dy.atan2(-dz_dx).to_degrees()).rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ridge_elevation_range_and_symmetry() {
        let fields = TerrainGenerator::with_size(20).generate().unwrap();
        let elevation = &fields.elevation;

        assert_eq!(elevation.dim(), (20, 20));
        let max = elevation.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = elevation.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!(max <= 1.0 && max > 0.9);
        assert_abs_diff_eq!(min, 0.0, epsilon = 1e-12);

        for i in 0..20 {
            for j in 0..20 {
                assert_abs_diff_eq!(elevation[[i, j]], elevation[[j, i]], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_tilted_plane_aspect() {
        // Elevation rises to the east, so the surface faces west
        let dem = Array2::from_shape_fn((5, 5), |(_, j)| j as f64);
        let (slope, aspect) = compute_slope_aspect(&dem, 1.0).unwrap();

        assert_abs_diff_eq!(slope[[2, 2]], 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(aspect[[2, 2]], 270.0, epsilon = 1e-9);

        // Elevation rises to the south, so the surface faces north
        let dem = Array2::from_shape_fn((5, 5), |(i, _)| i as f64 * 2.0);
        let (slope, aspect) = compute_slope_aspect(&dem, 1.0).unwrap();
        assert_abs_diff_eq!(slope[[2, 2]], 2.0_f64.atan().to_degrees(), epsilon = 1e-9);
        assert_abs_diff_eq!(aspect[[2, 2]], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_terrain() {
        let dem = Array2::from_elem((4, 4), 3.0);
        let (slope, aspect) = compute_slope_aspect(&dem, 1.0).unwrap();
        assert!(slope.iter().all(|&s| s == 0.0));
        assert!(aspect.iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_cell_size_scales_slope() {
        let dem = Array2::from_shape_fn((5, 5), |(_, j)| j as f64);
        let (slope, _) = compute_slope_aspect(&dem, 2.0).unwrap();
        assert_abs_diff_eq!(slope[[2, 2]], 0.5_f64.atan().to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_smallest_grid() {
        let fields = TerrainGenerator::with_size(2).generate().unwrap();
        assert_eq!(fields.slope.dim(), (2, 2));
        assert_eq!(fields.aspect.dim(), (2, 2));
        assert!(fields.slope.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_aspect_range() {
        let fields = TerrainGenerator::with_size(20).generate().unwrap();
        assert!(fields.aspect.iter().all(|&a| (0.0..360.0).contains(&a)));
        assert!(fields.slope.iter().all(|&s| (0.0..90.0).contains(&s)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = TerrainGenerator::with_size(0).generate();
        assert!(matches!(result, Err(CcorrError::InvalidConfiguration(_))));
    }
}
