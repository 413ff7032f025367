use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Real-valued raster sample (elevation, angle, reflectance)
pub type RasterValue = f64;

/// 2D raster grid (rows x cols)
pub type RasterGrid = Array2<RasterValue>;

/// 3D multi-band reflectance data (rows x cols x channels)
pub type ReflectanceCube = Array3<RasterValue>;

/// Sun position for a single acquisition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarGeometry {
    /// Solar zenith angle in radians (0 = sun overhead)
    pub zenith: f64,
    /// Solar azimuth angle in radians (compass bearing)
    pub azimuth: f64,
}

impl SolarGeometry {
    pub fn new(zenith: f64, azimuth: f64) -> Self {
        Self { zenith, azimuth }
    }

    /// Build from angles given in degrees
    pub fn from_degrees(zenith_deg: f64, azimuth_deg: f64) -> Self {
        Self::new(zenith_deg.to_radians(), azimuth_deg.to_radians())
    }

    /// Cosine of the incidence angle on a horizontal surface
    pub fn cos_zenith(&self) -> f64 {
        crate::core::illumination::flat_illumination(self.zenith)
    }

    pub fn validate(&self) -> CcorrResult<()> {
        if !self.zenith.is_finite() || !self.azimuth.is_finite() {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Solar angles must be finite (zenith={}, azimuth={})",
                self.zenith, self.azimuth
            )));
        }
        if !(0.0..FRAC_PI_2).contains(&self.zenith) {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Solar zenith must lie in [0, pi/2) so the sun is above the horizon, got {}",
                self.zenith
            )));
        }
        Ok(())
    }
}

impl Default for SolarGeometry {
    fn default() -> Self {
        Self::from_degrees(30.0, 45.0)
    }
}

/// Error types for terrain illumination processing
#[derive(Debug, thiserror::Error)]
pub enum CcorrError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type for terrain illumination operations
pub type CcorrResult<T> = Result<T, CcorrError>;
