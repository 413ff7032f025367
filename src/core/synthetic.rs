use crate::core::illumination::cos_incidence;
use crate::core::terrain::{TerrainFields, TerrainGenerator, TerrainParams};
use crate::types::{CcorrError, CcorrResult, RasterGrid, ReflectanceCube, SolarGeometry};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters for the synthetic multi-band scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticImageParams {
    /// Grid edge length in pixels
    pub size: usize,
    /// Number of spectral channels
    pub channels: usize,
    /// Upper bound of the additive uniform noise, before normalization
    pub noise_amplitude: f64,
    /// Seed for the noise generator
    pub seed: u64,
    /// Horizontal pixel spacing of the terrain
    pub cell_size: f64,
}

impl Default for SyntheticImageParams {
    fn default() -> Self {
        Self {
            size: 20,
            channels: 10,
            noise_amplitude: 5e-3,
            seed: 4,
            cell_size: 1.0,
        }
    }
}

/// Generated scene: reflectance cube and the terrain it was shaded with
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    /// Reflectance (rows x cols x channels), global maximum of 1
    pub cube: ReflectanceCube,
    pub terrain: TerrainFields,
    /// Cosine of local solar incidence used to shade the cube
    pub illumination: RasterGrid,
}

/// Builds terrain-shaded multi-band imagery
pub struct SyntheticImageGenerator {
    params: SyntheticImageParams,
}

impl SyntheticImageGenerator {
    pub fn new(params: SyntheticImageParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(SyntheticImageParams::default())
    }

    pub fn validate(&self) -> CcorrResult<()> {
        if self.params.size == 0 {
            return Err(CcorrError::InvalidConfiguration(
                "Image size must be positive".to_string(),
            ));
        }
        if self.params.channels == 0 {
            return Err(CcorrError::InvalidConfiguration(
                "Channel count must be positive".to_string(),
            ));
        }
        if !(self.params.noise_amplitude.is_finite() && self.params.noise_amplitude > 0.0) {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Noise amplitude must be positive and finite, got {}",
                self.params.noise_amplitude
            )));
        }
        Ok(())
    }

    /// Generate a scene under the given sun position
    pub fn generate(&self, solar: &SolarGeometry) -> CcorrResult<SyntheticScene> {
        self.validate()?;
        solar.validate()?;

        let SyntheticImageParams {
            size,
            channels,
            noise_amplitude,
            seed,
            cell_size,
        } = self.params;

        log::info!(
            "Generating synthetic {}x{}x{} scene (seed {})",
            size,
            size,
            channels,
            seed
        );

        let terrain = TerrainGenerator::new(TerrainParams { size, cell_size }).generate()?;
        let illumination = cos_incidence(&terrain.slope, &terrain.aspect, solar)?;

        // Noise is drawn in row, col, channel order
        let mut rng = StdRng::seed_from_u64(seed);
        let mut raw = Vec::with_capacity(size * size * channels);
        for i in 0..size {
            for j in 0..size {
                let shade = illumination[[i, j]];
                for _ in 0..channels {
                    raw.push(shade + rng.gen::<f64>() * noise_amplitude);
                }
            }
        }
        let cube = normalize(Array3::from_shape_vec((size, size, channels), raw)?);

        log::debug!("Synthetic scene normalized to unit maximum");

        Ok(SyntheticScene {
            cube,
            terrain,
            illumination,
        })
    }
}

/// Scale the cube so its global maximum equals 1
///
/// A zero maximum yields NaN/Inf values instead of an error.
pub fn normalize(mut cube: ReflectanceCube) -> ReflectanceCube {
    let max = cube.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        log::warn!("Normalizing cube with non-positive maximum {}", max);
    }
    cube.mapv_inplace(|v| v / max);
    cube
}

/// Generate a scene and return `(cube, elevation, slope, aspect)`
pub fn generate(
    size: usize,
    channels: usize,
    zenith: f64,
    azimuth: f64,
    seed: u64,
) -> CcorrResult<(ReflectanceCube, RasterGrid, RasterGrid, RasterGrid)> {
    let generator = SyntheticImageGenerator::new(SyntheticImageParams {
        size,
        channels,
        seed,
        ..SyntheticImageParams::default()
    });
    let scene = generator.generate(&SolarGeometry::new(zenith, azimuth))?;
    let TerrainFields {
        elevation,
        slope,
        aspect,
    } = scene.terrain;
    Ok((scene.cube, elevation, slope, aspect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;

    #[test]
    fn test_cube_shape_and_maximum() {
        let scene = SyntheticImageGenerator::standard()
            .generate(&SolarGeometry::default())
            .unwrap();

        assert_eq!(scene.cube.dim(), (20, 20, 10));
        let max = scene.cube.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_noise_is_per_channel() {
        let scene = SyntheticImageGenerator::standard()
            .generate(&SolarGeometry::default())
            .unwrap();

        let first = scene.cube.index_axis(Axis(2), 0);
        let second = scene.cube.index_axis(Axis(2), 1);
        assert_ne!(first, second);

        // Channels differ from the illumination only by the scaled noise
        let max_raw = scene.illumination.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for (&b, &g) in first.iter().zip(scene.illumination.iter()) {
            let noise = b * (max_raw + 5e-3) - g;
            assert!(noise > -1e-3 && noise < 1e-2, "noise {} out of range", noise);
        }
    }

    #[test]
    fn test_seed_changes_noise() {
        let (a, ..) = generate(8, 3, 0.5, 0.8, 1).unwrap();
        let (b, ..) = generate(8, 3, 0.5, 0.8, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_channels_rejected() {
        let result = generate(8, 0, 0.5, 0.8, 1);
        assert!(matches!(result, Err(CcorrError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_normalize_zero_max_propagates_nan() {
        let cube = Array3::from_elem((2, 2, 1), 0.0);
        assert!(normalize(cube).iter().all(|v| v.is_nan()));

        let cube = Array3::from_shape_vec((1, 2, 1), vec![-2.0, -1.0]).unwrap();
        let scaled = normalize(cube);
        assert_eq!(scaled[[0, 1, 0]], 1.0);
        assert_eq!(scaled[[0, 0, 0]], 2.0);
    }

    #[test]
    fn test_sun_below_horizon_rejected() {
        for zenith in [std::f64::consts::FRAC_PI_2, std::f64::consts::PI, -0.1] {
            let result = generate(20, 3, zenith, 0.0, 4);
            assert!(matches!(result, Err(CcorrError::InvalidConfiguration(_))));
        }
    }
}
