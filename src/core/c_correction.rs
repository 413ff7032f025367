use crate::core::illumination::flat_illumination;
use crate::core::statistics::{linear_fit, pearson_correlation, LinearFit};
use crate::types::{CcorrError, CcorrResult, RasterGrid, ReflectanceCube};
use ndarray::{Array1, Axis, Zip};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Parameters for the C-correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CCorrectionParams {
    /// Channels are corrected only when their illumination/brightness
    /// correlation is strictly above this value
    pub correlation_threshold: f64,
}

impl Default for CCorrectionParams {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.5,
        }
    }
}

/// Outcome of the per-channel regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// Non-zero fitted slope and finite correction factor
    Valid,
    /// Zero fitted slope (typically flat illumination); factor is Inf or NaN
    Degenerate,
}

/// Regression results for one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCorrection {
    pub channel: usize,
    pub slope: f64,
    pub intercept: f64,
    /// C factor, `intercept / slope`
    pub factor: f64,
    /// Pearson correlation between illumination and brightness
    pub correlation: f64,
    pub status: FitStatus,
    /// Whether the correction was applied to this channel
    pub correctable: bool,
}

/// Anomalies a caller should look at before trusting the output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionDiagnostics {
    pub correctable_channels: Vec<usize>,
    pub degenerate_channels: Vec<usize>,
    /// Count of NaN/Inf output pixels, per channel
    pub non_finite_pixels: Vec<usize>,
}

impl CorrectionDiagnostics {
    pub fn has_anomalies(&self) -> bool {
        !self.degenerate_channels.is_empty() || self.non_finite_pixels.iter().any(|&n| n > 0)
    }
}

/// Corrected cube with per-channel regression results
#[derive(Debug, Clone)]
pub struct CCorrectionResult {
    pub corrected: ReflectanceCube,
    pub channels: Vec<ChannelCorrection>,
    pub diagnostics: CorrectionDiagnostics,
}

impl CCorrectionResult {
    pub fn factors(&self) -> Array1<f64> {
        self.channels.iter().map(|c| c.factor).collect()
    }

    pub fn correlations(&self) -> Array1<f64> {
        self.channels.iter().map(|c| c.correlation).collect()
    }

    pub fn correctable_channels(&self) -> &[usize] {
        &self.diagnostics.correctable_channels
    }
}

/// C-correction processor
pub struct CCorrector {
    params: CCorrectionParams,
}

impl CCorrector {
    pub fn new(params: CCorrectionParams) -> Self {
        Self { params }
    }

    /// Create a corrector with the 0.5 correlation gate
    pub fn standard() -> Self {
        Self::new(CCorrectionParams::default())
    }

    pub fn validate(&self) -> CcorrResult<()> {
        let t = self.params.correlation_threshold;
        if !(t.is_finite() && (-1.0..=1.0).contains(&t)) {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Correlation threshold must lie in [-1, 1], got {}",
                t
            )));
        }
        Ok(())
    }

    /// Fit every channel of `cube` against `illumination`
    pub fn fit_channels(
        &self,
        cube: &ReflectanceCube,
        illumination: &RasterGrid,
    ) -> CcorrResult<Vec<ChannelCorrection>> {
        self.validate()?;
        check_inputs(cube, illumination)?;

        let samples: Array1<f64> = illumination.iter().cloned().collect();
        let channels = cube.dim().2;

        log::debug!(
            "Fitting {} channels over {} samples",
            channels,
            samples.len()
        );

        #[cfg(feature = "parallel")]
        let fits = (0..channels)
            .into_par_iter()
            .map(|i| self.fit_channel(cube, &samples, i))
            .collect::<CcorrResult<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let fits = (0..channels)
            .map(|i| self.fit_channel(cube, &samples, i))
            .collect::<CcorrResult<Vec<_>>>()?;

        Ok(fits)
    }

    fn fit_channel(
        &self,
        cube: &ReflectanceCube,
        samples: &Array1<f64>,
        channel: usize,
    ) -> CcorrResult<ChannelCorrection> {
        let brightness: Array1<f64> = cube.index_axis(Axis(2), channel).iter().cloned().collect();

        let LinearFit { slope, intercept } = linear_fit(samples.view(), brightness.view())?;
        let correlation = pearson_correlation(samples.view(), brightness.view())?;

        // slope == 0 yields ±Inf or NaN; kept as the reported factor
        let factor = intercept / slope;
        let status = if slope == 0.0 || !factor.is_finite() {
            FitStatus::Degenerate
        } else {
            FitStatus::Valid
        };

        // NaN correlations never qualify
        let correctable =
            correlation.is_finite() && correlation > self.params.correlation_threshold;

        Ok(ChannelCorrection {
            channel,
            slope,
            intercept,
            factor,
            correlation,
            status,
            correctable,
        })
    }

    /// Apply the correction to every channel that passes the correlation gate
    ///
    /// Qualifying channels become `cube · (cos z + c) / (illumination + c)`;
    /// all other channels are copied unchanged.
    pub fn correct(
        &self,
        cube: &ReflectanceCube,
        illumination: &RasterGrid,
        zenith: f64,
    ) -> CcorrResult<CCorrectionResult> {
        if !zenith.is_finite() {
            return Err(CcorrError::InvalidConfiguration(format!(
                "Solar zenith must be finite, got {}",
                zenith
            )));
        }

        log::info!("Applying C-correction to {:?} cube", cube.dim());

        let channels = self.fit_channels(cube, illumination)?;
        let cos_z = flat_illumination(zenith);

        let mut corrected = cube.clone();
        for fit in channels.iter().filter(|c| c.correctable) {
            let c = fit.factor;
            Zip::from(corrected.index_axis_mut(Axis(2), fit.channel))
                .and(cube.index_axis(Axis(2), fit.channel))
                .and(illumination)
                .for_each(|out, &value, &cos_i| {
                    *out = value * (cos_z + c) / (cos_i + c);
                });
        }

        let diagnostics = summarize(&channels, &corrected);
        for (fit, &bad) in channels.iter().zip(diagnostics.non_finite_pixels.iter()) {
            if fit.status == FitStatus::Degenerate {
                log::warn!(
                    "Channel {} has a degenerate fit (slope {}, factor {})",
                    fit.channel,
                    fit.slope,
                    fit.factor
                );
            }
            if bad > 0 {
                log::warn!("Channel {} produced {} non-finite pixels", fit.channel, bad);
            }
        }

        log::info!(
            "C-correction completed: {}/{} channels corrected",
            diagnostics.correctable_channels.len(),
            channels.len()
        );

        Ok(CCorrectionResult {
            corrected,
            channels,
            diagnostics,
        })
    }

    /// Per-pixel multiplier `(cos z + c) / (illumination + c)` for one channel
    pub fn correction_factor_map(
        fit: &ChannelCorrection,
        illumination: &RasterGrid,
        zenith: f64,
    ) -> RasterGrid {
        let cos_z = flat_illumination(zenith);
        let c = fit.factor;
        illumination.mapv(|cos_i| (cos_z + c) / (cos_i + c))
    }
}

/// Correct `cube` with the default gate, returning `(corrected, factors, correlations)`
pub fn correct(
    cube: &ReflectanceCube,
    illumination: &RasterGrid,
    zenith: f64,
) -> CcorrResult<(ReflectanceCube, Array1<f64>, Array1<f64>)> {
    let result = CCorrector::standard().correct(cube, illumination, zenith)?;
    let factors = result.factors();
    let correlations = result.correlations();
    Ok((result.corrected, factors, correlations))
}

fn check_inputs(cube: &ReflectanceCube, illumination: &RasterGrid) -> CcorrResult<()> {
    let (rows, cols, channels) = cube.dim();
    if channels == 0 {
        return Err(CcorrError::InvalidConfiguration(
            "Cube has no channels".to_string(),
        ));
    }
    if rows == 0 || cols == 0 {
        return Err(CcorrError::InvalidConfiguration(
            "Cube has no pixels".to_string(),
        ));
    }
    if illumination.dim() != (rows, cols) {
        return Err(CcorrError::DimensionMismatch(format!(
            "Cube grid {}x{} does not match illumination grid {:?}",
            rows,
            cols,
            illumination.dim()
        )));
    }
    Ok(())
}

fn summarize(channels: &[ChannelCorrection], corrected: &ReflectanceCube) -> CorrectionDiagnostics {
    CorrectionDiagnostics {
        correctable_channels: channels
            .iter()
            .filter(|c| c.correctable)
            .map(|c| c.channel)
            .collect(),
        degenerate_channels: channels
            .iter()
            .filter(|c| c.status == FitStatus::Degenerate)
            .map(|c| c.channel)
            .collect(),
        non_finite_pixels: corrected
            .axis_iter(Axis(2))
            .map(|band| band.iter().filter(|v| !v.is_finite()).count())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, Array3};

    fn ramp_illumination() -> RasterGrid {
        Array2::from_shape_fn((4, 5), |(i, j)| 0.4 + 0.03 * i as f64 + 0.02 * j as f64)
    }

    #[test]
    fn test_offset_channel_is_fully_correlated() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 1), |(i, j, _)| 0.8 * illum[[i, j]] + 0.05);

        let result = CCorrector::standard().correct(&cube, &illum, 0.3).unwrap();
        let fit = &result.channels[0];

        assert_abs_diff_eq!(fit.correlation, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.slope, 0.8, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.factor, 0.05 / 0.8, epsilon = 1e-9);
        assert_eq!(fit.status, FitStatus::Valid);
        assert!(fit.correctable);

        // A perfect linear channel corrects to its flat-terrain brightness
        let flat = 0.8 * 0.3_f64.cos() + 0.05;
        for &v in result.corrected.iter() {
            assert_abs_diff_eq!(v, flat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uncorrelated_channel_passes_through() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 2), |(i, j, c)| {
            if c == 0 {
                illum[[i, j]]
            } else {
                // alternating pattern orthogonal to the ramp
                if (i + j) % 2 == 0 { 0.3 } else { 0.7 }
            }
        });

        let result = CCorrector::standard().correct(&cube, &illum, 0.5).unwrap();
        assert!(result.channels[0].correctable);
        assert!(!result.channels[1].correctable);
        assert_eq!(result.correctable_channels(), &[0]);
        assert_eq!(
            result.corrected.index_axis(Axis(2), 1),
            cube.index_axis(Axis(2), 1)
        );
    }

    #[test]
    fn test_uniform_illumination_is_degenerate() {
        let illum = Array2::from_elem((3, 3), 0.7);
        let cube = Array3::from_shape_fn((3, 3, 2), |(i, j, c)| 0.2 + 0.01 * (i * 3 + j + c) as f64);

        let result = CCorrector::standard().correct(&cube, &illum, 0.4).unwrap();
        for fit in &result.channels {
            assert_eq!(fit.slope, 0.0);
            assert!(fit.correlation.is_nan());
            assert!(fit.factor.is_infinite());
            assert_eq!(fit.status, FitStatus::Degenerate);
            assert!(!fit.correctable);
        }
        assert_eq!(result.corrected, cube);
        assert_eq!(result.diagnostics.degenerate_channels, vec![0, 1]);
        assert!(result.diagnostics.has_anomalies());
    }

    #[test]
    fn test_threshold_is_strict() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 1), |(i, j, _)| illum[[i, j]]);

        let strict = CCorrector::new(CCorrectionParams {
            correlation_threshold: 1.0,
        });
        let result = strict.correct(&cube, &illum, 0.2).unwrap();
        assert!(!result.channels[0].correctable);
        assert_eq!(result.corrected, cube);
    }

    #[test]
    fn test_correction_factor_map() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 1), |(i, j, _)| illum[[i, j]] + 0.1);
        let result = CCorrector::standard().correct(&cube, &illum, 0.25).unwrap();

        let map = CCorrector::correction_factor_map(&result.channels[0], &illum, 0.25);
        assert_eq!(map.dim(), illum.dim());
        for ((i, j), &m) in map.indexed_iter() {
            assert_abs_diff_eq!(
                result.corrected[[i, j, 0]],
                cube[[i, j, 0]] * m,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_flat_pixels_keep_their_brightness() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 1), |(i, j, _)| 0.9 * illum[[i, j]] + 0.02);
        let result = CCorrector::standard().correct(&cube, &illum, 0.6).unwrap();

        let flat = Array2::from_elem((2, 2), flat_illumination(0.6));
        let map = CCorrector::correction_factor_map(&result.channels[0], &flat, 0.6);
        for &m in map.iter() {
            assert_abs_diff_eq!(m, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let illum = ramp_illumination();

        let empty = Array3::<f64>::zeros((4, 5, 0));
        assert!(matches!(
            correct(&empty, &illum, 0.5),
            Err(CcorrError::InvalidConfiguration(_))
        ));

        let wrong = Array3::<f64>::zeros((5, 4, 2));
        assert!(matches!(
            correct(&wrong, &illum, 0.5),
            Err(CcorrError::DimensionMismatch(_))
        ));

        let bad_gate = CCorrector::new(CCorrectionParams {
            correlation_threshold: f64::NAN,
        });
        let cube = Array3::<f64>::zeros((4, 5, 1));
        assert!(bad_gate.correct(&cube, &illum, 0.5).is_err());
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let illum = ramp_illumination();
        let cube = Array3::from_shape_fn((4, 5, 3), |(i, j, c)| illum[[i, j]] * (1.0 + c as f64));
        let (cube_before, illum_before) = (cube.clone(), illum.clone());

        let (corrected, factors, correlations) = correct(&cube, &illum, 0.5).unwrap();
        assert_eq!(cube, cube_before);
        assert_eq!(illum, illum_before);
        assert_eq!(corrected.dim(), cube.dim());
        assert_eq!(factors.len(), 3);
        assert_eq!(correlations.len(), 3);
    }
}
