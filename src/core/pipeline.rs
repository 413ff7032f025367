use crate::core::c_correction::{CCorrectionParams, CCorrectionResult, CCorrector};
use crate::core::synthetic::{SyntheticImageGenerator, SyntheticImageParams, SyntheticScene};
use crate::types::{CcorrError, CcorrResult, SolarGeometry};
use serde::{Deserialize, Serialize};

/// Full set of run parameters for the simulate-then-correct workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainCorrectionParams {
    pub image_size: usize,
    pub channels: usize,
    pub solar: SolarGeometry,
    pub seed: u64,
    pub noise_amplitude: f64,
    pub correlation_threshold: f64,
    pub cell_size: f64,
}

impl Default for TerrainCorrectionParams {
    fn default() -> Self {
        Self {
            image_size: 20,
            channels: 10,
            solar: SolarGeometry::from_degrees(30.0, 45.0),
            seed: 4,
            noise_amplitude: 5e-3,
            correlation_threshold: 0.5,
            cell_size: 1.0,
        }
    }
}

impl TerrainCorrectionParams {
    /// Reject invalid configuration before any computation
    pub fn validate(&self) -> CcorrResult<()> {
        self.solar.validate()?;
        self.image_generator().validate()?;
        self.corrector().validate()?;
        Ok(())
    }

    fn image_generator(&self) -> SyntheticImageGenerator {
        SyntheticImageGenerator::new(SyntheticImageParams {
            size: self.image_size,
            channels: self.channels,
            noise_amplitude: self.noise_amplitude,
            seed: self.seed,
            cell_size: self.cell_size,
        })
    }

    fn corrector(&self) -> CCorrector {
        CCorrector::new(CCorrectionParams {
            correlation_threshold: self.correlation_threshold,
        })
    }
}

/// Everything produced by one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub scene: SyntheticScene,
    pub correction: CCorrectionResult,
}

/// Terrain generation, shading, and C-correction in one call
pub struct TerrainCorrectionPipeline {
    params: TerrainCorrectionParams,
}

impl TerrainCorrectionPipeline {
    pub fn new(params: TerrainCorrectionParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(TerrainCorrectionParams::default())
    }

    pub fn params(&self) -> &TerrainCorrectionParams {
        &self.params
    }

    pub fn run(&self) -> CcorrResult<PipelineOutput> {
        log::info!("Starting terrain correction pipeline");
        log::debug!("Pipeline parameters: {:?}", self.params);

        self.params.validate()?;

        // Step 1: Terrain, illumination and shaded cube
        log::info!("Step 1: Generating synthetic scene");
        let scene = self.params.image_generator().generate(&self.params.solar)?;

        // Step 2: Per-channel regression and correction
        log::info!("Step 2: Applying C-correction");
        let correction = self.params.corrector().correct(
            &scene.cube,
            &scene.illumination,
            self.params.solar.zenith,
        )?;

        log::info!("Channel correlations: {:?}", correction.correlations().to_vec());
        if correction.diagnostics.has_anomalies() {
            log::warn!("Correction anomalies: {:?}", correction.diagnostics);
        }

        log::info!("Terrain correction pipeline completed");
        Ok(PipelineOutput { scene, correction })
    }
}
