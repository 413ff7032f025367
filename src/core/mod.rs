//! Core terrain illumination modules

pub mod terrain;
pub mod illumination;
pub mod synthetic;
pub mod statistics;
pub mod c_correction;
pub mod pipeline;

// Re-export main types
pub use terrain::{TerrainGenerator, TerrainParams, TerrainFields, compute_slope_aspect};
pub use illumination::{cos_incidence, flat_illumination};
pub use synthetic::{SyntheticImageGenerator, SyntheticImageParams, SyntheticScene};
pub use statistics::{LinearFit, linear_fit, pearson_correlation};
pub use c_correction::{
    CCorrector, CCorrectionParams, CCorrectionResult, ChannelCorrection, CorrectionDiagnostics,
    FitStatus,
};
pub use pipeline::{TerrainCorrectionPipeline, TerrainCorrectionParams, PipelineOutput};
