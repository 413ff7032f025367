//! ccorr: C-correction terrain illumination normalization
//!
//! Simulates terrain-shaded multi-band imagery and removes the topographic
//! shading with a per-channel empirical C-correction.

pub mod types;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    CcorrError, CcorrResult, RasterGrid, RasterValue, ReflectanceCube, SolarGeometry,
};

pub use crate::core::{
    CCorrector, CCorrectionParams, CCorrectionResult, SyntheticImageGenerator,
    TerrainCorrectionParams, TerrainCorrectionPipeline, TerrainGenerator,
};

#[cfg(feature = "python")]
mod python {
    use crate::core::{c_correction, illumination, synthetic};
    use crate::types::{CcorrError, SolarGeometry};
    use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::prelude::*;

    fn to_py_err(e: CcorrError) -> PyErr {
        match e {
            CcorrError::InvalidConfiguration(_) | CcorrError::DimensionMismatch(_) => {
                PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
            }
            _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)),
        }
    }

    /// Generate a shaded scene: (cube, elevation, slope, aspect)
    #[pyfunction]
    #[pyo3(signature = (image_size=20, channels=10, sza=0.5235987755982988, saa=0.7853981633974483, seed=4))]
    fn generate_data(
        py: Python<'_>,
        image_size: usize,
        channels: usize,
        sza: f64,
        saa: f64,
        seed: u64,
    ) -> PyResult<(&PyArray3<f64>, &PyArray2<f64>, &PyArray2<f64>, &PyArray2<f64>)> {
        let (cube, elevation, slope, aspect) =
            synthetic::generate(image_size, channels, sza, saa, seed).map_err(to_py_err)?;
        Ok((
            cube.into_pyarray(py),
            elevation.into_pyarray(py),
            slope.into_pyarray(py),
            aspect.into_pyarray(py),
        ))
    }

    /// Cosine of the local solar incidence angle
    #[pyfunction]
    fn calc_lsa<'py>(
        py: Python<'py>,
        slope: PyReadonlyArray2<'py, f64>,
        aspect: PyReadonlyArray2<'py, f64>,
        sza: f64,
        saa: f64,
    ) -> PyResult<&'py PyArray2<f64>> {
        let illum = illumination::cos_incidence(
            &slope.as_array().to_owned(),
            &aspect.as_array().to_owned(),
            &SolarGeometry::new(sza, saa),
        )
        .map_err(to_py_err)?;
        Ok(illum.into_pyarray(py))
    }

    /// Apply the C-correction: (corrected, factors, correlations)
    #[pyfunction]
    fn apply_c_correction<'py>(
        py: Python<'py>,
        data_array: PyReadonlyArray3<'py, f64>,
        cos_gamma: PyReadonlyArray2<'py, f64>,
        sza: f64,
    ) -> PyResult<(&'py PyArray3<f64>, &'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let (corrected, factors, correlations) = c_correction::correct(
            &data_array.as_array().to_owned(),
            &cos_gamma.as_array().to_owned(),
            sza,
        )
        .map_err(to_py_err)?;
        Ok((
            corrected.into_pyarray(py),
            factors.into_pyarray(py),
            correlations.into_pyarray(py),
        ))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(generate_data, m)?)?;
        m.add_function(wrap_pyfunction!(calc_lsa, m)?)?;
        m.add_function(wrap_pyfunction!(apply_c_correction, m)?)?;
        Ok(())
    }
}
