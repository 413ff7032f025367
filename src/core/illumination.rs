use crate::types::{CcorrError, CcorrResult, RasterGrid, SolarGeometry};
use ndarray::Zip;

/// Cosine of the local solar incidence angle
///
/// `cos(s)·cos(z) + sin(s)·sin(z)·cos(a − φ)` with slope `s` and aspect `a`
/// given in degrees and the solar zenith `z` and azimuth `φ` in radians.
pub fn cos_incidence(
    slope_deg: &RasterGrid,
    aspect_deg: &RasterGrid,
    solar: &SolarGeometry,
) -> CcorrResult<RasterGrid> {
    if slope_deg.dim() != aspect_deg.dim() {
        return Err(CcorrError::DimensionMismatch(format!(
            "Slope {:?} and aspect {:?} grids must have the same shape",
            slope_deg.dim(),
            aspect_deg.dim()
        )));
    }

    let (cos_z, sin_z) = (solar.zenith.cos(), solar.zenith.sin());
    let azimuth = solar.azimuth;

    let illumination = Zip::from(slope_deg)
        .and(aspect_deg)
        .map_collect(|&slope, &aspect| {
            let s = slope.to_radians();
            let a = aspect.to_radians();
            s.cos() * cos_z + s.sin() * sin_z * (a - azimuth).cos()
        });

    Ok(illumination)
}

/// Illumination of a horizontal surface for a sun at `zenith` radians
pub fn flat_illumination(zenith: f64) -> f64 {
    zenith.cos()
}
