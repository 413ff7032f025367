//! Paired-sample statistics for illumination/brightness regressions.
//!
//! Both routines take the same flattened sample pairs; the fit and the
//! correlation are always computed over identical pixels.

use crate::types::{CcorrError, CcorrResult};
use ndarray::ArrayView1;

/// Ordinary least-squares line `y ≈ slope·x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Sums of centred products for a pair of samples
struct Moments {
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

fn moments(x: ArrayView1<f64>, y: ArrayView1<f64>) -> CcorrResult<Moments> {
    if x.len() != y.len() {
        return Err(CcorrError::DimensionMismatch(format!(
            "Sample lengths differ: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(CcorrError::InvalidConfiguration(
            "Cannot compute statistics over zero samples".to_string(),
        ));
    }

    let n = x.len() as f64;
    let mean_x = x.sum() / n;
    let mean_y = y.sum() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    // Rounding in the mean must not turn a constant sample into a tiny variance
    if is_constant(x) {
        sxx = 0.0;
        sxy = 0.0;
    }
    if is_constant(y) {
        syy = 0.0;
        sxy = 0.0;
    }

    Ok(Moments {
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
    })
}

fn is_constant(v: ArrayView1<f64>) -> bool {
    let first = v[0];
    v.iter().all(|&x| x == first)
}

/// Fit a least-squares line through the paired samples
///
/// With zero variance in `x` the minimum-norm solution is returned:
/// slope 0 and intercept equal to the mean of `y`.
pub fn linear_fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> CcorrResult<LinearFit> {
    let m = moments(x, y)?;

    let slope = if m.sxx == 0.0 { 0.0 } else { m.sxy / m.sxx };
    let intercept = m.mean_y - slope * m.mean_x;

    Ok(LinearFit { slope, intercept })
}

/// Pearson correlation coefficient between two samples
///
/// Returns NaN if either sample has zero variance.
pub fn pearson_correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> CcorrResult<f64> {
    let m = moments(x, y)?;

    if m.sxx == 0.0 || m.syy == 0.0 {
        return Ok(f64::NAN);
    }

    Ok((m.sxy / (m.sxx.sqrt() * m.syy.sqrt())).clamp(-1.0, 1.0))
}
