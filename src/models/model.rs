//! The erfc diffusion profile.
//!
//! `c(x) = c0 * erfc(m * x)` is the concentration profile for one-dimensional
//! diffusion into a half space from a boundary held at `c0`, with
//! `m = 1 / (2 sqrt(D t))`.
//!
//! The fitter relies on two primitive operations:
//! - predict `c(x)` for given parameters (residuals, plots)
//! - fill a Jacobian row `[∂c/∂m, ∂c/∂c0]` (Levenberg–Marquardt)

use std::f64::consts::PI;

use crate::domain::DiffusionParams;

/// Number of fitted parameters (`m`, `c0`).
pub const PARAM_COUNT: usize = 2;

/// Predict the concentration at position `x`.
pub fn predict(x: f64, params: &DiffusionParams) -> f64 {
    params.c0 * libm::erfc(params.slope * x)
}

/// Fill `[∂c/∂m, ∂c/∂c0]` at position `x`.
///
/// # Panics
/// Panics if `out` is shorter than [`PARAM_COUNT`].
pub fn fill_jacobian_row(x: f64, params: &DiffusionParams, out: &mut [f64]) {
    let z = params.slope * x;
    out[0] = -2.0 / PI.sqrt() * params.c0 * x * (-z * z).exp();
    out[1] = libm::erfc(z);
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: DiffusionParams = DiffusionParams { slope: 0.5, c0: 2.0 };

    #[test]
    fn boundary_value_is_c0() {
        assert!((predict(0.0, &P) - 2.0).abs() < 1e-15);
    }

    #[test]
    fn known_erfc_values() {
        // erfc(1) = 0.157299207050285
        assert!((predict(2.0, &P) - 2.0 * 0.157_299_207_050_285).abs() < 1e-12);
        assert!(predict(40.0, &P).abs() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let h = 1e-7;
        let mut row = [0.0; PARAM_COUNT];
        for &x in &[0.0, 0.3, 1.0, 2.5] {
            fill_jacobian_row(x, &P, &mut row);

            let dm = (predict(x, &DiffusionParams { slope: P.slope + h, ..P })
                - predict(x, &DiffusionParams { slope: P.slope - h, ..P }))
                / (2.0 * h);
            let dc = (predict(x, &DiffusionParams { c0: P.c0 + h, ..P })
                - predict(x, &DiffusionParams { c0: P.c0 - h, ..P }))
                / (2.0 * h);

            assert!((row[0] - dm).abs() < 1e-6, "x={x}: {} vs {dm}", row[0]);
            assert!((row[1] - dc).abs() < 1e-6, "x={x}: {} vs {dc}", row[1]);
        }
    }
}
