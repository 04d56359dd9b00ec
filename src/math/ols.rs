//! Least-squares statistics at a nonlinear solution.
//!
//! Near the optimum the problem is locally linear in the parameters, so the
//! usual OLS covariance applies with the Jacobian as design matrix:
//!
//! ```text
//! cov = (JᵀJ)⁻¹ · SSE / (n − k)
//! ```

use nalgebra::DMatrix;

/// Parameter covariance `(JᵀJ)⁻¹ · sse / (n − k)` for an `n × k` Jacobian.
///
/// Returns `None` when there are no residual degrees of freedom or `JᵀJ` is
/// singular.
pub fn covariance(jac: &DMatrix<f64>, sse: f64) -> Option<DMatrix<f64>> {
    let (n, k) = jac.shape();
    if n <= k {
        return None;
    }
    let jtj = jac.transpose() * jac;
    let inv = jtj.try_inverse()?;
    let cov = inv * (sse / (n - k) as f64);
    if cov.iter().all(|v| v.is_finite()) { Some(cov) } else { None }
}
