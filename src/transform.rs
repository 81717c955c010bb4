//! Phase normalization applied to each raw trajectory once, when its episode
//! is loaded.

use std::f64::consts::PI;

use ndarray::Array2;

/// A pure transform from a raw trajectory array to its normalized form.
pub type PhaseTransform = Box<dyn Fn(Array2<f64>) -> Array2<f64>>;

/// Wrap every phase into `[-π, π)`.
pub fn wrap_phase(mut raw: Array2<f64>) -> Array2<f64> {
    raw.mapv_inplace(|theta| (theta + PI).rem_euclid(2.0 * PI) - PI);
    raw
}

/// Leave the array untouched (data already normalized).
pub fn identity(raw: Array2<f64>) -> Array2<f64> {
    raw
}
