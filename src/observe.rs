//! Built-in observation function for phase-oscillator trajectories.

use crate::episode::Snip;
use crate::replay::{MakeObservation, ObservationOutput};

/// Kuramoto order parameter of one column of phases: `|mean_k exp(iθ_k)|`.
///
/// 1.0 when all oscillators are in phase, near 0.0 when they are spread out.
pub fn order_parameter<'a>(phases: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (mut re, mut im, mut n) = (0.0, 0.0, 0usize);
    for theta in phases {
        re += theta.cos();
        im += theta.sin();
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    (re * re + im * im).sqrt() / n as f64
}

/// Uses the snip's mean order parameter as both reward and feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderParameter;

impl MakeObservation for OrderParameter {
    fn make_observation(&mut self, snip: &Snip, _context: usize) -> anyhow::Result<ObservationOutput> {
        if snip.ncols() == 0 {
            anyhow::bail!("empty snip");
        }
        let per_column: Vec<f64> = snip.columns().into_iter().map(|c| order_parameter(c.iter())).collect();
        let mean = per_column.iter().sum::<f64>() / per_column.len() as f64;
        Ok(ObservationOutput {
            reward: mean,
            feature: mean,
            extras: per_column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f64::consts::PI;

    #[test]
    fn synchronized_phases_give_one() {
        let r = order_parameter(&[0.3, 0.3, 0.3]);
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_phases_cancel() {
        let r = order_parameter(&[0.0, PI]);
        assert!(r.abs() < 1e-12);
    }

    #[test]
    fn observation_averages_columns() {
        // Column 0 synchronized, column 1 anti-phase.
        let snip = array![[0.0, 0.0], [0.0, PI]];
        let out = OrderParameter.make_observation(&snip, 0).unwrap();
        assert!((out.reward - 0.5).abs() < 1e-12);
        assert_eq!(out.reward, out.feature);
        assert_eq!(out.extras.len(), 2);
    }
}
