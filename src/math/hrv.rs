//! HRV (Heart Rate Variability) Computation
//!
//! Time-domain statistics over a sequence of pulse-to-pulse intervals.
//! All functions are total: inputs that are too short yield `0.0`.

use log::trace;
use nalgebra::DVectorView;

/// Arithmetic mean of the intervals, `0.0` for an empty slice.
pub fn calc_mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    DVectorView::from(data).mean()
}

/// `calc_rmssd` function.
///
/// Calculates RMSSD (Root Mean Square of Successive Differences).
///
/// # Arguments
/// - `data`: A slice of pulse intervals.
///
/// # Returns
/// RMSSD in the unit of `data`, or `0.0` if there is no successive difference.
pub fn calc_rmssd(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let points_a = DVectorView::from(&data[0..data.len() - 1]);
    let points_b = DVectorView::from(&data[1..]);
    let successive_diffs = points_b - points_a;

    trace!(
        "Calculating RMSSD with successive differences: {:?}",
        successive_diffs
    );
    (successive_diffs.dot(&successive_diffs) / (successive_diffs.len() as f64)).sqrt()
}

/// `calc_sdnn` function.
///
/// Calculates SDNN as the population standard deviation of the intervals
/// (divides by `n`, not `n - 1`).
///
/// # Returns
/// SDNN in the unit of `data`, or `0.0` for fewer than two values.
pub fn calc_sdnn(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let variance = DVectorView::from(data).variance();
    trace!("Calculating SDNN with variance: {}", variance);
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmssd() {
        let data = [0.8, 0.81, 0.79, 0.8];
        let expected = ((0.01f64.powi(2) + 0.02f64.powi(2) + 0.01f64.powi(2)) / 3.0).sqrt();
        assert!((calc_rmssd(&data) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_sdnn_is_population_deviation() {
        let data = [1.0, 2.0, 3.0, 4.0];
        // mean 2.5, squared deviations 2.25 + 0.25 + 0.25 + 2.25 = 5.0, / 4
        assert!((calc_sdnn(&data) - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_short_inputs_are_zero() {
        assert_eq!(calc_mean(&[]), 0.0);
        assert_eq!(calc_rmssd(&[]), 0.0);
        assert_eq!(calc_rmssd(&[0.8]), 0.0);
        assert_eq!(calc_sdnn(&[0.8]), 0.0);
    }

    #[test]
    fn test_constant_sequence_has_no_variability() {
        let data = [0.8; 12];
        assert!((calc_mean(&data) - 0.8).abs() < 1e-12);
        assert!(calc_rmssd(&data).abs() < 1e-12);
        assert!(calc_sdnn(&data).abs() < 1e-12);
    }
}
