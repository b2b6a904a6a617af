//! Pulse Interval Computation
//!
//! Turns global peak indices into pulse-to-pulse intervals and heart rates and
//! applies the physiological plausibility bands.

use crate::core::config::Band;

/// Converts peak positions to intervals at a fixed sample rate.
#[derive(Clone, Copy, Debug)]
pub struct IntervalCalculator {
    sample_rate: f64,
    hr_band: Band,
    ppi_band: Band,
}

impl IntervalCalculator {
    /// `sample_rate` must be positive; the config layer validates it.
    pub fn new(sample_rate: f64, hr_band: Band, ppi_band: Band) -> Self {
        Self {
            sample_rate,
            hr_band,
            ppi_band,
        }
    }

    /// Intervals in seconds between consecutive peaks; empty for fewer than two peaks.
    pub fn ppi(&self, peaks: &[u64]) -> Vec<f64> {
        peaks
            .windows(2)
            .map(|pair| pair[1].saturating_sub(pair[0]) as f64 / self.sample_rate)
            .collect()
    }

    /// Intervals in whole milliseconds, truncated, as sent to the cloud service.
    pub fn ppi_ms(&self, peaks: &[u64]) -> Vec<u32> {
        peaks
            .windows(2)
            .map(|pair| {
                (pair[1].saturating_sub(pair[0]) as f64 * 1000.0 / self.sample_rate).floor() as u32
            })
            .collect()
    }

    /// Instantaneous heart rate for every non-zero interval.
    pub fn heart_rates(&self, ppi: &[f64]) -> Vec<f64> {
        ppi.iter()
            .filter(|&&p| p > 0.0)
            .map(|p| 60.0 / p)
            .collect()
    }

    /// The most recent heart rate inside the display band.
    pub fn latest_valid_hr(&self, ppi: &[f64]) -> Option<f64> {
        self.heart_rates(ppi)
            .into_iter()
            .rev()
            .find(|hr| self.hr_band.contains(*hr))
    }

    /// Keeps only intervals inside the HRV band.
    pub fn filter_hrv(&self, ppi: &[f64]) -> Vec<f64> {
        ppi.iter()
            .copied()
            .filter(|p| self.ppi_band.contains(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MonitorConfig;

    fn calculator() -> IntervalCalculator {
        let cfg = MonitorConfig::default();
        IntervalCalculator::new(cfg.sample_rate, cfg.hr_band, cfg.ppi_band)
    }

    #[test]
    fn test_constant_spacing() {
        let calc = calculator();
        for spacing in [150u64, 200, 213, 300] {
            let peaks: Vec<u64> = (0..10).map(|i| 40 + i * spacing).collect();
            let ppi = calc.ppi(&peaks);
            assert_eq!(ppi.len(), 9);
            for p in &ppi {
                assert!((p - spacing as f64 / 250.0).abs() < 1e-12);
            }
            for hr in calc.heart_rates(&ppi) {
                assert!((hr - 60.0 * 250.0 / spacing as f64).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_too_few_peaks() {
        let calc = calculator();
        assert!(calc.ppi(&[]).is_empty());
        assert!(calc.ppi(&[17]).is_empty());
        assert!(calc.latest_valid_hr(&[]).is_none());
    }

    #[test]
    fn test_zero_interval_is_skipped() {
        let calc = calculator();
        assert_eq!(calc.heart_rates(&[0.0, 1.0]), vec![60.0]);
    }

    #[test]
    fn test_latest_valid_hr_skips_implausible_values() {
        let calc = calculator();
        // 75 bpm, then 300 bpm and 20 bpm artifacts
        let ppi = [0.8, 0.2, 3.0];
        assert_eq!(calc.latest_valid_hr(&ppi), Some(75.0));
    }

    #[test]
    fn test_hrv_filter_band() {
        let calc = calculator();
        let ppi = [0.5, 0.6, 0.8, 1.2, 1.3];
        assert_eq!(calc.filter_hrv(&ppi), vec![0.6, 0.8, 1.2]);
    }

    #[test]
    fn test_ppi_ms_truncates() {
        let calc = calculator();
        assert_eq!(calc.ppi_ms(&[0, 200, 401]), vec![800, 804]);
    }
}
